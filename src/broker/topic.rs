use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use bytes::Bytes;
use ferrumq_error::{BrokerError, FerrumResult};
use parking_lot::RwLock;
use tracing::{debug, error, info};

use super::{
    channel::Channel,
    owner::{ChannelOwner, MetadataEntity, TopicOwner},
};
use crate::{
    backend::{self, BackendQueue},
    config::Options,
    protocol,
};

/// A named stream of messages fanned out to its channels.
///
/// A topic is created stopped; the registry starts it once it is safe to
/// deliver, which is deferred while metadata is being restored.
pub struct Topic {
    name: String,
    ephemeral: bool,
    paused: AtomicBool,
    started: AtomicBool,
    exiting: AtomicBool,
    channels: RwLock<HashMap<String, Arc<Channel>>>,
    backend: Box<dyn BackendQueue>,
    owner: Weak<dyn TopicOwner>,
    /// Options in force at creation, used once the owner is gone.
    options: Arc<Options>,
    self_ref: Weak<Topic>,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl Topic {
    /// Creates the topic and tells the owner about it.
    pub fn new(
        name: &str,
        owner: Weak<dyn TopicOwner>,
        options: Arc<Options>,
    ) -> Arc<Self> {
        let ephemeral = protocol::is_ephemeral(name);
        let backend = backend::new_queue(name, ephemeral, &options);

        let topic = Arc::new_cyclic(|self_ref| Self {
            name: name.to_string(),
            ephemeral,
            paused: AtomicBool::new(false),
            started: AtomicBool::new(false),
            exiting: AtomicBool::new(false),
            channels: RwLock::new(HashMap::new()),
            backend,
            owner,
            options,
            self_ref: self_ref.clone(),
        });

        topic.notify(topic.entity());
        topic
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::Acquire)
    }

    /// Starts delivery.
    ///
    /// # Returns
    ///
    /// `true` on the first call, `false` when already started.
    pub fn start(&self) -> bool {
        if self.started.swap(true, Ordering::AcqRel) {
            return false;
        }
        info!(topic = %self.name, "TOPIC started");
        true
    }

    pub fn pause(&self) {
        self.set_paused(true);
    }

    pub fn unpause(&self) {
        self.set_paused(false);
    }

    fn set_paused(
        &self,
        paused: bool,
    ) {
        if self.paused.swap(paused, Ordering::AcqRel) == paused {
            return;
        }
        debug!(topic = %self.name, paused, "TOPIC pause state changed");
        self.notify(self.entity());
    }

    /// Returns the channel `name`, creating it on first use.
    ///
    /// Fails with `Exiting` once the topic is closing or being deleted, so
    /// no queue is created behind a teardown.
    pub fn get_channel(
        &self,
        name: &str,
    ) -> FerrumResult<Arc<Channel>> {
        let (channel, created) = {
            let mut channels = self.channels.write();
            if self.is_exiting() {
                return Err(self.exiting_error().into());
            }
            match channels.get(name) {
                Some(channel) => (channel.clone(), false),
                None => {
                    let owner: Weak<dyn ChannelOwner> = self.self_ref.clone();
                    let channel = Arc::new(Channel::new(
                        &self.name,
                        name,
                        owner,
                        &self.current_options(),
                    ));
                    channels.insert(name.to_string(), channel.clone());
                    info!(topic = %self.name, channel = name, "TOPIC new channel");
                    (channel, true)
                }
            }
        };

        if created {
            self.notify(channel.entity());
        }
        Ok(channel)
    }

    pub fn get_existing_channel(
        &self,
        name: &str,
    ) -> FerrumResult<Arc<Channel>> {
        self.channels
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| self.channel_not_found(name).into())
    }

    /// Removes the channel and deletes its queue.
    ///
    /// An ephemeral topic deletes itself once its last channel is gone.
    pub fn delete_existing_channel(
        &self,
        name: &str,
    ) -> FerrumResult<()> {
        let (channel, remaining) = {
            let mut channels = self.channels.write();
            let channel = channels
                .remove(name)
                .ok_or_else(|| self.channel_not_found(name))?;
            (channel, channels.len())
        };

        info!(topic = %self.name, channel = name, "TOPIC deleting channel");
        if let Err(e) = channel.delete() {
            error!(topic = %self.name, channel = name, error = %e, "failed to delete channel queue");
        }
        self.notify(channel.entity());

        if remaining == 0 && self.ephemeral {
            if let Some(owner) = self.owner.upgrade() {
                owner.remove_topic(&self.name)?;
            }
        }
        Ok(())
    }

    /// Channels sorted by name.
    pub fn channels(&self) -> Vec<Arc<Channel>> {
        let mut channels: Vec<_> = self.channels.read().values().cloned().collect();
        channels.sort_by(|a, b| a.name().cmp(b.name()));
        channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Stores `data` in the topic queue.
    pub fn put_message(
        &self,
        data: &[u8],
    ) -> FerrumResult<()> {
        if self.is_exiting() {
            return Err(self.exiting_error().into());
        }
        self.backend.put(data)
    }

    pub fn read_message(&self) -> FerrumResult<Option<Bytes>> {
        if self.is_exiting() {
            return Err(self.exiting_error().into());
        }
        self.backend.read_next()
    }

    pub fn depth(&self) -> u64 {
        self.backend.depth()
    }

    /// Closes every channel and the topic queue, keeping data on disk.
    pub fn close(&self) -> FerrumResult<()> {
        self.begin_exit()?;
        info!(topic = %self.name, "TOPIC closing");

        for channel in self.channels() {
            if let Err(e) = channel.close() {
                error!(topic = %self.name, channel = channel.name(), error = %e, "failed to close channel");
            }
        }
        self.backend.close()
    }

    /// Deletes every channel and empties the topic queue.
    pub fn delete(&self) -> FerrumResult<()> {
        let channels: Vec<_> = {
            let mut channels = self.channels.write();
            self.begin_exit_locked()?;
            channels.drain().map(|(_, c)| c).collect()
        };
        info!(topic = %self.name, "TOPIC deleting");

        for channel in channels {
            if let Err(e) = channel.delete() {
                error!(topic = %self.name, channel = channel.name(), error = %e, "failed to delete channel");
            }
        }
        self.backend.empty()?;
        self.backend.delete()
    }

    /// Asks the registry to delete this topic.
    pub fn remove(&self) -> FerrumResult<()> {
        match self.owner.upgrade() {
            Some(owner) => owner.remove_topic(&self.name),
            None => self.delete(),
        }
    }

    /// Flips the exiting flag under the channel lock, serialising it with
    /// channel creation.
    fn begin_exit(&self) -> FerrumResult<()> {
        let _channels = self.channels.write();
        self.begin_exit_locked()
    }

    /// Caller holds the channel write lock.
    fn begin_exit_locked(&self) -> FerrumResult<()> {
        if self.exiting.swap(true, Ordering::AcqRel) {
            return Err(self.exiting_error().into());
        }
        Ok(())
    }

    pub(crate) fn entity(&self) -> MetadataEntity {
        MetadataEntity::Topic(self.name.clone())
    }

    fn current_options(&self) -> Arc<Options> {
        self.owner
            .upgrade()
            .map(|owner| owner.options())
            .unwrap_or_else(|| self.options.clone())
    }

    fn notify(
        &self,
        entity: MetadataEntity,
    ) {
        if let Some(owner) = self.owner.upgrade() {
            owner.notify_metadata_change(entity);
        }
    }

    fn channel_not_found(
        &self,
        name: &str,
    ) -> BrokerError {
        BrokerError::ChannelNotFound {
            topic: self.name.clone(),
            channel: name.to_string(),
        }
    }

    fn exiting_error(&self) -> BrokerError {
        BrokerError::Exiting {
            entity: self.entity().to_string(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait implementations for Topic
////////////////////////////////////////////////////////////////////////////////

impl ChannelOwner for Topic {
    fn notify_metadata_change(
        &self,
        entity: MetadataEntity,
    ) {
        self.notify(entity);
    }

    fn remove_channel(
        &self,
        name: &str,
    ) -> FerrumResult<()> {
        self.delete_existing_channel(name)
    }
}

impl std::fmt::Debug for Topic {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.name)
            .field("ephemeral", &self.ephemeral)
            .field("paused", &self.is_paused())
            .field("started", &self.is_started())
            .field("channels", &self.channel_count())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
