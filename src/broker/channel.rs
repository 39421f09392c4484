use std::sync::{
    atomic::{AtomicBool, Ordering},
    Weak,
};

use bytes::Bytes;
use ferrumq_error::{BrokerError, FerrumResult};
use tracing::{debug, info};

use super::owner::{ChannelOwner, MetadataEntity};
use crate::{
    backend::{self, BackendQueue},
    config::Options,
    protocol,
};

/// A named consumer group attached to a topic.
pub struct Channel {
    topic_name: String,
    name: String,
    ephemeral: bool,
    paused: AtomicBool,
    exiting: AtomicBool,
    backend: Box<dyn BackendQueue>,
    owner: Weak<dyn ChannelOwner>,
}

impl Channel {
    /// Creates the channel and its queue, keyed `<topic>:<channel>`.
    pub fn new(
        topic_name: &str,
        name: &str,
        owner: Weak<dyn ChannelOwner>,
        opts: &Options,
    ) -> Self {
        let ephemeral = protocol::is_ephemeral(name);
        let backend = backend::new_queue(&protocol::backend_name(topic_name, name), ephemeral, opts);

        Self {
            topic_name: topic_name.to_string(),
            name: name.to_string(),
            ephemeral,
            paused: AtomicBool::new(false),
            exiting: AtomicBool::new(false),
            backend,
            owner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topic_name(&self) -> &str {
        &self.topic_name
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::Acquire)
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
        debug!(topic = %self.topic_name, channel = %self.name, paused, "CHANNEL pause state changed");
        if let Some(owner) = self.owner.upgrade() {
            owner.notify_metadata_change(self.entity());
        }
    }

    pub(crate) fn entity(&self) -> MetadataEntity {
        MetadataEntity::Channel {
            topic: self.topic_name.clone(),
            channel: self.name.clone(),
        }
    }

    fn exiting_error(&self) -> BrokerError {
        BrokerError::Exiting {
            entity: self.entity().to_string(),
        }
    }

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

    /// Closes the queue, keeping its contents on disk.
    pub fn close(&self) -> FerrumResult<()> {
        if self.exiting.swap(true, Ordering::AcqRel) {
            return Err(self.exiting_error().into());
        }
        info!(topic = %self.topic_name, channel = %self.name, "CHANNEL closing");
        self.backend.close()
    }

    /// Empties and deletes the queue.
    pub fn delete(&self) -> FerrumResult<()> {
        if self.exiting.swap(true, Ordering::AcqRel) {
            return Err(self.exiting_error().into());
        }
        info!(topic = %self.topic_name, channel = %self.name, "CHANNEL deleting");
        self.backend.empty()?;
        self.backend.delete()
    }

    /// Asks the owning topic to delete this channel.
    pub fn remove(&self) -> FerrumResult<()> {
        match self.owner.upgrade() {
            Some(owner) => owner.remove_channel(&self.name),
            None => self.delete(),
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("topic", &self.topic_name)
            .field("name", &self.name)
            .field("ephemeral", &self.ephemeral)
            .field("paused", &self.is_paused())
            .finish()
    }
}
