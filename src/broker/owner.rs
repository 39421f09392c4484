//! Capabilities a topic or channel holds on its owner.
//!
//! Children keep a `Weak` reference to their owner, so the ownership graph
//! stays a tree: the broker owns topics, topics own channels.

use std::{fmt, sync::Arc};

use ferrumq_error::FerrumResult;

use crate::config::Options;

/// Entity whose existence or pause state changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataEntity {
    Topic(String),
    Channel { topic: String, channel: String },
}

impl fmt::Display for MetadataEntity {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Topic(name) => write!(f, "TOPIC({name})"),
            Self::Channel { topic, channel } => write!(f, "CHANNEL({topic}:{channel})"),
        }
    }
}

/// What a topic may ask of the registry that owns it.
pub trait TopicOwner: Send + Sync {
    /// Current configuration snapshot.
    fn options(&self) -> Arc<Options>;

    /// Requests an asynchronous metadata persist.
    fn notify_metadata_change(
        &self,
        entity: MetadataEntity,
    );

    /// Deletes the topic `name` from the registry.
    fn remove_topic(
        &self,
        name: &str,
    ) -> FerrumResult<()>;
}

/// What a channel may ask of the topic that owns it.
pub trait ChannelOwner: Send + Sync {
    fn notify_metadata_change(
        &self,
        entity: MetadataEntity,
    );

    /// Deletes the channel `name` from the topic.
    fn remove_channel(
        &self,
        name: &str,
    ) -> FerrumResult<()>;
}
