//! Topic/channel registry, metadata persistence and daemon lifecycle.

mod channel;
pub mod metadata;
mod owner;
mod registry;
mod tasks;
mod topic;

pub use channel::Channel;
pub use metadata::{ChannelMetadata, Metadata, TopicMetadata, METADATA_FILE_NAME};
pub use owner::{ChannelOwner, MetadataEntity, TopicOwner};
pub use registry::Broker;
pub use tasks::TaskGroup;
pub use topic::Topic;
