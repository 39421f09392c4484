//! Core of the `ferrumqd` message broker daemon: the topic/channel
//! registry, its metadata persistence, the data-directory lock and the
//! administrative HTTP surface.

/// Per-entity message queues: durable on disk, or no-op for ephemeral names.
pub mod backend;
/// Topic/channel registry and daemon lifecycle.
pub mod broker;
/// Broker options and their atomically swapped snapshot.
pub mod config;
/// Exclusive advisory lock on the data directory.
pub mod dirlock;
/// Durable file writes.
pub mod fsutil;
/// Administrative HTTP routes.
pub mod http;
/// `tracing` subscriber setup.
pub mod logging;
/// Naming rules for topics and channels.
pub mod protocol;
/// Build and version information.
pub mod version;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

pub use backend::{BackendQueue, DiskQueue, DummyQueue};
pub use broker::{Broker, Channel, MetadataEntity, Topic};
pub use config::{LogFormat, LogLevel, Options, OptionsSnapshot};
pub use dirlock::DirLock;
pub use ferrumq_error::{FerrumResult, StackError};
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
