//! Broker configuration: the `Options` value, its textual log level and the
//! atomically replaceable snapshot shared by every component.

pub mod log_level;
pub mod options;
pub mod snapshot;

pub use log_level::LogLevel;
pub use options::{LogFormat, Options};
pub use snapshot::OptionsSnapshot;
