use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, Environment, File};
use ferrumq_error::{ConfigError, FerrumResult, ResultExt};
use serde::{Deserialize, Serialize};

use super::LogLevel;

/// Prefix of the environment variables read by [`Options::load`], e.g.
/// `FERRUMQ_HTTP_ADDRESS`.
pub const ENV_PREFIX: &str = "FERRUMQ";

pub const DEFAULT_HTTP_ADDRESS: &str = "0.0.0.0:1418";
pub const DEFAULT_MAX_BYTES_PER_FILE: u64 = 100 * 1024 * 1024;
pub const DEFAULT_MAX_MSG_SIZE: u64 = 1024 * 1024;
pub const DEFAULT_SYNC_EVERY: u64 = 2500;
pub const DEFAULT_SYNC_TIMEOUT_MS: u64 = 2000;

/// Console output format of the logging layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// All broker tunables.
///
/// An `Options` value is never mutated once published; replacing it goes
/// through [`super::OptionsSnapshot::store`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Process-local numeric identity.
    pub id: i64,
    /// Textual log level: `debug`, `info`, `warn`, `error` or `fatal`.
    pub log_level: String,
    /// Forces the `debug` level.
    pub verbose: bool,
    pub log_format: LogFormat,
    /// Directory for a daily-rotated log file; console only when `None`.
    pub log_dir: Option<PathBuf>,
    /// Listen address of the admin HTTP surface.
    pub http_address: String,
    /// Storage directory; the working directory when `None`.
    pub data_path: Option<PathBuf>,
    /// Segment size of the durable queues.
    pub max_bytes_per_file: u64,
    /// Largest payload accepted by the durable queues.
    pub max_msg_size: u64,
    /// Number of writes between two fsyncs of a durable queue.
    pub sync_every: u64,
    /// Longest time between two fsyncs of a durable queue.
    pub sync_timeout_ms: u64,
    /// Derived from `log_level` and `verbose` by [`Options::resolve`].
    #[serde(skip)]
    pub(crate) level: LogLevel,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl Options {
    /// Loads options from built-in defaults, an optional config file and
    /// `FERRUMQ_*` environment variables, in increasing priority.
    ///
    /// The returned options are not resolved yet, see [`Options::resolve`].
    pub fn load(file: Option<&Path>) -> FerrumResult<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("id", defaults.id)
            .and_then(|b| b.set_default("log_level", defaults.log_level.clone()))
            .and_then(|b| b.set_default("verbose", defaults.verbose))
            .and_then(|b| b.set_default("http_address", defaults.http_address.clone()))
            .and_then(|b| b.set_default("max_bytes_per_file", defaults.max_bytes_per_file))
            .and_then(|b| b.set_default("max_msg_size", defaults.max_msg_size))
            .and_then(|b| b.set_default("sync_every", defaults.sync_every))
            .and_then(|b| b.set_default("sync_timeout_ms", defaults.sync_timeout_ms))
            .map_err(config_error)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let cfg = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .map_err(config_error)
            .with_context(|| "loading broker options")?;

        cfg.try_deserialize::<Options>()
            .map_err(config_error)
            .context("deserializing broker options")
    }

    /// Parses the textual level and validates the numeric limits.
    ///
    /// Must run before the options are published: readers of a snapshot
    /// rely on [`Options::level`] being final.
    pub fn resolve(mut self) -> Result<Self, ConfigError> {
        self.level = LogLevel::parse(&self.log_level, self.verbose)?;

        if self.max_msg_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_msg_size".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.max_msg_size > u64::from(u32::MAX) {
            return Err(ConfigError::InvalidValue {
                field: "max_msg_size".into(),
                reason: format!("{} exceeds the record limit {}", self.max_msg_size, u32::MAX),
            });
        }
        if self.max_bytes_per_file < self.max_msg_size {
            return Err(ConfigError::InvalidValue {
                field: "max_bytes_per_file".into(),
                reason: format!(
                    "{} is smaller than max_msg_size {}",
                    self.max_bytes_per_file, self.max_msg_size
                ),
            });
        }
        if self.sync_every == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync_every".into(),
                reason: "must be greater than zero".into(),
            });
        }

        Ok(self)
    }

    /// Derived log level; `Info` until [`Options::resolve`] ran.
    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    /// Effective storage directory.
    pub fn data_dir(&self) -> FerrumResult<PathBuf> {
        match &self.data_path {
            Some(path) => Ok(path.clone()),
            None => std::env::current_dir().context("resolving working directory"),
        }
    }
}

/// Default identity: crc32 of the host name, folded into `0..1024`.
pub fn default_id() -> i64 {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_default();
    i64::from(crc32fast::hash(host.as_bytes()) % 1024)
}

fn config_error(err: config::ConfigError) -> ConfigError {
    ConfigError::Load {
        reason: err.to_string(),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait implementations for Options
////////////////////////////////////////////////////////////////////////////////

impl Default for Options {
    fn default() -> Self {
        Self {
            id: default_id(),
            log_level: LogLevel::Info.as_str().to_string(),
            verbose: false,
            log_format: LogFormat::Compact,
            log_dir: None,
            http_address: DEFAULT_HTTP_ADDRESS.to_string(),
            data_path: None,
            max_bytes_per_file: DEFAULT_MAX_BYTES_PER_FILE,
            max_msg_size: DEFAULT_MAX_MSG_SIZE,
            sync_every: DEFAULT_SYNC_EVERY,
            sync_timeout_ms: DEFAULT_SYNC_TIMEOUT_MS,
            level: LogLevel::Info,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////
