use std::path::PathBuf;

use crate::config::{LogFormat, LogLevel, Options};

/// Name of the daily log file written under `log_dir`.
pub const LOG_FILE_NAME: &str = "ferrumqd.log";

/// Settings of the logging subscriber.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Daily-rotated file output in addition to the console.
    pub log_dir: Option<PathBuf>,
    pub with_ansi: bool,
    pub with_target: bool,
}

impl LoggingConfig {
    /// Logging settings derived from resolved broker options.
    pub fn from_options(opts: &Options) -> Self {
        Self {
            level: opts.level(),
            format: opts.log_format,
            log_dir: opts.log_dir.clone(),
            ..Self::default()
        }
    }

    /// `EnvFilter` directive: the broker crates at the configured level,
    /// everything else one step quieter.
    pub fn build_filter_directive(&self) -> String {
        let level = self.level.as_directive();
        let others = match self.level {
            LogLevel::Debug => "info",
            LogLevel::Info | LogLevel::Warn => "warn",
            LogLevel::Error | LogLevel::Fatal => "error",
        };
        format!("{others},ferrumq={level},ferrumqd={level}")
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            log_dir: None,
            with_ansi: true,
            with_target: true,
        }
    }
}
