pub mod config;
mod filters;
mod formatter;
pub mod handle;

use std::fs;

pub use config::LoggingConfig;
use ferrumq_error::{FerrumResult, ResultExt};
pub use handle::LoggingHandle;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Installs the global `tracing` subscriber.
///
/// When a global subscriber already exists (an embedding application or a
/// test harness installed one), it is kept and the returned handle reports
/// `is_installed() == false`.
pub fn init_logging(config: &LoggingConfig) -> FerrumResult<LoggingHandle> {
    let env_filter = filters::build_filter_from_config(config);
    let mut layers = vec![formatter::build_console_layer(config)];

    let file_guard = match &config.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = rolling::daily(dir, config::LOG_FILE_NAME);
            let (writer, guard) = non_blocking(appender);
            layers.push(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            level = %config.level,
            format = ?config.format,
            log_dir = ?config.log_dir,
            "logging initialized"
        );
    }

    Ok(LoggingHandle::new(file_guard, installed))
}
