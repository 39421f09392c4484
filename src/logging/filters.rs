use tracing_subscriber::EnvFilter;

use crate::logging::config::LoggingConfig;

/// `RUST_LOG` when set, otherwise the directive derived from the config.
pub fn build_filter_from_config(config: &LoggingConfig) -> EnvFilter {
    let directive = config.build_filter_directive();

    match EnvFilter::try_from_default_env() {
        Ok(env_filter) => env_filter,
        Err(_) => EnvFilter::try_new(&directive).unwrap_or_else(|e| {
            eprintln!("invalid log filter directive '{directive}': {e}; falling back to 'info'");
            EnvFilter::new("info")
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use serial_test::serial;
    use tracing::level_filters::LevelFilter;

    use super::*;
    use crate::config::LogLevel;

    /// The configured level is the most verbose level the filter lets
    /// through.
    #[test]
    #[serial]
    fn test_config_level_bounds_the_filter() {
        env::remove_var("RUST_LOG");
        for (level, expected) in [
            (LogLevel::Debug, LevelFilter::DEBUG),
            (LogLevel::Warn, LevelFilter::WARN),
            (LogLevel::Fatal, LevelFilter::ERROR),
        ] {
            let cfg = LoggingConfig {
                level,
                ..LoggingConfig::default()
            };
            assert_eq!(build_filter_from_config(&cfg).max_level_hint(), Some(expected));
        }
    }

    /// `RUST_LOG` overrides the configured level.
    #[test]
    #[serial]
    fn test_rust_log_overrides_config() {
        env::set_var("RUST_LOG", "trace");
        let cfg = LoggingConfig {
            level: LogLevel::Error,
            ..LoggingConfig::default()
        };
        let filter = build_filter_from_config(&cfg);
        env::remove_var("RUST_LOG");

        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }
}
