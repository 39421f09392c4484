use std::fmt;

use crate::config::LogLevel;

/// Routes a queue's log output through `tracing`, filtered by the broker's
/// configured level at the time the queue was created.
#[derive(Debug, Clone)]
pub struct QueueLogger {
    queue: String,
    level: LogLevel,
}

impl QueueLogger {
    pub fn new(
        queue: impl Into<String>,
        level: LogLevel,
    ) -> Self {
        Self {
            queue: queue.into(),
            level,
        }
    }

    pub fn enabled(
        &self,
        level: LogLevel,
    ) -> bool {
        self.level.allows(level)
    }

    pub fn log(
        &self,
        level: LogLevel,
        args: fmt::Arguments<'_>,
    ) {
        if !self.enabled(level) {
            return;
        }
        let queue = self.queue.as_str();
        match level {
            LogLevel::Debug => tracing::debug!(target: "ferrumq::backend", queue, "{args}"),
            LogLevel::Info => tracing::info!(target: "ferrumq::backend", queue, "{args}"),
            LogLevel::Warn => tracing::warn!(target: "ferrumq::backend", queue, "{args}"),
            LogLevel::Error | LogLevel::Fatal => {
                tracing::error!(target: "ferrumq::backend", queue, "{args}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold() {
        let logger = QueueLogger::new("orders", LogLevel::Warn);
        assert!(!logger.enabled(LogLevel::Info));
        assert!(logger.enabled(LogLevel::Error));
        logger.log(LogLevel::Error, format_args!("segment {} corrupted", 3));
    }
}
