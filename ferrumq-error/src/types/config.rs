use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Configuration errors; all of them are fatal at startup.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("invalid log level '{level}' (expected debug, info, warn, error or fatal)")]
    InvalidLogLevel { level: String },
    #[error("failed to load configuration - {reason}")]
    Load { reason: String },
    #[error("invalid value for '{field}' - {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ErrorExt for ConfigError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidLogLevel { .. } => StatusCode::InvalidLogLevel,
            Self::Load { .. } | Self::InvalidValue { .. } => StatusCode::ConfigInvalid,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
