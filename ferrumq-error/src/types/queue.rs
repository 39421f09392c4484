use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Errors of the per-entity backend queues.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    #[error("queue '{name}' is closed")]
    Closed { name: String },
    #[error("queue '{name}': invalid message size {size}, expected between {min} and {max}")]
    InvalidMessageSize {
        name: String,
        size: u64,
        min: u64,
        max: u64,
    },
    #[error("queue '{name}' IO error - {reason}")]
    Io { name: String, reason: String },
    /// A segment or the position file holds data that cannot be decoded.
    #[error("queue '{name}' corrupted - {reason}")]
    Corrupted { name: String, reason: String },
}

impl ErrorExt for QueueError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Closed { .. } => StatusCode::QueueClosed,
            Self::InvalidMessageSize { size, min, .. } if size < min => StatusCode::MessageTooSmall,
            Self::InvalidMessageSize { .. } => StatusCode::MessageTooLarge,
            Self::Io { .. } => StatusCode::Io,
            Self::Corrupted { .. } => StatusCode::CorruptedData,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
