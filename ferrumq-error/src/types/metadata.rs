use std::{any::Any, path::PathBuf};

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Errors while reading or writing the metadata file.
#[derive(Debug, Clone, Error)]
pub enum MetadataError {
    #[error("failed to read metadata from {} - {reason}", path.display())]
    Read { path: PathBuf, reason: String },
    #[error("failed to parse metadata in {} - {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("failed to serialize metadata - {reason}")]
    Serialize { reason: String },
    #[error("failed to write metadata to {} - {reason}", path.display())]
    Write { path: PathBuf, reason: String },
    #[error("failed to rename {} to {} - {reason}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },
}

impl ErrorExt for MetadataError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Read { .. } | Self::Write { .. } | Self::Rename { .. } => {
                StatusCode::StorageUnavailable
            }
            Self::Parse { .. } => StatusCode::DeserializationFailed,
            Self::Serialize { .. } => StatusCode::SerializationFailed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
