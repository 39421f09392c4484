use std::{any::Any, path::PathBuf};

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Errors of the data directory lock.
#[derive(Debug, Clone, Error)]
pub enum DirLockError {
    /// Another holder (usually another broker process) owns the lock.
    #[error("--data-path={} in use (possibly by another instance of ferrumqd)", path.display())]
    InUse { path: PathBuf },
    #[error("cannot open directory {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },
    #[error("cannot flock directory {}: {reason}", path.display())]
    Flock { path: PathBuf, reason: String },
    /// `unlock` was called without a successful `lock`.
    #[error("directory {} is not locked", path.display())]
    NotLocked { path: PathBuf },
}

impl ErrorExt for DirLockError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InUse { .. } => StatusCode::DirectoryInUse,
            Self::Open { .. } => StatusCode::StorageUnavailable,
            Self::Flock { .. } | Self::NotLocked { .. } => StatusCode::LockError,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
