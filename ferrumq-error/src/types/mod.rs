pub mod broker;
pub mod config;
pub mod lock;
pub mod metadata;
pub mod queue;

use std::{any::Any, io};

pub use broker::*;
pub use config::*;
pub use lock::*;
pub use metadata::*;
pub use queue::*;
use thiserror::Error;

use crate::{ErrorExt, StackError, StatusCode};

/// OS failure that has no domain error of its own, such as resolving the
/// working directory.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct OsError {
    kind: io::ErrorKind,
    message: String,
}

impl OsError {
    pub fn kind(&self) -> io::ErrorKind {
        self.kind
    }
}

impl ErrorExt for OsError {
    fn status_code(&self) -> StatusCode {
        match self.kind {
            io::ErrorKind::PermissionDenied => StatusCode::PermissionDenied,
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted => StatusCode::ConnectionFailed,
            io::ErrorKind::AddrInUse | io::ErrorKind::AddrNotAvailable => StatusCode::BindFailed,
            io::ErrorKind::TimedOut => StatusCode::Timeout,
            io::ErrorKind::UnexpectedEof => StatusCode::UnexpectedEof,
            io::ErrorKind::StorageFull => StatusCode::DiskFull,
            _ => StatusCode::Io,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl From<io::Error> for StackError {
    fn from(err: io::Error) -> Self {
        StackError::new(OsError {
            kind: err.kind(),
            message: err.to_string(),
        })
    }
}
