use std::{any::Any, error::Error};

use crate::StatusCode;

/// Implemented by every domain error carried in a [`crate::StackError`].
pub trait ErrorExt: Error + Send + Sync + 'static {
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Enables [`crate::StackError::downcast_ref`].
    fn as_any(&self) -> &dyn Any;

    /// Text safe to send to admin clients.
    ///
    /// Server-side failures collapse to a fixed string so paths and OS error
    /// text stay in the logs.
    fn client_message(&self) -> String {
        if self.status_code().is_client_error() {
            self.to_string()
        } else {
            "Internal server error".to_string()
        }
    }
}
