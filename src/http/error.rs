use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ferrumq_error::StackError;
use tracing::{debug, warn};

/// Error returned by admin handlers, rendered as an `ErrorResponse` body
/// with the status mapped from its status code.
#[derive(Debug)]
pub struct ApiError(pub StackError);

impl<E: Into<StackError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code().http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            warn!(error = %self.0, status = status.as_u16(), "admin request failed");
        } else {
            debug!(error = %self.0, status = status.as_u16(), "admin request rejected");
        }

        (status, Json(self.0.to_response())).into_response()
    }
}
