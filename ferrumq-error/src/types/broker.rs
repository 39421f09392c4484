use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Errors raised by the topic/channel registry and its admin surface.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// No topic registered under this name.
    #[error("topic '{topic}' not found")]
    TopicNotFound { topic: String },
    /// No channel registered under this name in the topic.
    #[error("channel '{channel}' not found in topic '{topic}'")]
    ChannelNotFound { topic: String, channel: String },
    #[error("invalid topic name '{name}'")]
    InvalidTopicName { name: String },
    #[error("invalid channel name '{name}'")]
    InvalidChannelName { name: String },
    /// A required request argument is absent.
    #[error("missing argument '{arg}'")]
    MissingArgument { arg: String },
    /// The entity is shutting down and refuses the operation.
    #[error("{entity} is exiting")]
    Exiting { entity: String },
    /// The admin listener could not be bound.
    #[error("listen http ({address}) failed - {reason}")]
    ListenFailed { address: String, reason: String },
    /// The registry was created outside an async runtime.
    #[error("no async runtime available: {reason}")]
    NoRuntime { reason: String },
}

impl ErrorExt for BrokerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::TopicNotFound { .. } | Self::ChannelNotFound { .. } => StatusCode::NotFound,
            Self::InvalidTopicName { .. } | Self::InvalidChannelName { .. } => {
                StatusCode::InvalidName
            }
            Self::MissingArgument { .. } => StatusCode::MissingArgument,
            Self::Exiting { .. } => StatusCode::Exiting,
            Self::ListenFailed { .. } => StatusCode::BindFailed,
            Self::NoRuntime { .. } => StatusCode::Internal,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    /// Wire tokens understood by existing admin tooling.
    fn client_message(&self) -> String {
        match self {
            Self::TopicNotFound { .. } => "TOPIC_NOT_FOUND".to_string(),
            Self::ChannelNotFound { .. } => "CHANNEL_NOT_FOUND".to_string(),
            Self::InvalidTopicName { .. } => "INVALID_TOPIC".to_string(),
            Self::InvalidChannelName { .. } => "INVALID_CHANNEL".to_string(),
            Self::MissingArgument { arg } => format!("MISSING_ARG_{}", arg.to_uppercase()),
            Self::Exiting { .. } => "EXITING".to_string(),
            Self::ListenFailed { .. } | Self::NoRuntime { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}
