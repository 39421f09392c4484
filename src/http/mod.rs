//! Administrative HTTP surface.

mod error;
mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
pub use error::ApiError;
use tower_http::trace::TraceLayer;

use crate::broker::Broker;

/// Routes of the admin surface, bound to `broker`.
pub fn router(broker: Arc<Broker>) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/info", get(handlers::info))
        .route("/topic/create", post(handlers::create_topic))
        .route("/topic/delete", post(handlers::delete_topic))
        .route("/topic/pause", post(handlers::pause_topic))
        .route("/topic/unpause", post(handlers::unpause_topic))
        .route("/channel/create", post(handlers::create_channel))
        .route("/channel/delete", post(handlers::delete_channel))
        .layer(TraceLayer::new_for_http())
        .with_state(broker)
}
