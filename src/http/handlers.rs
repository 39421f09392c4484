use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use ferrumq_error::BrokerError;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::{broker::Broker, protocol, version};

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct EntityQuery {
    topic: Option<String>,
    channel: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    version: &'static str,
    hostname: String,
    id: i64,
    http_address: String,
    start_time: DateTime<Utc>,
}

impl EntityQuery {
    fn topic_name(&self) -> ApiResult<&str> {
        required(self.topic.as_deref(), "topic")
    }

    fn channel_name(&self) -> ApiResult<&str> {
        required(self.channel.as_deref(), "channel")
    }

    /// Topic argument, checked against the naming rule.
    fn valid_topic_name(&self) -> ApiResult<&str> {
        let name = self.topic_name()?;
        if !protocol::is_valid_topic_name(name) {
            return Err(BrokerError::InvalidTopicName {
                name: name.to_string(),
            }
            .into());
        }
        Ok(name)
    }

    fn valid_channel_name(&self) -> ApiResult<&str> {
        let name = self.channel_name()?;
        if !protocol::is_valid_channel_name(name) {
            return Err(BrokerError::InvalidChannelName {
                name: name.to_string(),
            }
            .into());
        }
        Ok(name)
    }
}

fn required<'a>(
    value: Option<&'a str>,
    arg: &str,
) -> ApiResult<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(BrokerError::MissingArgument {
            arg: arg.to_string(),
        }
        .into()),
    }
}

fn ensure_running(broker: &Broker) -> ApiResult<()> {
    if broker.is_exiting() {
        return Err(BrokerError::Exiting {
            entity: "broker".to_string(),
        }
        .into());
    }
    Ok(())
}

pub async fn ping(State(broker): State<Arc<Broker>>) -> (StatusCode, String) {
    if broker.is_healthy() {
        (StatusCode::OK, "OK".to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, broker.health())
    }
}

pub async fn info(State(broker): State<Arc<Broker>>) -> Json<InfoResponse> {
    let opts = broker.options();
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_default();
    let http_address = broker
        .http_address()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| opts.http_address.clone());

    Json(InfoResponse {
        version: version::BINARY,
        hostname,
        id: opts.id,
        http_address,
        start_time: broker.start_time(),
    })
}

pub async fn create_topic(
    State(broker): State<Arc<Broker>>,
    Query(query): Query<EntityQuery>,
) -> ApiResult<&'static str> {
    ensure_running(&broker)?;
    broker.get_topic(query.valid_topic_name()?);
    Ok("OK")
}

pub async fn delete_topic(
    State(broker): State<Arc<Broker>>,
    Query(query): Query<EntityQuery>,
) -> ApiResult<&'static str> {
    ensure_running(&broker)?;
    broker.delete_existing_topic(query.topic_name()?)?;
    Ok("OK")
}

pub async fn pause_topic(
    State(broker): State<Arc<Broker>>,
    Query(query): Query<EntityQuery>,
) -> ApiResult<&'static str> {
    ensure_running(&broker)?;
    broker.get_existing_topic(query.topic_name()?)?.pause();
    Ok("OK")
}

pub async fn unpause_topic(
    State(broker): State<Arc<Broker>>,
    Query(query): Query<EntityQuery>,
) -> ApiResult<&'static str> {
    ensure_running(&broker)?;
    broker.get_existing_topic(query.topic_name()?)?.unpause();
    Ok("OK")
}

pub async fn create_channel(
    State(broker): State<Arc<Broker>>,
    Query(query): Query<EntityQuery>,
) -> ApiResult<&'static str> {
    ensure_running(&broker)?;
    let topic_name = query.valid_topic_name()?;
    let channel_name = query.valid_channel_name()?;
    broker.get_topic(topic_name).get_channel(channel_name)?;
    Ok("OK")
}

pub async fn delete_channel(
    State(broker): State<Arc<Broker>>,
    Query(query): Query<EntityQuery>,
) -> ApiResult<&'static str> {
    ensure_running(&broker)?;
    let topic = broker.get_existing_topic(query.topic_name()?)?;
    topic.delete_existing_channel(query.channel_name()?)?;
    Ok("OK")
}
