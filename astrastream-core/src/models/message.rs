use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const SYSTEM_CHANNEL: &str = "system";
pub const METRICS_CHANNEL: &str = "metrics";
pub const SENTIMENT_CHANNEL: &str = "sentiment";
pub const INSIGHTS_CHANNEL: &str = "insights";
pub const POSTS_CHANNEL: &str = "posts";

pub const WELCOME_MESSAGE: &str = "Connected to ASTRA Intelligence Stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    PostUpdate,
    SentimentChange,
    AiInsight,
    UserActivity,
    MetricUpdate,
}

impl MessageKind {
    /// Channel the broadcast engine publishes this kind on.
    /// `UserActivity` lives on the reserved system channel.
    pub fn channel(self) -> &'static str {
        match self {
            MessageKind::PostUpdate => POSTS_CHANNEL,
            MessageKind::SentimentChange => SENTIMENT_CHANNEL,
            MessageKind::AiInsight => INSIGHTS_CHANNEL,
            MessageKind::UserActivity => SYSTEM_CHANNEL,
            MessageKind::MetricUpdate => METRICS_CHANNEL,
        }
    }
}

/// Outbound envelope. The payload shape depends on `kind` but is not
/// enforced; consumers must tolerate variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    pub channel: Arc<str>,
}

impl StreamMessage {
    pub fn new(kind: MessageKind, channel: impl Into<Arc<str>>, data: Value) -> Self {
        Self {
            kind,
            data,
            timestamp: Utc::now(),
            channel: channel.into(),
        }
    }

    /// A message on its kind's default channel.
    pub fn on_default_channel(kind: MessageKind, data: Value) -> Self {
        Self::new(kind, kind.channel(), data)
    }

    /// Connection-lifecycle acknowledgement on the system channel.
    pub fn system(message: impl Into<String>) -> Self {
        Self::new(
            MessageKind::UserActivity,
            SYSTEM_CHANNEL,
            serde_json::json!({ "message": message.into() }),
        )
    }

    pub fn welcome(client_id: &str) -> Self {
        Self::new(
            MessageKind::UserActivity,
            SYSTEM_CHANNEL,
            serde_json::json!({ "message": WELCOME_MESSAGE, "clientId": client_id }),
        )
    }

    /// Serialized text frame shared across every recipient of a broadcast.
    pub fn to_frame(&self) -> Arc<str> {
        match serde_json::to_string(self) {
            Ok(json) => Arc::from(json),
            // Value payloads always serialize; keep the envelope shape anyway
            Err(e) => {
                tracing::error!(error = %e, channel = %self.channel, "failed to serialize stream message");
                Arc::from("{}")
            }
        }
    }
}
