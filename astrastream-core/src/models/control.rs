use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::StreamResult;

/// Control envelope sent by clients. Dispatch is on the `type` field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Authenticate {
        #[serde(default)]
        token: Option<String>,
    },
    Subscribe {
        subscription: Subscription,
    },
    Unsubscribe {
        channel: String,
    },
    Ping {},
    /// Any other `type` value; ignored by the registry
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn parse(raw: &str) -> StreamResult<Self> {
        Self::from_value(serde_json::from_str(raw)?)
    }

    /// Types an already decoded JSON document.
    pub fn from_value(value: Value) -> StreamResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub channel: String,
    #[serde(
        default,
        deserialize_with = "advisory",
        skip_serializing_if = "Option::is_none"
    )]
    pub filters: Option<SubscriptionFilters>,
}

/// Advisory narrowing hints attached at subscribe time. Stored with the
/// membership but never applied when selecting broadcast targets.
///
/// A field that does not fit its type is dropped on its own, so bad hints
/// never cost a client its subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionFilters {
    #[serde(
        default,
        deserialize_with = "advisory",
        skip_serializing_if = "Option::is_none"
    )]
    pub topics: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "advisory",
        skip_serializing_if = "Option::is_none"
    )]
    pub sentiment: Option<SentimentPolarity>,
    #[serde(
        default,
        deserialize_with = "advisory",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_range: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentPolarity {
    Positive,
    Negative,
    Neutral,
}

/// Reads any JSON value and keeps it only if it fits `T`.
fn advisory<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }

    match serde_json::from_value(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unusable subscription filter");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authenticate() {
        let msg = ClientMessage::parse(r#"{"type":"authenticate","token":"demo_token"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Authenticate {
                token: Some("demo_token".to_string())
            }
        );

        let msg = ClientMessage::parse(r#"{"type":"authenticate"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Authenticate { token: None });
    }

    #[test]
    fn test_parse_subscribe_with_filters() {
        let raw = r#"{
            "type": "subscribe",
            "subscription": {
                "channel": "sentiment",
                "filters": { "topics": ["economy"], "sentiment": "negative", "timeRange": 24 }
            }
        }"#;

        match ClientMessage::parse(raw).unwrap() {
            ClientMessage::Subscribe { subscription } => {
                assert_eq!(subscription.channel, "sentiment");
                let filters = subscription.filters.unwrap();
                assert_eq!(filters.topics, Some(vec!["economy".to_string()]));
                assert_eq!(filters.sentiment, Some(SentimentPolarity::Negative));
                assert_eq!(filters.time_range, Some(24.0));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_bad_filters_do_not_block_subscribe() {
        let raw = r#"{
            "type": "subscribe",
            "subscription": {
                "channel": "sentiment",
                "filters": { "topics": "economy", "sentiment": "mixed", "timeRange": 24 }
            }
        }"#;

        match ClientMessage::parse(raw).unwrap() {
            ClientMessage::Subscribe { subscription } => {
                assert_eq!(subscription.channel, "sentiment");
                let filters = subscription.filters.unwrap();
                assert_eq!(filters.topics, None);
                assert_eq!(filters.sentiment, None);
                assert_eq!(filters.time_range, Some(24.0));
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let raw = r#"{"type":"subscribe","subscription":{"channel":"posts","filters":"recent"}}"#;
        match ClientMessage::parse(raw).unwrap() {
            ClientMessage::Subscribe { subscription } => {
                assert_eq!(subscription.channel, "posts");
                assert_eq!(subscription.filters, None);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_parse_ping_and_unknown() {
        assert_eq!(
            ClientMessage::parse(r#"{"type":"ping","seq":3}"#).unwrap(),
            ClientMessage::Ping {}
        );
        assert_eq!(
            ClientMessage::parse(r#"{"type":"dance"}"#).unwrap(),
            ClientMessage::Unknown
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(ClientMessage::parse("not json").is_err());
        assert!(ClientMessage::parse(r#"{"token":"abc"}"#).is_err());
        assert!(ClientMessage::parse(r#"{"type":"subscribe"}"#).is_err());
        assert!(ClientMessage::parse(r#"{"type":"unsubscribe"}"#).is_err());
    }
}
