//! Message sources for the broadcast engine's ticks.

use chrono::Utc;
use serde_json::json;
use tinyrand::{Rand, RandRange, Seeded, StdRand};
use tinyrand_std::clock_seed::ClockSeed;

use crate::models::message::{MessageKind, StreamMessage};

/// Produces the message published on each engine tick.
pub trait MessageSource: Send {
    fn next_message(&mut self) -> StreamMessage;
}

const TICK_KINDS: [MessageKind; 4] = [
    MessageKind::MetricUpdate,
    MessageKind::SentimentChange,
    MessageKind::AiInsight,
    MessageKind::PostUpdate,
];

/// Demo feed: one of four kinds, chosen uniformly, with a random payload.
pub struct SyntheticFeed {
    rng: StdRand,
}

impl Default for SyntheticFeed {
    fn default() -> Self {
        Self::with_seed(ClockSeed::default().next_u64())
    }
}

impl SyntheticFeed {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRand::seed(seed),
        }
    }

    /// Uniform in `[0, 1)`
    fn unit(&mut self) -> f64 {
        (self.rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn between(&mut self, low: f64, high: f64) -> f64 {
        low + self.unit() * (high - low)
    }

    fn int(&mut self, low: u64, high: u64) -> u64 {
        self.rng.next_range(low..high)
    }

    fn payload(&mut self, kind: MessageKind) -> serde_json::Value {
        let timestamp = Utc::now();
        match kind {
            MessageKind::MetricUpdate => json!({
                "totalPosts": self.int(500, 1500),
                "avgSentiment": self.between(-1.0, 1.0),
                "engagement": self.int(10_000, 60_000),
                "timestamp": timestamp,
            }),
            MessageKind::SentimentChange => json!({
                "postId": self.int(1, 101),
                "oldSentiment": self.between(-0.5, 0.5),
                "newSentiment": self.between(-0.5, 0.5),
                "change": self.between(-0.2, 0.2),
                "timestamp": timestamp,
            }),
            MessageKind::AiInsight => json!({
                "type": "trend_detection",
                "title": "New Narrative Trend Detected",
                "description": "Rising discussion about economic policies",
                "confidence": self.int(70, 100),
                "impact": "medium",
                "timestamp": timestamp,
            }),
            MessageKind::PostUpdate => json!({
                "postId": self.int(1, 101),
                "newLikes": self.int(100, 1100),
                "newComments": self.int(5, 55),
                "engagementRate": self.between(0.02, 0.12),
                "timestamp": timestamp,
            }),
            MessageKind::UserActivity => json!({ "timestamp": timestamp }),
        }
    }
}

impl MessageSource for SyntheticFeed {
    fn next_message(&mut self) -> StreamMessage {
        let kind = TICK_KINDS[self.rng.next_range(0..TICK_KINDS.len())];
        let data = self.payload(kind);
        StreamMessage::on_default_channel(kind, data)
    }
}
