//! Broadcast engine.
//!
//! Publishes `StreamMessage`s on a timer (whatever the configured
//! `MessageSource` yields) or on demand, and fans them out through the
//! connection registry. Delivery failures stay inside the registry.

pub mod feed;

use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, broadcast},
    time::{Instant, MissedTickBehavior},
};

use crate::{
    models::message::{MessageKind, StreamMessage},
    registry::ConnectionRegistry,
};

pub use feed::{MessageSource, SyntheticFeed};

pub struct BroadcastEngine {
    registry: Arc<ConnectionRegistry>,
    source: Mutex<Box<dyn MessageSource>>,
    tick_interval: Duration,
}

impl BroadcastEngine {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        source: Box<dyn MessageSource>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            registry,
            source: Mutex::new(source),
            tick_interval,
        }
    }

    pub fn with_synthetic_feed(registry: Arc<ConnectionRegistry>, tick_interval: Duration) -> Self {
        Self::new(registry, Box::new(SyntheticFeed::default()), tick_interval)
    }

    /// Publishes the source's next message on its channel. Returns the
    /// number of clients it reached.
    pub async fn tick(&self) -> usize {
        let message = self.source.lock().await.next_message();
        let delivered = self
            .registry
            .deliver_to_channel(&message.channel, &message)
            .await;
        tracing::debug!(
            kind = ?message.kind,
            channel = %message.channel,
            delivered,
            "broadcast tick"
        );
        delivered
    }

    pub async fn publish_metric_update(&self, data: Value) -> usize {
        self.publish(MessageKind::MetricUpdate, data).await
    }

    pub async fn publish_ai_insight(&self, data: Value) -> usize {
        self.publish(MessageKind::AiInsight, data).await
    }

    async fn publish(&self, kind: MessageKind, data: Value) -> usize {
        let message = StreamMessage::on_default_channel(kind, data);
        self.registry
            .deliver_to_channel(&message.channel, &message)
            .await
    }

    pub async fn active_connections(&self) -> usize {
        self.registry.connection_count().await
    }

    pub async fn channel_subscriptions(&self) -> BTreeMap<Arc<str>, usize> {
        self.registry.channel_subscriptions().await
    }

    /// Ticks every `tick_interval` until `shutdown` fires. The first tick
    /// happens one interval after start.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_ms = self.tick_interval.as_millis() as u64, "broadcast engine started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("broadcast engine stopping");
                    break;
                }
            }
        }
    }
}
