//! Connection registry.
//!
//! Owns every live client and every channel membership. Both maps sit
//! behind one lock so removing a client from the client map and from all
//! of its channels is a single step with respect to a concurrent broadcast.
//!
//! Delivery never blocks: frames go into each client's bounded queue with
//! `try_send`, and a full or closed queue only affects that client.

use chrono::{TimeDelta, Utc};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, atomic::Ordering},
    time::Duration,
};
use tokio::sync::{RwLock, mpsc::error::TrySendError};

use crate::{
    auth::TokenValidator,
    models::{
        channel::RegistryStats,
        client::{ClientData, ClientId, ClientMeta, ClientStats, Transport},
        control::{ClientMessage, Subscription},
        message::StreamMessage,
    },
    utils::id_generator::{CLIENT_ID_LENGTH, unique_id},
};

pub const DEFAULT_MAX_OVERFLOW_STRIKES: u32 = 16;

#[derive(Default)]
struct RegistryState {
    clients: HashMap<ClientId, ClientData>,
    channels: HashMap<Arc<str>, HashSet<ClientId>>,
}

impl RegistryState {
    fn remove_client(&mut self, id: &str) -> Option<ClientData> {
        let client = self.clients.remove(id)?;
        for channel in client.subscriptions.keys() {
            if let Some(members) = self.channels.get_mut(channel) {
                members.remove(id);
                if members.is_empty() {
                    self.channels.remove(channel);
                }
            }
        }
        Some(client)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Sent,
    Dropped,
    /// Dropped, and the client hit the strike limit
    Overflowed,
}

pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
    validator: TokenValidator,
    max_overflow_strikes: u32,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(TokenValidator::default(), DEFAULT_MAX_OVERFLOW_STRIKES)
    }
}

impl ConnectionRegistry {
    pub fn new(validator: TokenValidator, max_overflow_strikes: u32) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            validator,
            max_overflow_strikes: max_overflow_strikes.max(1),
        }
    }

    /// Registers a new connection and sends it the welcome message.
    pub async fn accept(&self, transport: Transport, meta: ClientMeta) -> ClientId {
        let mut state = self.state.write().await;
        let id = unique_id(CLIENT_ID_LENGTH, |candidate| {
            state.clients.contains_key(candidate)
        });
        let now = Utc::now();
        let client = ClientData {
            id: id.clone(),
            transport,
            meta,
            subscriptions: HashMap::new(),
            authenticated: false,
            connected_at: now,
            last_activity: now,
            overflow_strikes: Default::default(),
        };

        // A fresh queue cannot be full, so the welcome never overflows
        self.try_deliver(&client, &StreamMessage::welcome(&id).to_frame());
        tracing::info!(
            client = %id,
            ip = ?client.meta.ip,
            "client connected"
        );
        state.clients.insert(id.clone(), client);

        id
    }

    /// Applies one raw control envelope from a client. Any well-formed
    /// JSON counts as activity, even when it is not a usable envelope.
    pub async fn handle_inbound(&self, id: &str, raw: &str) {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(client = %id, error = %e, "dropping malformed inbound message");
                return;
            }
        };

        if !self.touch(id).await {
            return;
        }

        let message = match ClientMessage::from_value(value) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(client = %id, error = %e, "dropping malformed inbound message");
                return;
            }
        };

        match message {
            ClientMessage::Authenticate { token } => {
                self.authenticate(id, token.as_deref().unwrap_or_default())
                    .await;
            }
            ClientMessage::Subscribe { subscription } => {
                self.subscribe(id, subscription).await;
            }
            ClientMessage::Unsubscribe { channel } => {
                self.unsubscribe(id, &channel).await;
            }
            ClientMessage::Ping {} => {
                self.deliver_to_client(id, &StreamMessage::system("pong"))
                    .await;
            }
            ClientMessage::Unknown => {
                tracing::debug!(client = %id, "ignoring unrecognized message type");
            }
        }
    }

    /// Validates `token` and replies with the outcome. A failed attempt
    /// leaves an earlier success in place.
    pub async fn authenticate(&self, id: &str, token: &str) -> bool {
        // Validation may hit the network; don't hold the lock across it
        let accepted = self.validator.validate(token).await;

        let delivery = {
            let mut state = self.state.write().await;
            let Some(client) = state.clients.get_mut(id) else {
                return false;
            };
            if accepted {
                client.authenticated = true;
            }
            tracing::info!(client = %id, accepted, "client authentication");

            let reply = if accepted {
                "Authentication successful"
            } else {
                "Authentication failed"
            };
            self.try_deliver(client, &StreamMessage::system(reply).to_frame())
        };
        self.evict_if_overflowed(id, delivery).await;

        accepted
    }

    pub async fn subscribe(&self, id: &str, subscription: Subscription) -> bool {
        let Subscription { channel, filters } = subscription;
        let channel: Arc<str> = Arc::from(channel);

        let delivery = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let Some(client) = state.clients.get_mut(id) else {
                return false;
            };
            client.subscriptions.insert(channel.clone(), filters);
            state
                .channels
                .entry(channel.clone())
                .or_default()
                .insert(client.id.clone());
            tracing::info!(client = %id, channel = %channel, "client subscribed");

            let ack = StreamMessage::system(format!("Subscribed to {channel}"));
            self.try_deliver(client, &ack.to_frame())
        };
        self.evict_if_overflowed(id, delivery).await;

        true
    }

    pub async fn unsubscribe(&self, id: &str, channel: &str) -> bool {
        let delivery = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            let Some(client) = state.clients.get_mut(id) else {
                return false;
            };
            client.subscriptions.remove(channel);
            if let Some(members) = state.channels.get_mut(channel) {
                members.remove(id);
                if members.is_empty() {
                    state.channels.remove(channel);
                }
            }
            tracing::info!(client = %id, channel = %channel, "client unsubscribed");

            let ack = StreamMessage::system(format!("Unsubscribed from {channel}"));
            self.try_deliver(client, &ack.to_frame())
        };
        self.evict_if_overflowed(id, delivery).await;

        true
    }

    /// Removes a client and all of its memberships. Returns `false` when the
    /// client was already gone.
    pub async fn disconnect(&self, id: &str) -> bool {
        let removed = self.state.write().await.remove_client(id);
        match removed {
            Some(client) => {
                tracing::info!(
                    client = %id,
                    channels = client.subscriptions.len(),
                    "client disconnected"
                );
                true
            }
            None => false,
        }
    }

    /// Sends to one client if its transport is open. Returns whether the
    /// frame was enqueued.
    pub async fn deliver_to_client(&self, id: &str, message: &StreamMessage) -> bool {
        let delivery = {
            let state = self.state.read().await;
            match state.clients.get(id) {
                Some(client) => self.try_deliver(client, &message.to_frame()),
                None => return false,
            }
        };
        self.evict_if_overflowed(id, delivery).await;

        delivery == Delivery::Sent
    }

    /// Fans a message out to every current member of `channel`. Returns the
    /// number of clients it was enqueued for.
    pub async fn deliver_to_channel(&self, channel: &str, message: &StreamMessage) -> usize {
        let (sent, overflowed) = {
            let state = self.state.read().await;
            let Some(members) = state.channels.get(channel) else {
                return 0;
            };

            let frame = message.to_frame();
            let mut sent = 0;
            let mut overflowed = Vec::new();
            for id in members {
                let Some(client) = state.clients.get(id) else {
                    continue;
                };
                match self.try_deliver(client, &frame) {
                    Delivery::Sent => sent += 1,
                    Delivery::Dropped => {}
                    Delivery::Overflowed => overflowed.push(id.clone()),
                }
            }
            (sent, overflowed)
        };

        for id in overflowed {
            self.evict_if_overflowed(&id, Delivery::Overflowed).await;
        }
        tracing::trace!(channel = %channel, sent, "channel delivery");

        sent
    }

    /// Disconnects every client with no inbound activity for `max_idle`.
    pub async fn sweep_idle(&self, max_idle: Duration) -> Vec<ClientId> {
        let Some(cutoff) = TimeDelta::from_std(max_idle)
            .ok()
            .and_then(|idle| Utc::now().checked_sub_signed(idle))
        else {
            return Vec::new();
        };

        let mut state = self.state.write().await;
        let stale: Vec<ClientId> = state
            .clients
            .values()
            .filter(|client| client.last_activity <= cutoff)
            .map(|client| client.id.clone())
            .collect();

        for id in &stale {
            state.remove_client(id);
            tracing::info!(client = %id, "disconnected idle client");
        }

        stale
    }

    pub async fn connection_count(&self) -> usize {
        self.state.read().await.clients.len()
    }

    pub async fn channel_subscriptions(&self) -> BTreeMap<Arc<str>, usize> {
        self.state
            .read()
            .await
            .channels
            .iter()
            .map(|(channel, members)| (channel.clone(), members.len()))
            .collect()
    }

    pub async fn client(&self, id: &str) -> Option<ClientStats> {
        self.state.read().await.clients.get(id).map(ClientStats::from)
    }

    pub async fn stats(&self) -> RegistryStats {
        let state = self.state.read().await;
        let mut clients: Vec<ClientStats> =
            state.clients.values().map(ClientStats::from).collect();
        clients.sort_by(|a, b| a.connected_at.cmp(&b.connected_at));

        RegistryStats {
            connections: state.clients.len(),
            channels: state
                .channels
                .iter()
                .map(|(channel, members)| (channel.clone(), members.len()))
                .collect(),
            clients,
        }
    }

    /// Marks the client active now. Returns `false` for unknown ids.
    pub async fn touch(&self, id: &str) -> bool {
        match self.state.write().await.clients.get_mut(id) {
            Some(client) => {
                client.last_activity = Utc::now();
                true
            }
            None => false,
        }
    }

    fn try_deliver(&self, client: &ClientData, frame: &Arc<str>) -> Delivery {
        if client.transport.is_closed() {
            return Delivery::Dropped;
        }

        match client.transport.try_send(frame.clone()) {
            Ok(()) => {
                client.overflow_strikes.store(0, Ordering::Relaxed);
                Delivery::Sent
            }
            Err(TrySendError::Full(_)) => {
                let strikes = client.overflow_strikes.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(client = %client.id, strikes, "outbound queue full, frame dropped");
                if strikes >= self.max_overflow_strikes {
                    Delivery::Overflowed
                } else {
                    Delivery::Dropped
                }
            }
            Err(TrySendError::Closed(_)) => Delivery::Dropped,
        }
    }

    async fn evict_if_overflowed(&self, id: &str, delivery: Delivery) {
        if delivery == Delivery::Overflowed && self.disconnect(id).await {
            tracing::warn!(client = %id, "disconnected client after sustained queue overflow");
        }
    }
}
