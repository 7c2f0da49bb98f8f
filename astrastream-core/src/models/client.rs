use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, atomic::AtomicU32},
};
use tokio::sync::mpsc;

use super::control::SubscriptionFilters;

pub type ClientId = Arc<str>;

/// Sending half of a client's bounded outbound queue.
pub type Transport = mpsc::Sender<Arc<str>>;

/// Connection details captured at upgrade time
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: Option<SocketAddr>,
    pub user_agent: Option<String>,
}

pub struct ClientData {
    pub id: ClientId,
    pub transport: Transport,
    pub meta: ClientMeta,
    pub subscriptions: HashMap<Arc<str>, Option<SubscriptionFilters>>,
    pub authenticated: bool,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Consecutive frames dropped because the queue was full
    pub overflow_strikes: AtomicU32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStats {
    pub id: ClientId,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub authenticated: bool,
    pub channels: Vec<ChannelMembership>,
    pub connected_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMembership {
    pub channel: Arc<str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<SubscriptionFilters>,
}

impl From<&ClientData> for ClientStats {
    fn from(client: &ClientData) -> Self {
        let mut channels: Vec<ChannelMembership> = client
            .subscriptions
            .iter()
            .map(|(channel, filters)| ChannelMembership {
                channel: channel.clone(),
                filters: filters.clone(),
            })
            .collect();
        channels.sort_by(|a, b| a.channel.cmp(&b.channel));

        Self {
            id: client.id.clone(),
            ip: client.meta.ip.map(|ip| ip.to_string()),
            user_agent: client.meta.user_agent.clone(),
            authenticated: client.authenticated,
            channels,
            connected_at: client.connected_at,
            last_activity: client.last_activity,
        }
    }
}

#[derive(Deserialize)]
pub struct DisconnectPayload {
    pub id: Arc<str>,
}
