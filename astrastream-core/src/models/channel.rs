use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};

use super::client::ClientStats;

/// Snapshot served by the admin stats route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryStats {
    pub connections: usize,
    pub channels: BTreeMap<Arc<str>, usize>,
    pub clients: Vec<ClientStats>,
}
