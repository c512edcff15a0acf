use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

/// Sync protocol configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// A fetch that gets no transfer within this interval is a miss.
    pub request_timeout_ms: u64,
    /// Re-requests of one item, each against a different advertiser.
    pub max_retries: u32,
    /// Inventories and fetches listing more ids are refused.
    pub max_ids_per_inventory: usize,
    /// Accepted messages kept for answering fetches.
    pub cache_size: usize,
    /// Items remembered per peer as known to it.
    pub known_per_peer: usize,
    /// Unlinked blocks held while their ancestors are fetched.
    pub orphan_limit: usize,
    pub maintenance_interval_ms: u64,
    /// Endpoints returned in one `Neighbours` reply.
    pub max_neighbours: usize,
    /// Address this node advertises as its own.
    pub advertise_addr: Option<SocketAddr>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            max_retries: 2,
            max_ids_per_inventory: 1_000,
            cache_size: 10_000,
            known_per_peer: 4_096,
            orphan_limit: 512,
            maintenance_interval_ms: 1_000,
            max_neighbours: 16,
            advertise_addr: None,
        }
    }
}

impl SyncConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Never zero; `0` ticks every millisecond.
    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_millis(self.maintenance_interval_ms.max(1))
    }
}
