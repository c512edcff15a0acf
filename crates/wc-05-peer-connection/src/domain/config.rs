use std::time::Duration;

use serde::Deserialize;
use wc_04_message_codec::CodecConfig;

/// Connection configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub codec: CodecConfig,
    /// Connections accepted or dialed beyond this are refused.
    pub max_peers: usize,
    /// Decode failures tolerated before the connection is closed.
    pub max_decode_errors: u32,
    /// Close the connection after this long without inbound traffic.
    pub idle_timeout_ms: u64,
    /// Send a keep-alive after this long without outbound traffic.
    pub keep_alive_interval_ms: u64,
    pub connect_timeout_ms: u64,
    /// Log a warning once this many messages are queued for one peer.
    pub send_queue_warn: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            codec: CodecConfig::default(),
            max_peers: 30,
            max_decode_errors: 3,
            idle_timeout_ms: 60_000,
            keep_alive_interval_ms: 10_000,
            connect_timeout_ms: 5_000,
            send_queue_warn: 1_024,
        }
    }
}

impl ConnectionConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Never zero; `0` sends a keep-alive every idle millisecond.
    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_millis(self.keep_alive_interval_ms.max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
