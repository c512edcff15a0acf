use serde::Deserialize;
use wc_01_snapshot_chain::SnapshotConfig;
use wc_02_fork_controller::ForkConfig;

/// Chain manager configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub snapshot: SnapshotConfig,
    pub fork: ForkConfig,
    /// Timestamp written into the genesis header.
    pub genesis_timestamp: i64,
    /// Upper bound on transactions waiting to be included in a block.
    pub max_pending_transactions: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            snapshot: SnapshotConfig::default(),
            fork: ForkConfig::default(),
            genesis_timestamp: 0,
            max_pending_transactions: 10_000,
        }
    }
}

impl ChainConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_sections() {
        let config = ChainConfig::from_toml_str(
            r#"
            genesis_timestamp = 1529891469000

            [snapshot]
            max_depth = 8

            [fork]
            known_versions = [5, 6]
            "#,
        )
        .unwrap();
        assert_eq!(config.snapshot.max_depth, 8);
        assert_eq!(config.fork.known_versions, vec![5, 6]);
        assert_eq!(config.genesis_timestamp, 1_529_891_469_000);
        assert_eq!(config.max_pending_transactions, 10_000);
    }
}
