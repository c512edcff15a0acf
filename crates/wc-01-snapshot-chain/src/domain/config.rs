use serde::Deserialize;

/// Snapshot chain configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Number of layers kept in memory; older layers are flushed to the root store.
    pub max_depth: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { max_depth: 16 }
    }
}

impl SnapshotConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_config_from_toml() {
        let config = SnapshotConfig::from_toml_str("max_depth = 4").unwrap();
        assert_eq!(config.max_depth, 4);

        let config = SnapshotConfig::from_toml_str("").unwrap();
        assert_eq!(config.max_depth, 16);
    }
}
