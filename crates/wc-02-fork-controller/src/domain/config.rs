use serde::Deserialize;

/// Versions activated by chain height instead of by witness votes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct LegacyActivation {
    /// Highest height-activated version; blocks declaring a lower version
    /// do not vote.
    pub version: u32,
    /// Chain height at which those versions become active.
    pub activation_height: u64,
}

/// Fork controller configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForkConfig {
    /// Versions the node knows about. Downgrades and resets walk this list
    /// together with every version a block has voted for.
    pub known_versions: Vec<u32>,
    pub legacy: Option<LegacyActivation>,
}

impl ForkConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Activation height of a height-activated version, `None` for versions
    /// that pass by vote.
    pub(crate) fn legacy_activation_height(&self, version: u32) -> Option<u64> {
        self.legacy
            .as_ref()
            .filter(|legacy| version <= legacy.version)
            .map(|legacy| legacy.activation_height)
    }

    pub(crate) fn below_legacy(&self, version: u32) -> bool {
        self.legacy
            .as_ref()
            .is_some_and(|legacy| version < legacy.version)
    }
}
