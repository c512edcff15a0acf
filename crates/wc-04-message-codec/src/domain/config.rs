use serde::Deserialize;

/// Codec configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest accepted frame (tag plus payload). Longer frames are a
    /// transport fault.
    pub max_frame_length: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_frame_length: 4 * 1024 * 1024,
        }
    }
}

impl CodecConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}
