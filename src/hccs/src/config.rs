use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommConfig {
    pub channel_count: u32,
    /// bidirectional ring count assumed by the pivot-path probe;
    /// 0 means the fabric reported no usable rings
    #[serde(default)]
    pub pivot_num_bi_rings: u32,
}

impl Default for CommConfig {
    fn default() -> Self {
        CommConfig {
            channel_count: 1,
            pivot_num_bi_rings: 0,
        }
    }
}

impl CommConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_toml_with_defaults() {
        let config: CommConfig = toml::from_str("channel_count = 4\n").unwrap();
        assert_eq!(config.channel_count, 4);
        assert_eq!(config.pivot_num_bi_rings, 0);

        let config: CommConfig =
            toml::from_str("channel_count = 8\npivot_num_bi_rings = 2\n").unwrap();
        assert_eq!(config.pivot_num_bi_rings, 2);
    }
}
