//! CLI configuration: a TOML-loadable wrapper around the core
//! [`wavephy_core::PhyConfig`] plus the logging level this binary exposes.

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use wavephy_core::PhyConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub phy: PhyConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self { phy: PhyConfig::default(), log_level: default_log_level() }
    }
}

impl CliConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&text).wrap_err("failed to parse TOML configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let cfg = CliConfig::default();
        let text = toml::to_string(&cfg).unwrap();
        let back: CliConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.phy.rate_code, cfg.phy.rate_code);
    }
}
