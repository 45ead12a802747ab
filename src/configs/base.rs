use serde::{Deserialize, Serialize};

use crate::{common::types::AnyResult, configs::*};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    pub fn load() -> AnyResult<Self> {
        let config_path = if std::path::Path::new("config.toml").exists() {
            "config.toml"
        } else if std::path::Path::new("config.default.toml").exists() {
            "config.default.toml"
        } else {
            return Err("config.toml or config.default.toml not found".into());
        };

        crate::log_println!("Loading configuration from: {}", config_path);

        let config_str = std::fs::read_to_string(config_path)?;
        Self::from_toml(&config_str).map_err(|e| format!("{}: {}", config_path, e).into())
    }

    pub fn from_toml(config_str: &str) -> AnyResult<Self> {
        if config_str.trim().is_empty() {
            return Err("configuration is empty".into());
        }

        let config: Config = toml::from_str(config_str)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_rejected() {
        assert!(Config::from_toml("   \n").is_err());
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = Config::from_toml("[server]\nport = 9000\n").unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.relay.sample_rate, 44_100);
        assert_eq!(config.player.fft_size, 256);
        assert!(config.logging.is_none());
    }

    #[test]
    fn shipped_default_config_parses() {
        let raw = include_str!("../../config.default.toml");
        let config = Config::from_toml(raw).unwrap();
        assert_eq!(config.server.port, 7633);
        assert_eq!(config.relay.bitrate_kbps, 192);
        assert_eq!(config.player.toggle_mode, ToggleMode::Pause);
        assert_eq!(config.telemetry.limit, 6);
    }
}
