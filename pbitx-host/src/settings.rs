//! Host settings

use std::path::PathBuf;

use anyhow::{Context, Result};
use pbitx_sim::VirtualRadioConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Persisted host settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Serial port to serve CI-V on; stdio when unset
    #[serde(default)]
    pub port: Option<String>,
    /// Serial baud rate
    #[serde(default = "default_baud")]
    pub baud_rate: u32,
    /// Rig settings store; defaults to `state.json` next to this file
    #[serde(default)]
    pub state_file: Option<PathBuf>,
    /// Simulated radio
    #[serde(default)]
    pub radio: VirtualRadioConfig,
}

fn default_baud() -> u32 {
    38400
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud(),
            state_file: None,
            radio: VirtualRadioConfig::default(),
        }
    }
}

impl Settings {
    /// Get the XDG config directory for pbitx
    /// Uses $XDG_CONFIG_HOME/pbitx on Linux/macOS, falls back to ~/.config/pbitx
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("pbitx"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("pbitx"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        let Ok(json) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        Self::from_json(&json).unwrap_or_else(|e| {
            warn!("Ignoring invalid settings file {}: {}", path.display(), e);
            Self::default()
        })
    }

    fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::settings_path().context("Could not determine settings path")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(&path, json).context("Failed to write settings")?;

        Ok(path)
    }

    /// Where the rig's settings store lives
    pub fn state_path(&self) -> PathBuf {
        if let Some(path) = &self.state_file {
            return path.clone();
        }
        Self::config_dir()
            .map(|p| p.join("state.json"))
            .unwrap_or_else(|| PathBuf::from("pbitx-state.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let settings = Settings::from_json(r#"{ "port": "/dev/ttyUSB0" }"#).unwrap();
        assert_eq!(settings.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(settings.baud_rate, 38400);
        assert_eq!(settings.radio, VirtualRadioConfig::default());
    }

    #[test]
    fn test_nested_radio_settings() {
        let settings = Settings::from_json(
            r#"{ "radio": { "tick_interval_ms": 2, "rig": { "rig_address": 148 } } }"#,
        )
        .unwrap();
        assert_eq!(settings.radio.tick_interval_ms, 2);
        assert_eq!(settings.radio.rig.rig_address, 0x94);
        assert_eq!(settings.radio.rig.first_if_hz, 45_005_000);
        assert_eq!(settings.radio.id, "pBitx");
    }

    #[test]
    fn test_explicit_state_file_wins() {
        let settings = Settings {
            state_file: Some(PathBuf::from("/tmp/rig.json")),
            ..Default::default()
        };
        assert_eq!(settings.state_path(), PathBuf::from("/tmp/rig.json"));
    }

    #[test]
    fn test_round_trip() {
        let settings = Settings {
            port: Some("COM3".into()),
            baud_rate: 9600,
            ..Default::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }
}
