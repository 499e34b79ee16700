//! Persisted settings for the command-line tool
//!
//! The settings file is JSON, saved with `hpsdrflash settings save` and
//! loaded either explicitly or via `--load default`. Flags given on the
//! command line always win over loaded settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{FlashError, Result};
use crate::protocol::DebugDump;

/// File name used for `save default` / `load default`
pub const DEFAULT_SETTINGS_FILE: &str = "hpsdrflash.json";

/// Saved command-line settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Host interface index to discover on
    pub interface_index: u32,
    /// Board MAC the tool operates on (colon-hex, as discovery reports it)
    pub select_mac: Option<String>,
    /// RBF bitstream to program
    pub rbf_path: Option<PathBuf>,
    /// Address to push with set-ip
    pub new_ip: Option<String>,
    /// Wire-level packet dump mode
    pub debug: DebugDump,
    /// Settling delay before the rediscovery that confirms a set-ip, seconds
    pub discovery_delay_secs: u64,
    /// Collection window for multi-board discovery, milliseconds
    pub discovery_wait_ms: u64,
    /// Bound on the erase-finished wait, seconds
    pub erase_timeout_secs: u64,
    /// hpsdrflash-server URL for remote commands
    pub server_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interface_index: 0,
            select_mac: None,
            rbf_path: None,
            new_ip: None,
            debug: DebugDump::None,
            discovery_delay_secs: 2,
            discovery_wait_ms: 2000,
            erase_timeout_secs: 60,
            server_url: "http://localhost:8080".to_string(),
        }
    }
}

impl AppConfig {
    /// Default settings path under the user configuration directory
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::APP_NAME)
            .join(DEFAULT_SETTINGS_FILE)
    }

    /// Load settings from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlashError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save settings as pretty-printed JSON, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FlashError::Config(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| {
            FlashError::Config(format!("failed to write {}: {}", path.display(), e))
        })?;
        log::info!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Retry policy derived from the saved timeout knobs
    pub fn retry_policy(&self) -> crate::protocol::RetryPolicy {
        crate::protocol::RetryPolicy {
            erase_timeout: std::time::Duration::from_secs(self.erase_timeout_secs),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let config = AppConfig {
            interface_index: 3,
            select_mac: Some("0:1c:c0:a2:13:1".to_string()),
            rbf_path: Some(PathBuf::from("/firmware/angelia.rbf")),
            debug: DebugDump::Hex,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.interface_index, 3);
        assert_eq!(loaded.select_mac.as_deref(), Some("0:1c:c0:a2:13:1"));
        assert_eq!(loaded.debug, DebugDump::Hex);
        assert_eq!(loaded.erase_timeout_secs, 60);
    }

    #[test]
    fn test_unknown_fields_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"interface_index": 2, "legacy_field": true}"#).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.interface_index, 2);
        assert_eq!(loaded.discovery_delay_secs, 2);
        assert_eq!(loaded.discovery_wait_ms, 2000);
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load("/nonexistent/settings.json").unwrap_err();
        assert!(matches!(err, FlashError::Config(_)));
    }
}
