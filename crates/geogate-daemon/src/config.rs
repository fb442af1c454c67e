//! Daemon configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use geogate_core::ControllerPolicy;

use crate::error::{DaemonError, Result};

/// Environment variable overriding the configuration path
pub const CONFIG_ENV: &str = "GEOGATE_CONFIG";

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Lock controller policy
    pub policy: ControllerPolicy,

    /// Capacity of the actor's event queue
    pub queue_capacity: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            policy: ControllerPolicy::default(),
            queue_capacity: 64,
        }
    }
}

impl GateConfig {
    /// Configuration path: `$GEOGATE_CONFIG`, else the platform config directory
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("geogate")
            .join("gate.json")
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if present, otherwise write and return the default
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.save(path)?;
        tracing::info!("Created default config at {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(DaemonError::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.policy.permission.as_str().is_empty() {
            return Err(DaemonError::Config("permission must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geogate_core::UnlockRequestPolicy;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("gate.json");

        let mut config = GateConfig::default();
        config.policy.unlock_requests = UnlockRequestPolicy::SingleFlight;
        config.queue_capacity = 8;
        config.save(&path).unwrap();

        let loaded = GateConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.json");

        let config = GateConfig::load_or_create(&path).unwrap();
        assert_eq!(config, GateConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.json");
        std::fs::write(&path, r#"{"queue_capacity": 0}"#).unwrap();

        assert!(matches!(
            GateConfig::load(&path),
            Err(DaemonError::Config(_))
        ));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            GateConfig::load(&path),
            Err(DaemonError::Serialization(_))
        ));
    }

    #[test]
    fn test_default_path_under_config_dir() {
        if std::env::var_os(CONFIG_ENV).is_some() {
            return;
        }
        let path = GateConfig::default_path();
        assert!(path.ends_with("geogate/gate.json"));
        if let Some(base) = dirs::config_dir() {
            assert!(path.starts_with(base));
        }
    }
}
