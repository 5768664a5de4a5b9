//! Configuration management for repocache

pub mod schema;

pub use schema::{CacheConfig, Config, GeneralConfig, NetworkConfig};

use crate::error::{RepoCacheError, RepoCacheResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Environment variable forcing offline mode
pub const ENV_OFFLINE: &str = "REPOCACHE_OFFLINE";

/// Environment variable overriding `cache.local_repodata_ttl`
pub const ENV_TTL: &str = "REPOCACHE_TTL";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("repocache")
            .join("config.toml")
    }

    /// Load configuration, falling back to defaults, then apply environment overrides
    pub async fn load(&self) -> RepoCacheResult<Config> {
        let mut config = if self.config_path.exists() {
            self.load_from_file(&self.config_path).await?
        } else {
            debug!("Config file not found, using defaults");
            Config::default()
        };

        apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> RepoCacheResult<Config> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            RepoCacheError::io(format!("reading config from {}", path.display()), e)
        })?;

        toml::from_str(&content).map_err(|e| RepoCacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> RepoCacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| RepoCacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            RepoCacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `REPOCACHE_*` environment variables on top of file configuration
pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(value) = std::env::var(ENV_OFFLINE) {
        match parse_bool(&value) {
            Some(offline) => config.cache.offline = offline,
            None => warn!("Ignoring {}={}: expected true/false", ENV_OFFLINE, value),
        }
    }

    if let Ok(value) = std::env::var(ENV_TTL) {
        match value.trim().parse() {
            Ok(ttl) => config.cache.local_repodata_ttl = ttl,
            Err(_) => warn!("Ignoring {}={}: expected an integer", ENV_TTL, value),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        std::env::remove_var(ENV_OFFLINE);
        std::env::remove_var(ENV_TTL);
    }

    #[tokio::test]
    #[serial]
    async fn load_default_when_missing() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("nonexistent.toml"));

        let config = manager.load().await.unwrap();
        assert_eq!(config.cache.local_repodata_ttl, 1);
    }

    #[tokio::test]
    #[serial]
    async fn save_and_load_roundtrip() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("nested").join("config.toml"));

        let mut config = Config::default();
        config.cache.local_repodata_ttl = 600;
        config.cache.offline = true;

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.cache.local_repodata_ttl, 600);
        assert!(loaded.cache.offline);
    }

    #[tokio::test]
    #[serial]
    async fn invalid_file_reports_path() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[cache\nlocal_repodata_ttl = ").unwrap();

        let err = ConfigManager::with_path(path.clone()).load().await.unwrap_err();
        assert!(matches!(err, RepoCacheError::ConfigInvalid { path: p, .. } if p == path));
    }

    #[test]
    #[serial]
    fn env_overrides_file_values() {
        clear_env();
        std::env::set_var(ENV_OFFLINE, "yes");
        std::env::set_var(ENV_TTL, "0");

        let mut config = Config::default();
        apply_env_overrides(&mut config);
        clear_env();

        assert!(config.cache.offline);
        assert_eq!(config.cache.local_repodata_ttl, 0);
    }

    #[test]
    #[serial]
    fn malformed_env_ignored() {
        clear_env();
        std::env::set_var(ENV_TTL, "soon");

        let mut config = Config::default();
        apply_env_overrides(&mut config);
        clear_env();

        assert_eq!(config.cache.local_repodata_ttl, 1);
    }
}
