//! Configuration schema for repocache
//!
//! Configuration is stored at `~/.config/repocache/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Index cache settings
    pub cache: CacheConfig,

    /// Transfer settings
    pub network: NetworkConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Repodata cache policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a cached index stays fresh. 1 follows the server's
    /// `Cache-Control: max-age`, 0 or less always revalidates.
    pub local_repodata_ttl: i64,

    /// Never download; use whatever is cached
    pub offline: bool,

    /// Package directories, the first writable one holds the index cache
    pub pkgs_dirs: Vec<PathBuf>,

    /// Passed on to the solver with each repository
    pub add_pip_as_python_dependency: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            local_repodata_ttl: 1,
            offline: false,
            pkgs_dirs: vec![default_pkgs_dir()],
            add_pip_as_python_dependency: true,
        }
    }
}

fn default_pkgs_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("repocache")
        .join("pkgs")
}

/// Transfer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Overall timeout for one transfer
    pub timeout_secs: u64,

    /// `User-Agent` header sent with every request
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            user_agent: format!("repocache/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
