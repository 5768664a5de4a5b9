//! Error types for repocache
//!
//! All modules use `RepoCacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for repocache operations
pub type RepoCacheResult<T> = Result<T, RepoCacheError>;

/// All errors that can occur in repocache
#[derive(Error, Debug)]
pub enum RepoCacheError {
    // Cache state errors
    #[error("Cache not loaded for {0}")]
    CacheNotLoaded(String),

    #[error("A refresh is already in flight for {0}")]
    RefreshInFlight(String),

    #[error("No refresh in flight for {0}")]
    NoRefreshInFlight(String),

    // Transfer errors
    #[error("Unable to retrieve repodata for {url} (response: {status})")]
    TransferFailed { url: String, status: u16 },

    #[error("Unhandled HTTP code {status} for {url}")]
    UnhandledHttpStatus { url: String, status: u16 },

    // Cache file errors
    #[error("Could not open cache file {path}: {source}")]
    CacheOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not write out repodata file {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not read archive {path}: {reason}")]
    Decompress { path: PathBuf, reason: String },

    #[error("No writable package cache directory among: {0}")]
    NoWritablePkgsDir(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl RepoCacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the error ends the refresh of a subdirectory outright.
    ///
    /// Fatal errors are never downgraded to warnings, even for subdirectories
    /// that tolerate transfer failures.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnhandledHttpStatus { .. }
                | Self::CacheOpen { .. }
                | Self::CacheWrite { .. }
                | Self::Decompress { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CacheNotLoaded(_) => Some("Run: repocache fetch <channel> first"),
            Self::CacheOpen { .. } | Self::NoWritablePkgsDir(_) => {
                Some("Check that one of `cache.pkgs_dirs` is writable")
            }
            Self::TransferFailed { .. } => {
                Some("Check the channel URL, or pass --offline to use cached indexes")
            }
            _ => None,
        }
    }
}
