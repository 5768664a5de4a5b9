//! Transfer layer for repodata refreshes
//!
//! A [`TransferTarget`] describes one conditional GET armed by a
//! [`SubdirCache`]. A [`Transport`] performs it and reports a
//! [`TransferResult`]; [`download_all`] runs every armed target concurrently
//! and then finalizes each subdirectory exactly once.

use crate::cache::{HeaderMetadata, SubdirCache};
use crate::config::NetworkConfig;
use crate::error::{RepoCacheError, RepoCacheResult};
use async_trait::async_trait;
use futures_util::future::join_all;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Result code of a transfer that completed (whatever its HTTP status)
pub const TRANSFER_OK: i32 = 0;

/// Result code of a transfer that did not complete
pub const TRANSFER_FAILED: i32 = 1;

/// One armed download
#[derive(Debug, Clone)]
pub struct TransferTarget {
    /// Subdirectory name, for progress and logs
    pub name: String,

    /// Source URL
    pub url: String,

    /// Staging file the body is written to
    pub destination: PathBuf,

    /// Headers of the current cache, for `If-None-Match` / `If-Modified-Since`
    pub conditional: Option<HeaderMetadata>,

    /// Whether failure of this transfer is tolerated
    pub ignore_failure: bool,
}

/// Outcome of a transfer as reported by the transport
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferResult {
    /// [`TRANSFER_OK`] if the exchange completed
    pub result: i32,

    /// HTTP status; 0 for local files
    pub http_status: u16,

    /// `ETag` response header
    pub etag: String,

    /// `Last-Modified` response header
    pub last_modified: String,

    /// `Cache-Control` response header
    pub cache_control: String,
}

impl TransferResult {
    /// A transfer that never produced a response
    pub fn failed() -> Self {
        Self {
            result: TRANSFER_FAILED,
            ..Self::default()
        }
    }

    /// A local file copied into the staging file
    pub fn local() -> Self {
        Self::default()
    }
}

/// Performs transfers. Never fails outright; problems are reported through
/// [`TransferResult::result`] and [`TransferResult::http_status`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, target: &TransferTarget) -> TransferResult;
}

/// `ureq`-backed transport, also serving `file://` URLs
pub struct HttpTransport {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(config: &NetworkConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Self {
            agent,
            user_agent: config.user_agent.clone(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, target: &TransferTarget) -> TransferResult {
        if let Some(path) = target.url.strip_prefix("file://") {
            return match tokio::fs::copy(path, &target.destination).await {
                Ok(bytes) => {
                    debug!("Copied {} bytes from {}", bytes, path);
                    TransferResult::local()
                }
                Err(e) => {
                    warn!("Could not read {}: {}", path, e);
                    TransferResult::failed()
                }
            };
        }

        let agent = self.agent.clone();
        let user_agent = self.user_agent.clone();
        let target = target.clone();
        tokio::task::spawn_blocking(move || fetch_http(&agent, &user_agent, &target))
            .await
            .unwrap_or_else(|e| {
                warn!("Transfer task failed: {}", e);
                TransferResult::failed()
            })
    }
}

fn fetch_http(agent: &ureq::Agent, user_agent: &str, target: &TransferTarget) -> TransferResult {
    let mut request = agent.get(target.url.as_str()).header("User-Agent", user_agent);
    if let Some(cached) = &target.conditional {
        if !cached.etag.is_empty() {
            request = request.header("If-None-Match", cached.etag.as_str());
        }
        if !cached.last_modified.is_empty() {
            request = request.header("If-Modified-Since", cached.last_modified.as_str());
        }
    }

    debug!("GET {}", target.url);
    let mut response = match request.call() {
        Ok(response) => response,
        Err(e) => {
            warn!("Request to {} failed: {}", target.url, e);
            return TransferResult::failed();
        }
    };

    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    let mut result = TransferResult {
        result: TRANSFER_OK,
        http_status: response.status().as_u16(),
        etag: header("ETag"),
        last_modified: header("Last-Modified"),
        cache_control: header("Cache-Control"),
    };

    if result.http_status == 200 {
        let written = File::create(&target.destination).and_then(|mut file| {
            io::copy(&mut response.body_mut().as_reader(), &mut file)
        });
        match written {
            Ok(bytes) => debug!("Downloaded {} bytes from {}", bytes, target.url),
            Err(e) => {
                warn!("Could not download {}: {}", target.url, e);
                result.result = TRANSFER_FAILED;
            }
        }
    }

    result
}

/// Run every armed transfer concurrently, then finalize each subdirectory.
///
/// A failed transfer is an error for targets that do not tolerate failure and
/// a warning otherwise. Fatal finalize errors abort immediately, whatever the
/// target tolerates.
pub async fn download_all<T>(
    transport: &T,
    jobs: Vec<(&mut SubdirCache, TransferTarget)>,
) -> RepoCacheResult<()>
where
    T: Transport + ?Sized,
{
    let results = join_all(jobs.iter().map(|(_, target)| transport.fetch(target))).await;

    for ((subdir, target), result) in jobs.into_iter().zip(results) {
        match subdir.finalize_transfer(&result) {
            Ok(true) => continue,
            Ok(false) => {}
            Err(e) if e.is_fatal() || !target.ignore_failure => return Err(e),
            Err(e) => {
                warn!("Skipping {}: {}", target.name, e);
                continue;
            }
        }

        if target.ignore_failure {
            warn!(
                "Skipping {}: unable to retrieve repodata (response: {})",
                target.name, result.http_status
            );
        } else {
            return Err(RepoCacheError::TransferFailed {
                url: target.url,
                status: result.http_status,
            });
        }
    }

    Ok(())
}
