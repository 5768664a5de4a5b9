//! Per-subdirectory repodata cache
//!
//! A [`SubdirCache`] decides whether the cached `repodata.json` of one channel
//! subdirectory (e.g. `conda-forge/linux-64`) can be used as-is, arms a
//! conditional refresh when it cannot, and commits the transfer outcome.
//!
//! # States
//!
//! | Outcome of `load` | Meaning |
//! |-------------------|---------|
//! | `Accepted` | Cache fresh (or offline), nothing to download |
//! | `RefreshArmed` | A transfer must run, then `finalize_transfer` |
//! | `Unavailable` | Offline with no cache, subdir skipped this session |

use super::decompress::decompress;
use super::dir::{cache_fn_url, create_cache_dir, derived_cache_name, CACHE_SUBDIR};
use super::freshness::{age, is_caching_forbidden, max_age_seconds};
use super::header::{read_header, write_spliced, HeaderMetadata};
use super::staging::StagingFile;
use crate::config::CacheConfig;
use crate::error::{RepoCacheError, RepoCacheResult};
use crate::transfer::{TransferResult, TransferTarget};
use crate::ui::{self, RefreshProgress, UiContext};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Result of [`SubdirCache::load`]
#[derive(Debug)]
#[must_use]
pub enum LoadOutcome {
    /// The cached index is usable without any network I/O
    Accepted,
    /// The cache is stale or missing; drive this transfer to completion and
    /// hand its result to [`SubdirCache::finalize_transfer`]
    RefreshArmed(TransferTarget),
    /// Offline and nothing cached; the subdirectory is skipped
    Unavailable,
}

/// What finalizing a transfer will do, decided from the transfer result alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizePlan {
    /// Transfer failed or the server answered with an error status
    Failed,
    /// 304: the cached index is still current
    NotModified,
    /// 200, or 0 for local files: commit the new index
    Commit,
    /// Any other status
    Unhandled(u16),
}

/// Decide how a completed transfer is finalized
pub fn plan_finalize(result: &TransferResult) -> FinalizePlan {
    if result.result != 0 || result.http_status >= 400 {
        return FinalizePlan::Failed;
    }

    match result.http_status {
        304 => FinalizePlan::NotModified,
        0 | 200 => FinalizePlan::Commit,
        other => FinalizePlan::Unhandled(other),
    }
}

/// Metadata handed to the solver when building a repository from the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoMetadata {
    pub url: String,
    pub add_pip_as_python_dependency: bool,
    pub etag: String,
    pub last_modified: String,
}

/// Resources owned while a refresh is in flight
struct PendingRefresh {
    staging: StagingFile,
    progress: RefreshProgress,
}

/// Cache state for one channel subdirectory
pub struct SubdirCache {
    name: String,
    url: String,
    pkgs_dir: PathBuf,
    json_cache: PathBuf,
    derived_cache: PathBuf,
    is_noarch: bool,
    loaded: bool,
    download_complete: bool,
    json_cache_valid: bool,
    derived_cache_valid: bool,
    header: Option<HeaderMetadata>,
    pending: Option<PendingRefresh>,
    ui: UiContext,
}

impl SubdirCache {
    /// Create the cache for `url`, stored under `<pkgs_dir>/cache`.
    ///
    /// `is_noarch` marks the primary subdirectory, whose transfer failure is
    /// an error rather than a warning.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        pkgs_dir: &Path,
        is_noarch: bool,
    ) -> Self {
        let url = url.into();
        let json_cache = pkgs_dir.join(CACHE_SUBDIR).join(cache_fn_url(&url));
        let derived_cache = derived_cache_name(&json_cache);

        Self {
            name: name.into(),
            url,
            pkgs_dir: pkgs_dir.to_path_buf(),
            json_cache,
            derived_cache,
            is_noarch,
            loaded: false,
            download_complete: false,
            json_cache_valid: false,
            derived_cache_valid: false,
            header: None,
            pending: None,
            ui: UiContext::non_interactive(),
        }
    }

    /// Report progress through `ctx` instead of plain output
    pub fn with_ui(mut self, ctx: &UiContext) -> Self {
        self.ui = ctx.clone();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn download_complete(&self) -> bool {
        self.download_complete
    }

    pub fn is_noarch(&self) -> bool {
        self.is_noarch
    }

    pub fn json_cache_path(&self) -> &Path {
        &self.json_cache
    }

    pub fn derived_cache_path(&self) -> &Path {
        &self.derived_cache
    }

    /// Headers of the cached index, once read or written
    pub fn header(&self) -> Option<&HeaderMetadata> {
        self.header.as_ref()
    }

    /// Decide whether the cached index can be used, arming a refresh if not
    pub fn load(
        &mut self,
        config: &CacheConfig,
        now: SystemTime,
    ) -> RepoCacheResult<LoadOutcome> {
        let forbidden = is_caching_forbidden(&self.url);

        let Some(cache_age) = age(&self.json_cache, now).filter(|_| !forbidden) else {
            info!("No cache found {}", self.url);
            if !config.offline || forbidden {
                self.header = None;
                return self.arm_refresh().map(LoadOutcome::RefreshArmed);
            }
            debug!("Offline and no cache for {}, skipping", self.name);
            return Ok(LoadOutcome::Unavailable);
        };

        debug!("Found cache file {}", self.json_cache.display());
        self.header = read_header(&self.json_cache);

        let Some(header) = &self.header else {
            info!("Could not determine cache file mod / etag headers");
            return self.arm_refresh().map(LoadOutcome::RefreshArmed);
        };

        let max_age = max_age_seconds(config.local_repodata_ttl, &header.cache_control);
        let cache_age_secs = cache_age.as_secs();

        if max_age > cache_age_secs || config.offline {
            info!(
                "Using cache {} age in seconds: {} / {}",
                self.url, cache_age_secs, max_age
            );
            ui::subdir_status(&self.ui, &self.name, "Using cache");

            self.loaded = true;
            self.json_cache_valid = true;

            let derived_age = age(&self.derived_cache, now);
            debug!(
                "Solv cache age in seconds: {:?}",
                derived_age.map(|a| a.as_secs())
            );
            if derived_not_older(derived_age, Some(cache_age)) {
                info!("Also using .solv cache file");
                self.derived_cache_valid = true;
            }
            return Ok(LoadOutcome::Accepted);
        }

        info!(
            "Cache {} expired, age in seconds: {} / {}",
            self.url, cache_age_secs, max_age
        );
        self.arm_refresh().map(LoadOutcome::RefreshArmed)
    }

    /// Create the staging file and transfer target for a refresh
    fn arm_refresh(&mut self) -> RepoCacheResult<TransferTarget> {
        if self.pending.is_some() {
            return Err(RepoCacheError::RefreshInFlight(self.name.clone()));
        }

        let staging =
            StagingFile::new().map_err(|e| RepoCacheError::io("creating staging file", e))?;
        let progress = RefreshProgress::new(&self.ui, &self.name);

        let target = TransferTarget {
            name: self.name.clone(),
            url: self.url.clone(),
            destination: staging.path().to_path_buf(),
            conditional: self.header.clone(),
            // Only the noarch subdir is required; others may be missing
            ignore_failure: !self.is_noarch,
        };

        debug!(
            "Armed refresh of {} into {}",
            self.url,
            target.destination.display()
        );
        self.pending = Some(PendingRefresh { staging, progress });
        Ok(target)
    }

    /// Commit the outcome of the armed transfer.
    ///
    /// Returns `Ok(false)` when the transfer failed and nothing was modified.
    /// Must be called exactly once per armed refresh.
    pub fn finalize_transfer(&mut self, result: &TransferResult) -> RepoCacheResult<bool> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| RepoCacheError::NoRefreshInFlight(self.name.clone()))?;

        match plan_finalize(result) {
            FinalizePlan::Failed => {
                info!(
                    "Unable to retrieve repodata (response: {}) for {}",
                    result.http_status, self.url
                );
                pending
                    .progress
                    .fail(&format!("{} Failed", result.http_status));
                self.loaded = false;
                Ok(false)
            }
            FinalizePlan::Unhandled(status) => {
                warn!("Unhandled HTTP response code {} for {}", status, self.url);
                pending.progress.fail(&format!("{} Unhandled", status));
                self.loaded = false;
                Err(RepoCacheError::UnhandledHttpStatus {
                    url: self.url.clone(),
                    status,
                })
            }
            FinalizePlan::NotModified => {
                info!("HTTP response code: {}", result.http_status);
                if !self.finalize_not_modified(pending) {
                    return Ok(false);
                }
                self.download_complete = true;
                Ok(true)
            }
            FinalizePlan::Commit => {
                info!("HTTP response code: {}", result.http_status);
                self.download_complete = true;
                self.finalize_commit(pending, result)?;
                Ok(true)
            }
        }
    }

    /// Revalidate the cached index; `false` if there is no cache to keep
    fn finalize_not_modified(&mut self, pending: PendingRefresh) -> bool {
        let now = SystemTime::now();
        let cache_age = age(&self.json_cache, now);
        let derived_age = age(&self.derived_cache, now);

        if let Err(e) = touch(&self.json_cache) {
            warn!(
                "Not modified but could not touch {}: {}",
                self.json_cache.display(),
                e
            );
            pending.progress.fail("304 No cache");
            self.loaded = false;
            return false;
        }
        info!(
            "Solv age: {:?}, JSON age: {:?}",
            derived_age.map(|a| a.as_secs()),
            cache_age.map(|a| a.as_secs())
        );

        if derived_not_older(derived_age, cache_age) {
            if let Err(e) = touch(&self.derived_cache) {
                warn!("Could not touch {}: {}", self.derived_cache.display(), e);
            }
            self.derived_cache_valid = true;
        }

        pending.progress.finish("No change");
        self.json_cache_valid = true;
        self.loaded = true;
        true
    }

    fn finalize_commit(
        &mut self,
        pending: PendingRefresh,
        result: &TransferResult,
    ) -> RepoCacheResult<()> {
        info!("Finalized transfer: {}", self.url);
        let PendingRefresh {
            mut staging,
            progress,
        } = pending;

        let header = HeaderMetadata {
            url: self.url.clone(),
            etag: result.etag.clone(),
            last_modified: result.last_modified.clone(),
            cache_control: result.cache_control.clone(),
        };

        let cache_dir = create_cache_dir(&self.pkgs_dir).map_err(|e| {
            progress.fail("Failed");
            self.loaded = false;
            match e {
                RepoCacheError::Io { source, .. } => RepoCacheError::CacheOpen {
                    path: self.json_cache.clone(),
                    source,
                },
                other => other,
            }
        })?;

        info!("Opening: {}", self.json_cache.display());
        let mut output = tempfile::Builder::new()
            .prefix(".repocache-")
            .suffix(".json.tmp")
            .tempfile_in(&cache_dir)
            .map_err(|source| {
                progress.fail("Failed");
                self.loaded = false;
                RepoCacheError::CacheOpen {
                    path: self.json_cache.clone(),
                    source,
                }
            })?;

        if self.url.ends_with(".bz2") {
            progress.set_message("Decomp...");
            let (decompressed, next) = decompress(staging).inspect_err(|_| {
                progress.fail("Failed");
            })?;
            if !decompressed {
                warn!("Could not decompress {}, using raw bytes", self.url);
            }
            staging = next;
        }

        progress.set_message("Finalizing...");
        let spliced = staging.reopen().and_then(|source| {
            let mut writer = BufWriter::new(output.as_file_mut());
            write_spliced(&header, BufReader::new(source), &mut writer)
        });
        let copied = match spliced {
            Ok(copied) => copied,
            Err(source) => {
                progress.fail("Failed");
                self.loaded = false;
                return Err(RepoCacheError::CacheWrite {
                    path: self.json_cache.clone(),
                    source,
                });
            }
        };
        debug!("Spliced {} payload bytes into {}", copied, self.json_cache.display());

        // Temp files are created private; the cache directory is shared
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o664);
            if let Err(e) = fs::set_permissions(output.path(), perms) {
                debug!("Could not set permissions on {}: {}", output.path().display(), e);
            }
        }

        output.persist(&self.json_cache).map_err(|e| {
            progress.fail("Failed");
            RepoCacheError::CacheWrite {
                path: self.json_cache.clone(),
                source: e.error,
            }
        })?;
        drop(staging);

        if let Err(e) = touch(&self.json_cache) {
            warn!("Could not touch {}: {}", self.json_cache.display(), e);
        }

        progress.finish("Done");
        self.header = Some(header);
        self.json_cache_valid = true;
        self.derived_cache_valid = false;
        self.loaded = true;
        Ok(())
    }

    /// Path of the best validated cache artifact
    pub fn cache_path(&self) -> RepoCacheResult<&Path> {
        match (self.json_cache_valid, self.derived_cache_valid) {
            (true, true) => Ok(&self.derived_cache),
            (true, false) => Ok(&self.json_cache),
            _ => Err(RepoCacheError::CacheNotLoaded(self.name.clone())),
        }
    }

    /// Metadata for building a solver repository from [`Self::cache_path`]
    pub fn repo_metadata(
        &self,
        add_pip_as_python_dependency: bool,
    ) -> RepoCacheResult<RepoMetadata> {
        self.cache_path()?;
        let header = self.header.clone().unwrap_or_default();
        Ok(RepoMetadata {
            url: self.url.clone(),
            add_pip_as_python_dependency,
            etag: header.etag,
            last_modified: header.last_modified,
        })
    }

    /// Remove both cache artifacts; a no-op for files already gone
    pub fn clear_cache(&mut self) -> RepoCacheResult<()> {
        for path in [&self.json_cache, &self.derived_cache] {
            match fs::remove_file(path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(RepoCacheError::io(
                        format!("removing cache file {}", path.display()),
                        e,
                    ))
                }
            }
        }

        self.json_cache_valid = false;
        self.derived_cache_valid = false;
        self.loaded = false;
        Ok(())
    }
}

/// The derived cache is usable only if built from the current JSON cache
fn derived_not_older(derived_age: Option<Duration>, cache_age: Option<Duration>) -> bool {
    matches!((derived_age, cache_age), (Some(derived), Some(json)) if derived <= json)
}

/// Set the modification time of `path` to now without changing its content
fn touch(path: &Path) -> io::Result<()> {
    File::options()
        .write(true)
        .open(path)?
        .set_modified(SystemTime::now())
}
