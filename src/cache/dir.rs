//! Cache directory layout and file naming

use crate::error::{RepoCacheError, RepoCacheResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the index cache directory inside a package directory
pub const CACHE_SUBDIR: &str = "cache";

/// Create `<pkgs_dir>/cache`, shared between users of the package directory.
///
/// Safe to call concurrently; an existing directory is not an error and keeps
/// the mode it was given.
pub fn create_cache_dir(pkgs_dir: &Path) -> RepoCacheResult<PathBuf> {
    let cache_dir = pkgs_dir.join(CACHE_SUBDIR);
    let existed = cache_dir.is_dir();
    fs::create_dir_all(&cache_dir).map_err(|e| {
        RepoCacheError::io(format!("creating cache directory {}", cache_dir.display()), e)
    })?;

    // Group read/write plus setgid so new files inherit the group
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if !existed {
            let perms = fs::Permissions::from_mode(0o2775);
            if let Err(e) = fs::set_permissions(&cache_dir, perms) {
                // Another process may have created it first under another user
                debug!("Could not set permissions on {}: {}", cache_dir.display(), e);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = existed;

    Ok(cache_dir)
}

/// First package directory that exists (or can be created) and is writable
pub fn first_writable_pkgs_dir(pkgs_dirs: &[PathBuf]) -> RepoCacheResult<PathBuf> {
    for dir in pkgs_dirs {
        if fs::create_dir_all(dir).is_err() {
            debug!("Skipping package directory {}: cannot create", dir.display());
            continue;
        }
        let writable = fs::metadata(dir)
            .map(|m| !m.permissions().readonly())
            .unwrap_or(false)
            && tempfile::tempfile_in(dir).is_ok();
        if writable {
            return Ok(dir.clone());
        }
        debug!("Skipping package directory {}: not writable", dir.display());
    }

    let tried: Vec<String> = pkgs_dirs.iter().map(|d| d.display().to_string()).collect();
    Err(RepoCacheError::NoWritablePkgsDir(tried.join(", ")))
}

/// Stable cache file stem for a repodata URL (first 8 hex chars of SHA-256)
pub fn cache_name_from_url(url: &str) -> String {
    let mut normalized = url.to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..4])
}

/// JSON cache file name for a repodata URL
pub fn cache_fn_url(url: &str) -> String {
    format!("{}.json", cache_name_from_url(url))
}

/// Derived `.solv` path: the last four characters (`json`) replaced by `solv`
pub fn derived_cache_name(json_cache: &Path) -> PathBuf {
    let name = json_cache.to_string_lossy();
    let stem_len = name
        .char_indices()
        .rev()
        .nth(3)
        .map(|(i, _)| i)
        .unwrap_or(0);
    PathBuf::from(format!("{}solv", &name[..stem_len]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn cache_dir_created_idempotently() {
        let temp = TempDir::new().unwrap();
        let first = create_cache_dir(temp.path()).unwrap();
        let second = create_cache_dir(temp.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, temp.path().join("cache"));
        assert!(first.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn cache_dir_is_group_writable() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let dir = create_cache_dir(temp.path()).unwrap();
        let mode = fs::metadata(dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o070, 0o070);
    }

    #[cfg(unix)]
    #[test]
    fn existing_cache_dir_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(CACHE_SUBDIR);
        fs::create_dir(&dir).unwrap();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o750)).unwrap();

        create_cache_dir(temp.path()).unwrap();

        let mode = fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o7777, 0o750);
    }

    #[test]
    fn first_writable_skips_unusable() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("not-a-dir");
        fs::write(&file, "").unwrap();
        let good = temp.path().join("pkgs");

        let chosen = first_writable_pkgs_dir(&[file, good.clone()]).unwrap();
        assert_eq!(chosen, good);
    }

    #[test]
    fn first_writable_none() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("not-a-dir");
        fs::write(&file, "").unwrap();

        let err = first_writable_pkgs_dir(&[file]).unwrap_err();
        assert!(matches!(err, RepoCacheError::NoWritablePkgsDir(_)));
    }

    #[test]
    fn cache_name_stable() {
        let a = cache_name_from_url("https://conda.anaconda.org/conda-forge/linux-64");
        let b = cache_name_from_url("https://conda.anaconda.org/conda-forge/linux-64/");
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert_ne!(a, cache_name_from_url("https://conda.anaconda.org/conda-forge/noarch"));
        assert_eq!(cache_fn_url("https://x.org/c/noarch"), format!("{}.json", cache_name_from_url("https://x.org/c/noarch")));
    }

    #[test]
    fn derived_name_replaces_extension() {
        assert_eq!(
            derived_cache_name(Path::new("/pkgs/cache/497deca9.json")),
            PathBuf::from("/pkgs/cache/497deca9.solv")
        );
    }
}
