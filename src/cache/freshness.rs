//! Freshness checks for cached repository indexes
//!
//! Ages are measured from a file's modification time. A missing file, or one
//! whose timestamp cannot be read, has no age at all (`None`), which callers
//! treat as infinitely old.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::time::{Duration, SystemTime};

static MAX_AGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"max-age=(\d+)").expect("max-age pattern is a valid regex")
});

/// Age of `path` relative to `reference`.
///
/// Returns `None` if the file is missing or its modification time cannot be
/// read. A modification time later than `reference` counts as age zero.
pub fn age(path: &Path, reference: SystemTime) -> Option<Duration> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(reference.duration_since(modified).unwrap_or(Duration::ZERO))
}

/// Whether cache TTL reasoning is bypassed for `url`.
///
/// Local `file://` channels are always read directly.
pub fn is_caching_forbidden(url: &str) -> bool {
    url.starts_with("file://")
}

/// Maximum age in seconds a cached index may reach before it must be revalidated.
///
/// A `ttl` above 1 is used verbatim. A `ttl` of exactly 1 defers to the
/// `max-age` directive of the server's `Cache-Control` header. Anything else
/// means "always revalidate".
pub fn max_age_seconds(ttl: i64, cache_control: &str) -> u64 {
    match ttl {
        t if t > 1 => t as u64,
        1 => cache_control_max_age(cache_control),
        _ => 0,
    }
}

/// Extract `max-age=<digits>` from a `Cache-Control` value, 0 if absent.
fn cache_control_max_age(value: &str) -> u64 {
    MAX_AGE_RE
        .captures(value)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn max_age_uses_configured_ttl() {
        assert_eq!(max_age_seconds(5, "public, max-age=1200"), 5);
        assert_eq!(max_age_seconds(5, ""), 5);
    }

    #[test]
    fn max_age_from_cache_control() {
        assert_eq!(max_age_seconds(1, "public, max-age=1200"), 1200);
        assert_eq!(max_age_seconds(1, "max-age=30, must-revalidate"), 30);
    }

    #[test]
    fn max_age_without_directive() {
        assert_eq!(max_age_seconds(1, "no-cache"), 0);
        assert_eq!(max_age_seconds(1, ""), 0);
        // Too large for u64
        assert_eq!(max_age_seconds(1, "max-age=99999999999999999999999"), 0);
    }

    #[test]
    fn max_age_always_revalidate() {
        assert_eq!(max_age_seconds(0, "public, max-age=1200"), 0);
        assert_eq!(max_age_seconds(-3, "public, max-age=1200"), 0);
    }

    #[test]
    fn caching_forbidden_for_local_files() {
        assert!(is_caching_forbidden("file:///srv/channel/noarch/repodata.json"));
        assert!(!is_caching_forbidden(
            "https://conda.anaconda.org/conda-forge/noarch/repodata.json"
        ));
    }

    #[test]
    fn age_of_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(age(&dir.path().join("missing.json"), SystemTime::now()).is_none());
    }

    #[test]
    fn age_measured_from_mtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("repodata.json");
        fs::write(&path, "{}").unwrap();
        let modified = fs::metadata(&path).unwrap().modified().unwrap();

        let later = modified + Duration::from_secs(90);
        assert_eq!(age(&path, later), Some(Duration::from_secs(90)));

        let earlier = modified - Duration::from_secs(90);
        assert_eq!(age(&path, earlier), Some(Duration::ZERO));
    }
}
