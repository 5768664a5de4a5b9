//! Channel URLs and their platform subdirectories

use std::fmt;

/// Platform-independent subdirectory, present in every channel
pub const NOARCH: &str = "noarch";

/// Repodata file name inside a subdirectory
pub const REPODATA_FN: &str = "repodata.json";

/// A package channel such as `https://conda.anaconda.org/conda-forge`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    base_url: String,
}

impl Channel {
    pub fn new(url: &str) -> Self {
        Self {
            base_url: url.trim_end_matches('/').to_string(),
        }
    }

    /// Short name: the last path segment of the URL
    pub fn name(&self) -> &str {
        self.base_url
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or(self.base_url.as_str())
    }

    /// Display name of a subdirectory, e.g. `conda-forge/linux-64`
    pub fn subdir_name(&self, platform: &str) -> String {
        format!("{}/{}", self.name(), platform)
    }

    /// URL of a subdirectory's repodata, optionally bzip2-compressed
    pub fn repodata_url(&self, platform: &str, compressed: bool) -> String {
        let suffix = if compressed { ".bz2" } else { "" };
        format!("{}/{}/{}{}", self.base_url, platform, REPODATA_FN, suffix)
    }

    /// Subdirectories to refresh: the requested platforms, then `noarch`
    pub fn subdirs(platforms: &[String]) -> Vec<String> {
        let mut subdirs: Vec<String> = if platforms.is_empty() {
            vec![current_platform().to_string()]
        } else {
            platforms.to_vec()
        };
        subdirs.retain(|p| p != NOARCH);
        subdirs.push(NOARCH.to_string());
        subdirs
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

/// Platform subdirectory of the running system
pub fn current_platform() -> &'static str {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("linux", "x86_64") => "linux-64",
        ("linux", "aarch64") => "linux-aarch64",
        ("linux", "powerpc64") => "linux-ppc64le",
        ("macos", "x86_64") => "osx-64",
        ("macos", "aarch64") => "osx-arm64",
        ("windows", "x86_64") => "win-64",
        ("windows", "aarch64") => "win-arm64",
        _ => NOARCH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_name_and_urls() {
        let channel = Channel::new("https://conda.anaconda.org/conda-forge/");
        assert_eq!(channel.name(), "conda-forge");
        assert_eq!(channel.subdir_name("linux-64"), "conda-forge/linux-64");
        assert_eq!(
            channel.repodata_url("linux-64", false),
            "https://conda.anaconda.org/conda-forge/linux-64/repodata.json"
        );
        assert_eq!(
            channel.repodata_url("noarch", true),
            "https://conda.anaconda.org/conda-forge/noarch/repodata.json.bz2"
        );
    }

    #[test]
    fn noarch_always_last() {
        let subdirs = Channel::subdirs(&["noarch".to_string(), "osx-arm64".to_string()]);
        assert_eq!(subdirs, vec!["osx-arm64", "noarch"]);

        let defaults = Channel::subdirs(&[]);
        assert_eq!(defaults.last().map(String::as_str), Some(NOARCH));
    }

    #[test]
    fn local_channel_name() {
        let channel = Channel::new("file:///srv/channels/local");
        assert_eq!(channel.name(), "local");
    }
}
