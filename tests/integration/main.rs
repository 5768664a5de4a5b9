//! Integration tests for repocache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Command isolated from the user's config and environment
    fn repocache(config: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("repocache");
        cmd.env_remove("REPOCACHE_OFFLINE")
            .env_remove("REPOCACHE_TTL")
            .env("REPOCACHE_CONFIG", config);
        cmd
    }

    /// Temp dir with a config pointing the package directory inside it
    fn workspace() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        fs::write(
            &config,
            format!(
                "[cache]\npkgs_dirs = [{:?}]\n",
                temp.path().join("pkgs").display().to_string()
            ),
        )
        .unwrap();
        (temp, config)
    }

    /// Local channel with linux-64 and noarch subdirectories
    fn local_channel(root: &Path) -> String {
        for platform in ["linux-64", "noarch"] {
            let dir = root.join("channel").join(platform);
            fs::create_dir_all(&dir).unwrap();
            fs::write(
                dir.join("repodata.json"),
                format!(r#"{{"info":{{"subdir":"{}"}},"packages":{{}}}}"#, platform),
            )
            .unwrap();
        }
        format!("file://{}", root.join("channel").display())
    }

    fn cached_indexes(root: &Path) -> Vec<PathBuf> {
        match fs::read_dir(root.join("pkgs").join("cache")) {
            Ok(entries) => entries
                .map(|e| e.unwrap().path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn help_displays() {
        let (_temp, config) = workspace();
        repocache(&config)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Package Repository Index Cache"));
    }

    #[test]
    fn version_displays() {
        let (_temp, config) = workspace();
        repocache(&config)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("repocache"));
    }

    #[test]
    fn config_path() {
        let (_temp, config) = workspace();
        repocache(&config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let (_temp, config) = workspace();
        repocache(&config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"));
    }

    #[test]
    fn path_without_cache_fails() {
        let (_temp, config) = workspace();
        repocache(&config)
            .args(["path", "https://conda.example.org/forge", "--platform", "linux-64"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cache not loaded"));
    }

    #[test]
    fn fetch_local_channel() {
        let (temp, config) = workspace();
        let channel = local_channel(temp.path());

        repocache(&config)
            .args(["fetch", &channel, "--platform", "linux-64"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Done"));

        let indexes = cached_indexes(temp.path());
        assert_eq!(indexes.len(), 2);
        for index in indexes {
            let content = fs::read_to_string(index).unwrap();
            assert!(content.starts_with(r#"{"_url":"file://"#));
            let value: serde_json::Value = serde_json::from_str(&content).unwrap();
            assert!(value["packages"].is_object());
        }
    }

    #[test]
    fn path_reports_fetched_local_channel() {
        let (temp, config) = workspace();
        let channel = local_channel(temp.path());

        repocache(&config)
            .args(["fetch", &channel, "--platform", "linux-64"])
            .assert()
            .success();

        repocache(&config)
            .args(["path", &channel, "--platform", "linux-64"])
            .assert()
            .success()
            .stdout(predicate::str::contains(".json"));
    }

    #[test]
    fn fetch_offline_without_cache_skips_remote() {
        let (temp, config) = workspace();
        repocache(&config)
            .args([
                "--offline",
                "fetch",
                "https://conda.example.org/forge",
                "--platform",
                "linux-64",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("unavailable"));

        assert!(cached_indexes(temp.path()).is_empty());
    }

    #[test]
    fn fetch_missing_local_noarch_fails() {
        let (temp, config) = workspace();
        let channel = format!("file://{}", temp.path().join("nowhere").display());

        repocache(&config)
            .args(["fetch", &channel, "--platform", "linux-64"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unable to retrieve repodata"));
    }

    #[test]
    fn clean_removes_cached_indexes() {
        let (temp, config) = workspace();
        let channel = local_channel(temp.path());

        repocache(&config)
            .args(["fetch", &channel, "--platform", "linux-64"])
            .assert()
            .success();
        assert_eq!(cached_indexes(temp.path()).len(), 2);

        repocache(&config)
            .args(["clean", &channel, "--platform", "linux-64"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cleared"));
        assert!(cached_indexes(temp.path()).is_empty());
    }
}
