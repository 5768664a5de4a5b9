//! Path command - print the cache file for one subdirectory

use crate::cache::{
    first_writable_pkgs_dir, read_header, LoadOutcome, RepoMetadata, SubdirCache,
};
use crate::channel::{current_platform, Channel, NOARCH};
use crate::cli::args::PathArgs;
use crate::config::Config;
use crate::error::{RepoCacheError, RepoCacheResult};
use crate::ui::{self, UiContext};
use chrono::{DateTime, Local};
use std::fs;
use std::time::SystemTime;

/// Execute the path command
///
/// Never downloads: the cache is loaded as if offline.
pub async fn execute(args: PathArgs, config: &Config) -> RepoCacheResult<()> {
    let pkgs_dir = first_writable_pkgs_dir(&config.cache.pkgs_dirs)?;
    let channel = Channel::new(&args.channel);
    let platform = args
        .platform
        .unwrap_or_else(|| current_platform().to_string());

    let mut subdir = SubdirCache::new(
        channel.subdir_name(&platform),
        channel.repodata_url(&platform, args.bz2),
        &pkgs_dir,
        platform == NOARCH,
    );

    let mut offline = config.cache.clone();
    offline.offline = true;
    let pip = config.cache.add_pip_as_python_dependency;
    let (path, meta, cache_control) = match subdir.load(&offline, SystemTime::now())? {
        LoadOutcome::Accepted => (
            subdir.cache_path()?.to_path_buf(),
            subdir.repo_metadata(pip)?,
            subdir.header().map(|h| h.cache_control.clone()),
        ),
        // Local channels always refresh, but an earlier fetch may have left a copy
        LoadOutcome::RefreshArmed(_) => match read_header(subdir.json_cache_path()) {
            Some(header) => (
                subdir.json_cache_path().to_path_buf(),
                RepoMetadata {
                    url: subdir.url().to_string(),
                    add_pip_as_python_dependency: pip,
                    etag: header.etag,
                    last_modified: header.last_modified,
                },
                Some(header.cache_control),
            ),
            None => return Err(RepoCacheError::CacheNotLoaded(subdir.name().to_string())),
        },
        LoadOutcome::Unavailable => {
            return Err(RepoCacheError::CacheNotLoaded(subdir.name().to_string()));
        }
    };

    if !args.info {
        println!("{}", path.display());
        return Ok(());
    }

    let ctx = UiContext::detect();
    ui::key_value(&ctx, "path", &path.display().to_string());
    ui::key_value(&ctx, "url", &meta.url);
    ui::key_value(&ctx, "etag", &meta.etag);
    ui::key_value(&ctx, "last modified", &meta.last_modified);
    if let Some(cache_control) = cache_control {
        ui::key_value(&ctx, "cache control", &cache_control);
    }
    if let Ok(modified) = fs::metadata(subdir.json_cache_path()).and_then(|m| m.modified()) {
        let checked: DateTime<Local> = modified.into();
        ui::key_value(
            &ctx,
            "last checked",
            &checked.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
    }

    Ok(())
}
