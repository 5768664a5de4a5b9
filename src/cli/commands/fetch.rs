//! Fetch command - load channel indexes, refreshing stale caches

use super::channel_subdirs;
use crate::cache::{first_writable_pkgs_dir, LoadOutcome};
use crate::channel::Channel;
use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::RepoCacheResult;
use crate::transfer::{download_all, HttpTransport};
use crate::ui::{self, UiContext};
use std::time::SystemTime;
use tracing::debug;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> RepoCacheResult<()> {
    let ctx = UiContext::detect();
    let pkgs_dir = first_writable_pkgs_dir(&config.cache.pkgs_dirs)?;
    debug!("Using package directory {}", pkgs_dir.display());

    let channel = Channel::new(&args.channel);
    let mut subdirs = channel_subdirs(&channel, &args.platform, args.bz2, &pkgs_dir, &ctx);

    let now = SystemTime::now();
    let mut jobs = Vec::new();
    for subdir in subdirs.iter_mut() {
        match subdir.load(&config.cache, now)? {
            LoadOutcome::Accepted => {}
            LoadOutcome::RefreshArmed(target) => jobs.push((subdir, target)),
            LoadOutcome::Unavailable => ui::step_warn_hint(
                &ctx,
                &format!("{} unavailable", subdir.name()),
                "offline and no cached index",
            ),
        }
    }

    if !jobs.is_empty() {
        let transport = HttpTransport::new(&config.network);
        download_all(&transport, jobs).await?;
    }

    ui::section(&ctx, &format!("Channel {}", channel));
    for subdir in &subdirs {
        match subdir.cache_path() {
            Ok(path) => ui::key_value(&ctx, subdir.name(), &path.display().to_string()),
            Err(_) => ui::key_value(&ctx, subdir.name(), "not loaded"),
        }
    }

    Ok(())
}
