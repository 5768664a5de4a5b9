//! Clean command - remove cached indexes for a channel

use super::channel_subdirs;
use crate::cache::first_writable_pkgs_dir;
use crate::channel::Channel;
use crate::cli::args::CleanArgs;
use crate::config::Config;
use crate::error::RepoCacheResult;
use crate::ui::{self, UiContext};

/// Execute the clean command
pub async fn execute(args: CleanArgs, config: &Config) -> RepoCacheResult<()> {
    let ctx = UiContext::detect();
    let pkgs_dir = first_writable_pkgs_dir(&config.cache.pkgs_dirs)?;
    let channel = Channel::new(&args.channel);

    for mut subdir in channel_subdirs(&channel, &args.platform, args.bz2, &pkgs_dir, &ctx) {
        subdir.clear_cache()?;
        ui::step_ok(&ctx, &format!("Cleared {}", subdir.name()));
    }

    Ok(())
}
