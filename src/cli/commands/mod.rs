//! CLI command implementations

pub mod clean;
pub mod config;
pub mod fetch;
pub mod path;

pub use clean::execute as clean;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use path::execute as path;

use crate::cache::SubdirCache;
use crate::channel::{Channel, NOARCH};
use crate::ui::UiContext;
use std::path::Path;

/// Build one cache per subdirectory of `channel`, noarch last
fn channel_subdirs(
    channel: &Channel,
    platforms: &[String],
    compressed: bool,
    pkgs_dir: &Path,
    ctx: &UiContext,
) -> Vec<SubdirCache> {
    Channel::subdirs(platforms)
        .iter()
        .map(|platform| {
            SubdirCache::new(
                channel.subdir_name(platform),
                channel.repodata_url(platform, compressed),
                pkgs_dir,
                platform == NOARCH,
            )
            .with_ui(ctx)
        })
        .collect()
}
