//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// repocache - Package Repository Index Cache
///
/// Keeps channel repodata cached on disk and refreshes it with
/// conditional requests only when it goes stale.
#[derive(Parser, Debug)]
#[command(name = "repocache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "REPOCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use cached indexes only, never download
    #[arg(long, global = true)]
    pub offline: bool,

    /// Override cache.local_repodata_ttl (1 = follow Cache-Control, 0 = always revalidate)
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub ttl: Option<i64>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load channel indexes, refreshing stale caches
    Fetch(FetchArgs),

    /// Print the cache file to use for a channel subdirectory
    Path(PathArgs),

    /// Remove cached indexes for a channel
    Clean(CleanArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Channel URL (e.g. https://conda.anaconda.org/conda-forge)
    pub channel: String,

    /// Platform subdirectories besides noarch (defaults to the current platform)
    #[arg(short, long, value_delimiter = ',')]
    pub platform: Vec<String>,

    /// Download bzip2-compressed repodata
    #[arg(long)]
    pub bz2: bool,
}

/// Arguments for the path command
#[derive(Parser, Debug)]
pub struct PathArgs {
    /// Channel URL
    pub channel: String,

    /// Platform subdirectory (defaults to the current platform)
    #[arg(short, long)]
    pub platform: Option<String>,

    /// Look up the cache of bzip2-compressed repodata
    #[arg(long)]
    pub bz2: bool,

    /// Show revalidation headers alongside the path
    #[arg(long)]
    pub info: bool,
}

/// Arguments for the clean command
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Channel URL
    pub channel: String,

    /// Platform subdirectories besides noarch (defaults to the current platform)
    #[arg(short, long, value_delimiter = ',')]
    pub platform: Vec<String>,

    /// Clean the caches of bzip2-compressed repodata
    #[arg(long)]
    pub bz2: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fetch_parses_platform_list() {
        let cli = Cli::parse_from([
            "repocache",
            "fetch",
            "https://conda.anaconda.org/conda-forge",
            "--platform",
            "linux-64,osx-arm64",
            "--offline",
        ]);
        assert!(cli.offline);
        match cli.command {
            Commands::Fetch(args) => assert_eq!(args.platform, vec!["linux-64", "osx-arm64"]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn negative_ttl_accepted() {
        let cli = Cli::parse_from(["repocache", "--ttl", "-1", "config", "show"]);
        assert_eq!(cli.ttl, Some(-1));
    }
}
