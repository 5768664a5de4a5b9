//! repocache - Package Repository Index Cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use repocache::cli::{Cli, Commands};
use repocache::config::ConfigManager;
use repocache::error::RepoCacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> RepoCacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load().await?;

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("repocache=warn"),
        1 => EnvFilter::new("repocache=info"),
        _ => EnvFilter::new("repocache=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }

    // CLI flags win over file and environment
    if cli.offline {
        config.cache.offline = true;
    }
    if let Some(ttl) = cli.ttl {
        config.cache.local_repodata_ttl = ttl;
    }
    debug!(
        "Cache policy: ttl={} offline={}",
        config.cache.local_repodata_ttl, config.cache.offline
    );

    match cli.command {
        Commands::Fetch(args) => repocache::cli::commands::fetch(args, &config).await,
        Commands::Path(args) => repocache::cli::commands::path(args, &config).await,
        Commands::Clean(args) => repocache::cli::commands::clean(args, &config).await,
        Commands::Config(args) => {
            repocache::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
