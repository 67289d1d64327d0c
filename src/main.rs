//! rr-cache - Verified cache of RetroRules and MetaNetX derived tables
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use rr_cache::cli::{commands, Cli, Commands};
use rr_cache::config::{Config, ConfigManager};
use rr_cache::error::CacheResult;
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

async fn run() -> CacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let mut config = config_manager.load().await?;
    if let Some(dir) = cli.cache_dir.clone() {
        config.cache.dir = Some(dir);
    }

    init_logging(cli.verbose, &config);
    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Load(args) => commands::load(args, &config).await,
        Commands::Plan(args) => commands::plan(args, &config).await,
        Commands::Get(args) => commands::get(args, &config).await,
        Commands::List(args) => commands::list(args, &config).await,
        Commands::Generate(args) => commands::generate(args, &config).await,
        Commands::Verify => commands::verify(&config).await,
        Commands::Registry(args) => commands::registry(args, &config).await,
        Commands::Config(args) => commands::config(args, &config, &config_manager).await,
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug; logs go to stderr
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("rr_cache=warn"),
        1 => EnvFilter::new("rr_cache=info"),
        _ => EnvFilter::new("rr_cache=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
