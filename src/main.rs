//! Containme - container-based build orchestrator
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use containme::cli::commands::{self, BuildPaths};
use containme::cli::{Cli, Commands};
use containme::config::{Config, ConfigManager};
use containme::error::ContainmeResult;
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

async fn run() -> ContainmeResult<()> {
    let cli = Cli::parse();

    // Load configuration first so it can pick the log format
    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!("Using config {}", config_manager.path().display());

    match cli.command {
        Commands::Version => commands::version(&config).await,
        Commands::Config(args) => commands::config(args, &config_manager, &config).await,
        Commands::Run(args) => {
            let paths = BuildPaths::resolve(cli.file.as_deref(), cli.workdir.as_deref(), &config)?;
            commands::run(args, &paths, &config).await
        }
        Commands::Exec(args) => {
            let paths = BuildPaths::resolve(cli.file.as_deref(), cli.workdir.as_deref(), &config)?;
            commands::exec(args, &paths, &config).await
        }
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("containme=warn"),
        1 => EnvFilter::new("containme=info"),
        _ => EnvFilter::new("containme=debug"),
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
