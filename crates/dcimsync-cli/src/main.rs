use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;

use dcimsync_cli::cli::{Cli, Commands};
use dcimsync_cli::client::NetBoxClient;
use dcimsync_cli::commands;
use dcimsync_cli::config::{AppConfig, loader::load_config};
use dcimsync_cli::observability::init_tracing_with_level;
use dcimsync_cli::output::print_error;
use dcimsync_inventory::DynInventory;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn connect(config: &AppConfig) -> Result<DynInventory> {
    config.validate().map_err(|e| anyhow!("invalid configuration: {e}"))?;
    let client = NetBoxClient::from_config(&config.netbox).context("Failed to set up NetBox client")?;
    Ok(Arc::new(client))
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref()).map_err(|e| anyhow!(e))?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config
        .validate_local()
        .map_err(|e| anyhow!("invalid configuration: {e}"))?;
    init_tracing_with_level(&config.logging.level);

    match &cli.command {
        Commands::Sync(args) => {
            let client = connect(&config)?;
            commands::sync::sync(&config, client, args).await?;
        }
        Commands::Status(args) => {
            commands::ledger::status(&config, args.kind)?;
        }
        Commands::Pending(args) => {
            commands::ledger::pending(&config, args.kind, args.limit)?;
        }
        Commands::Failed(args) => {
            commands::ledger::failed(&config, args.kind)?;
        }
        Commands::Reset(args) => {
            commands::ledger::reset(&config, args.kind, args.yes)?;
        }
        Commands::Manufacturers => {
            let client = connect(&config)?;
            commands::manufacturers::seed(&config, client).await?;
        }
    }
    Ok(())
}
