use clap::{Parser, Subcommand};

use dcimsync_core::EntityKind;

#[derive(Parser)]
#[command(name = "dcimsync")]
#[command(about = "dcimsync: reconcile a hardware-type library into NetBox")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file (defaults to ./dcimsync.toml when present)
    #[arg(short, long, global = true, env = "DCIMSYNC_CONFIG")]
    pub config: Option<String>,

    /// Log level (overrides logging.level; RUST_LOG still wins)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover definitions and reconcile every pending one
    Sync(SyncArgs),
    /// Show ledger progress for a kind
    Status(KindArgs),
    /// List items still waiting to be processed
    Pending(PendingArgs),
    /// List failed items with their last error
    Failed(KindArgs),
    /// Delete the ledger for a kind and start over
    Reset(ResetArgs),
    /// Create and tag manufacturers named by the library folders
    Manufacturers,
}

#[derive(clap::Args)]
pub struct KindArgs {
    /// Hardware kind: device-types, module-types or rack-types
    #[arg(value_parser = parse_kind)]
    pub kind: EntityKind,
}

#[derive(clap::Args)]
pub struct SyncArgs {
    /// Hardware kind: device-types, module-types or rack-types
    #[arg(value_parser = parse_kind)]
    pub kind: EntityKind,
    /// Put failed items back in the queue before running
    #[arg(long)]
    pub retry_failed: bool,
    /// Put every finished item back in the queue before running
    #[arg(long, conflicts_with = "retry_failed")]
    pub all: bool,
    /// Stop after this many items
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(clap::Args)]
pub struct PendingArgs {
    /// Hardware kind: device-types, module-types or rack-types
    #[arg(value_parser = parse_kind)]
    pub kind: EntityKind,
    /// Show at most this many items
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(clap::Args)]
pub struct ResetArgs {
    /// Hardware kind: device-types, module-types or rack-types
    #[arg(value_parser = parse_kind)]
    pub kind: EntityKind,
    /// Confirm the reset
    #[arg(long)]
    pub yes: bool,
}

fn parse_kind(s: &str) -> Result<EntityKind, String> {
    s.parse::<EntityKind>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sync_flags() {
        let cli = Cli::parse_from(["dcimsync", "sync", "module-types", "--retry-failed", "--limit", "5"]);
        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.kind, EntityKind::ModuleType);
                assert!(args.retry_failed);
                assert!(!args.all);
                assert_eq!(args.limit, Some(5));
            }
            _ => panic!("expected sync"),
        }
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(Cli::try_parse_from(["dcimsync", "status", "cable-types"]).is_err());
    }

    #[test]
    fn retry_failed_and_all_conflict() {
        assert!(
            Cli::try_parse_from(["dcimsync", "sync", "device-types", "--retry-failed", "--all"])
                .is_err()
        );
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::parse_from(["dcimsync", "status", "rack-types", "--config", "alt.toml"]);
        assert_eq!(cli.config.as_deref(), Some("alt.toml"));
    }
}
