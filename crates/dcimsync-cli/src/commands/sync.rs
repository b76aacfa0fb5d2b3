use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use dcimsync_engine::{BatchRunner, ErrorLog, ProgressLedger, RunReport};
use dcimsync_inventory::DynInventory;

use crate::cli::SyncArgs;
use crate::config::AppConfig;
use crate::discovery::discover;
use crate::loader::YamlLoader;
use crate::output::{print_run_report, print_summary};

/// Discover, register, requeue on request, then reconcile pending items.
pub async fn sync(config: &AppConfig, client: DynInventory, args: &SyncArgs) -> Result<RunReport> {
    let kind = args.kind;
    let dir = config.library_dir(kind);
    let discovered = discover(&dir, kind, &YamlLoader)
        .with_context(|| format!("Discovery failed for {kind}"))?;

    let mut ledger = ProgressLedger::load_or_init(config.ledger_path(kind), kind);
    let added = ledger.register_discovered(discovered);
    if added > 0 {
        println!("{} {added} new definition(s)", "Registered".cyan());
    }

    let requeued = if args.all {
        ledger.requeue_all()
    } else if args.retry_failed {
        ledger.requeue_failed()
    } else {
        0
    };
    if requeued > 0 {
        println!("{} {requeued} item(s)", "Requeued".cyan());
    }

    let runner = BatchRunner::new(
        client,
        kind,
        config.tag.clone(),
        ErrorLog::new(config.logs_dir(kind)),
        YamlLoader,
    );
    info!(kind = %kind, ledger = %ledger.path().display(), "Syncing");
    let report = runner.run_limited(&mut ledger, args.limit).await;

    print_run_report(kind, &report);
    print_summary(kind, &ledger.summary());
    if report.files_failed > 0 {
        println!(
            "Per-item errors are logged under {}",
            config.logs_dir(kind).display()
        );
    }
    Ok(report)
}
