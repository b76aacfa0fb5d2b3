use anyhow::{Context, Result};

use dcimsync_core::EntityKind;
use dcimsync_engine::ProgressLedger;

use crate::config::AppConfig;
use crate::output::{print_items, print_success, print_summary};

fn open(config: &AppConfig, kind: EntityKind) -> ProgressLedger {
    ProgressLedger::load_or_init(config.ledger_path(kind), kind)
}

pub fn status(config: &AppConfig, kind: EntityKind) -> Result<()> {
    let ledger = open(config, kind);
    if ledger.is_empty() {
        println!("No ledger yet for {kind}. Run: dcimsync sync {kind}");
        return Ok(());
    }
    print_summary(kind, &ledger.summary());
    Ok(())
}

pub fn pending(config: &AppConfig, kind: EntityKind, limit: usize) -> Result<()> {
    let ledger = open(config, kind);
    print_items(&ledger.pending_items(), Some(limit), false);
    Ok(())
}

pub fn failed(config: &AppConfig, kind: EntityKind) -> Result<()> {
    let ledger = open(config, kind);
    print_items(&ledger.failed_items(), None, true);
    Ok(())
}

pub fn reset(config: &AppConfig, kind: EntityKind, confirmed: bool) -> Result<()> {
    if !confirmed {
        anyhow::bail!("Refusing to reset the {kind} ledger without --yes");
    }
    let mut ledger = open(config, kind);
    ledger
        .reset()
        .with_context(|| format!("Failed to reset {}", ledger.path().display()))?;
    print_success(&format!("Reset ledger for {kind}"));
    Ok(())
}
