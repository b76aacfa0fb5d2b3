use colored::Colorize;
use tabled::builder::Builder;
use tabled::settings::Style;

use dcimsync_core::EntityKind;
use dcimsync_engine::{CatalogItem, LedgerSummary, RunReport, SeedReport};

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", "!".yellow(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_summary(kind: EntityKind, summary: &LedgerSummary) {
    println!("{} {}", "Ledger:".cyan(), kind.as_str().cyan());
    let mut builder = Builder::default();
    builder.push_record(["Total", "Created", "Failed", "Skipped", "Pending", "Progress"]);
    builder.push_record([
        summary.total.to_string(),
        summary.created.to_string(),
        summary.failed.to_string(),
        summary.skipped.to_string(),
        summary.pending.to_string(),
        format!("{:.1}%", summary.progress_percent),
    ]);
    println!("{}", builder.build().with(Style::rounded()));
    println!("Last updated: {}", summary.last_updated);
}

/// Table of ledger items; `limit` caps the rows and reports the remainder.
pub fn print_items(items: &[(String, CatalogItem)], limit: Option<usize>, with_error: bool) {
    if items.is_empty() {
        println!("No items.");
        return;
    }
    let shown = limit.unwrap_or(items.len()).min(items.len());

    let mut builder = Builder::default();
    let mut header = vec!["Path", "Manufacturer", "Model"];
    if with_error {
        header.push("Error");
    }
    builder.push_record(header);
    for (path, item) in &items[..shown] {
        let mut row = vec![
            path.clone(),
            item.manufacturer.clone().unwrap_or_else(|| "-".into()),
            item.model.clone().unwrap_or_else(|| "-".into()),
        ];
        if with_error {
            row.push(item.error_message.clone().unwrap_or_else(|| "-".into()));
        }
        builder.push_record(row);
    }
    println!("{}", builder.build().with(Style::rounded()));
    if shown < items.len() {
        println!("... and {} more", items.len() - shown);
    }
    println!("Total: {}", items.len());
}

pub fn print_run_report(kind: EntityKind, report: &RunReport) {
    let mut builder = Builder::default();
    builder.push_record(["", "Created", "Updated", "Unchanged", "Failed", "Skipped"]);
    builder.push_record([
        "Files".to_string(),
        report.files_created.to_string(),
        "-".to_string(),
        "-".to_string(),
        report.files_failed.to_string(),
        report.files_skipped.to_string(),
    ]);
    builder.push_record([
        kind.label().to_string(),
        report.entities_created.to_string(),
        report.entities_updated.to_string(),
        report.entities_unchanged.to_string(),
        "-".to_string(),
        "-".to_string(),
    ]);
    builder.push_record([
        "Components".to_string(),
        report.components_created.to_string(),
        report.components_updated.to_string(),
        report.components_unchanged.to_string(),
        report.components_failed.to_string(),
        "-".to_string(),
    ]);
    println!("{}", builder.build().with(Style::rounded()));
    println!("Tagged: {}", report.tagged);

    let line = format!(
        "Processed {} file(s): {} ok, {} failed, {} skipped",
        report.files_processed(),
        report.files_created,
        report.files_failed,
        report.files_skipped
    );
    if report.files_failed > 0 {
        print_warning(&line);
    } else {
        print_success(&line);
    }
}

pub fn print_seed_report(report: &SeedReport) {
    for name in &report.created {
        println!("  {} {name}", "created".green());
    }
    for name in &report.tagged {
        println!("  {} {name}", "tagged".cyan());
    }
    for (name, error) in &report.failed {
        println!("  {} {name}: {error}", "failed".red());
    }
    println!(
        "Created {}, tagged {}, unchanged {}, failed {}",
        report.created.len(),
        report.tagged.len(),
        report.unchanged.len(),
        report.failed.len()
    );
}
