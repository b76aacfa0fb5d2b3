use anyhow::Result;
use colored::Colorize;

use dcimsync_engine::{SeedReport, TagManager, seed_manufacturers};
use dcimsync_inventory::DynInventory;

use crate::config::AppConfig;
use crate::discovery::manufacturer_folders;
use crate::output::print_seed_report;

/// Create or tag one manufacturer per library folder name.
pub async fn seed(config: &AppConfig, client: DynInventory) -> Result<SeedReport> {
    let names = manufacturer_folders(&config.library.root);
    if names.is_empty() {
        anyhow::bail!(
            "No manufacturer folders found under {}",
            config.library.root.display()
        );
    }
    println!("{} {} manufacturer folder(s)", "Found".cyan(), names.len());

    let tags = TagManager::new(client.clone(), config.tag.clone());
    let report = seed_manufacturers(client.as_ref(), &tags, &names).await;
    print_seed_report(&report);
    Ok(report)
}
