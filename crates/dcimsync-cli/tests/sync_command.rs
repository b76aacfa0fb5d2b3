use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use dcimsync_cli::cli::SyncArgs;
use dcimsync_cli::commands;
use dcimsync_cli::config::AppConfig;
use dcimsync_core::{ComponentKind, EntityKind};
use dcimsync_engine::{ItemStatus, ProgressLedger};
use dcimsync_inventory::Endpoint;
use dcimsync_inventory_memory::InMemoryInventory;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

fn config(root: &Path) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.netbox.url = "https://netbox.example.net".into();
    cfg.netbox.token = "0123456789abcdef".into();
    cfg.library.root = root.join("library");
    cfg.state.dir = root.join("state");
    cfg
}

fn args(kind: EntityKind) -> SyncArgs {
    SyncArgs {
        kind,
        retry_failed: false,
        all: false,
        limit: None,
    }
}

#[tokio::test]
async fn sync_reconciles_library_and_records_ledger() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let cfg = config(dir.path());
    let types = cfg.library_dir(EntityKind::DeviceType);
    write(
        &types.join("Cisco/c9300-48p.yaml"),
        r#"
manufacturer: Cisco
model: C9300-48P
u_height: 1
is_full_depth: "true"
interfaces:
  - name: GigabitEthernet1/0/1
    type: 1000base-t
  - name: GigabitEthernet1/0/2
    type: 1000base-t
power-ports:
  - name: PS-A
    type: iec-60320-c14
"#,
    );
    write(&types.join("Cisco/empty.yaml"), "");
    write(
        &types.join("Acme/widget.yaml"),
        "manufacturer: Acme\nmodel: Widget\n",
    );

    let inventory = Arc::new(InMemoryInventory::new());
    inventory
        .seed(
            Endpoint::Manufacturers,
            json!({"id": 1, "name": "Cisco", "slug": "cisco"}),
        )
        .await;

    let report = commands::sync::sync(&cfg, inventory.clone(), &args(EntityKind::DeviceType))
        .await
        .expect("sync");
    assert_eq!(report.files_created, 1);
    assert_eq!(report.files_failed, 1);
    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.components_created, 3);
    assert_eq!(
        inventory
            .count(Endpoint::Component(ComponentKind::Interfaces))
            .await,
        2
    );

    let ledger = ProgressLedger::load_or_init(cfg.ledger_path(EntityKind::DeviceType), EntityKind::DeviceType);
    let created = ledger.item("Cisco/c9300-48p.yaml").expect("tracked");
    assert_eq!(created.status, ItemStatus::Created);
    assert_eq!(created.slug.as_deref(), Some("cisco-c9300-48p"));
    assert!(created.remote_id.is_some());
    assert_eq!(
        ledger.item("Cisco/empty.yaml").expect("tracked").status,
        ItemStatus::Skipped
    );
    assert_eq!(
        ledger.item("Acme/widget.yaml").expect("tracked").status,
        ItemStatus::Failed
    );
    assert!(cfg.logs_dir(EntityKind::DeviceType).join("Acme_widget.yaml.log").exists());

    let device_type = inventory
        .records(Endpoint::Entity(EntityKind::DeviceType))
        .await
        .pop()
        .expect("device type");
    assert_eq!(device_type.field("is_full_depth"), Some(&json!(true)));
}

#[tokio::test]
async fn retry_failed_requeues_only_failed_items() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let cfg = config(dir.path());
    let types = cfg.library_dir(EntityKind::ModuleType);
    write(&types.join("Acme/a.yaml"), "manufacturer: Acme\nmodel: A\n");
    write(&types.join("Cisco/b.yaml"), "manufacturer: Cisco\nmodel: B\n");

    let inventory = Arc::new(InMemoryInventory::new());
    inventory
        .seed(
            Endpoint::Manufacturers,
            json!({"id": 1, "name": "Cisco", "slug": "cisco"}),
        )
        .await;

    let first = commands::sync::sync(&cfg, inventory.clone(), &args(EntityKind::ModuleType))
        .await
        .expect("first sync");
    assert_eq!(first.files_created, 1);
    assert_eq!(first.files_failed, 1);

    // Without requeueing, nothing is left to do.
    let idle = commands::sync::sync(&cfg, inventory.clone(), &args(EntityKind::ModuleType))
        .await
        .expect("idle sync");
    assert_eq!(idle.files_processed(), 0);

    inventory
        .seed(Endpoint::Manufacturers, json!({"name": "Acme", "slug": "acme"}))
        .await;

    let mut retry = args(EntityKind::ModuleType);
    retry.retry_failed = true;
    let second = commands::sync::sync(&cfg, inventory.clone(), &retry)
        .await
        .expect("retry sync");
    assert_eq!(second.files_created, 1);
    assert_eq!(second.files_processed(), 1);
    assert_eq!(
        inventory
            .count(Endpoint::Entity(EntityKind::ModuleType))
            .await,
        2
    );
}

#[tokio::test]
async fn missing_library_directory_leaves_no_ledger() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let cfg = config(dir.path());
    let inventory = Arc::new(InMemoryInventory::new());

    let result = commands::sync::sync(&cfg, inventory, &args(EntityKind::RackType)).await;
    assert!(result.is_err());
    assert!(!cfg.ledger_path(EntityKind::RackType).exists());
}

#[tokio::test]
async fn manufacturers_seeded_from_folders() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let cfg = config(dir.path());
    write(&cfg.library_dir(EntityKind::DeviceType).join("Cisco/a.yaml"), "model: A");
    write(&cfg.library_dir(EntityKind::ModuleType).join("Juniper/b.yaml"), "model: B");

    let inventory = Arc::new(InMemoryInventory::new());
    inventory
        .seed(
            Endpoint::Manufacturers,
            json!({"id": 1, "name": "Cisco", "slug": "cisco"}),
        )
        .await;

    let report = commands::manufacturers::seed(&cfg, inventory.clone())
        .await
        .expect("seed");
    assert_eq!(report.created, vec!["Juniper".to_string()]);
    assert_eq!(report.tagged, vec!["Cisco".to_string()]);
    assert_eq!(inventory.count(Endpoint::Manufacturers).await, 2);
}

#[test]
fn reset_requires_confirmation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let cfg = config(dir.path());
    let path = cfg.ledger_path(EntityKind::DeviceType);
    write(&path, "{}");

    assert!(commands::ledger::reset(&cfg, EntityKind::DeviceType, false).is_err());
    assert!(path.exists());
    commands::ledger::reset(&cfg, EntityKind::DeviceType, true).expect("reset");
    assert!(!path.exists());
}
