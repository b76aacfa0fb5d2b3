//! Durable per-item progress for one entity kind.
//!
//! The ledger is a JSON document keyed by each definition's path relative to
//! the kind's library directory. Every terminal transition is persisted
//! immediately, so an interrupted run resumes with exactly the unfinished
//! items still pending.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use dcimsync_core::{DefinitionMeta, EntityKind, timestamp};

use crate::error::LedgerError;

/// Key the items map is stored under when written generically.
const ITEMS_KEY: &str = "items";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Created,
    Failed,
    Skipped,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Created => "created",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked definition document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub full_path: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    pub status: ItemStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default, alias = "netbox_id")]
    pub remote_id: Option<u64>,
}

impl CatalogItem {
    fn pending(full_path: String, meta: DefinitionMeta) -> Self {
        Self {
            full_path,
            manufacturer: meta.manufacturer,
            model: meta.model,
            slug: meta.slug,
            status: ItemStatus::Pending,
            created_at: None,
            error_message: None,
            remote_id: None,
        }
    }
}

/// A definition file found by discovery, with metadata read by the caller.
#[derive(Debug, Clone)]
pub struct DiscoveredItem {
    pub relative_path: String,
    pub full_path: PathBuf,
    pub meta: DefinitionMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerState {
    created_at: String,
    last_updated: String,
    #[serde(default)]
    total_files: usize,
    #[serde(default)]
    processed_count: usize,
    #[serde(default)]
    failed_count: usize,
    #[serde(default)]
    items: BTreeMap<String, CatalogItem>,
}

impl LedgerState {
    fn fresh() -> Self {
        let now = timestamp();
        Self {
            created_at: now.clone(),
            last_updated: now,
            total_files: 0,
            processed_count: 0,
            failed_count: 0,
            items: BTreeMap::new(),
        }
    }
}

/// Aggregate view used by the status command.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSummary {
    pub total: usize,
    pub created: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pending: usize,
    pub progress_percent: f64,
    pub last_updated: String,
}

#[derive(Debug)]
pub struct ProgressLedger {
    path: PathBuf,
    kind: EntityKind,
    state: LedgerState,
}

impl ProgressLedger {
    /// Load the ledger at `path`, or start an empty one when the file is
    /// missing, unreadable or malformed.
    pub fn load_or_init(path: impl Into<PathBuf>, kind: EntityKind) -> Self {
        let path = path.into();
        let state = if path.exists() {
            match read_state(&path, kind) {
                Ok(state) => state,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable ledger, starting fresh");
                    LedgerState::fresh()
                }
            }
        } else {
            LedgerState::fresh()
        };
        Self { path, kind, state }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.state.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.items.is_empty()
    }

    pub fn total_files(&self) -> usize {
        self.state.total_files
    }

    pub fn item(&self, relative_path: &str) -> Option<&CatalogItem> {
        self.state.items.get(relative_path)
    }

    /// Track newly discovered paths as pending; known paths keep their state.
    /// Returns how many paths were new.
    pub fn register_discovered(&mut self, items: Vec<DiscoveredItem>) -> usize {
        self.state.total_files = items.len();
        let mut added = 0;
        for item in items {
            if self.state.items.contains_key(&item.relative_path) {
                continue;
            }
            let full_path = item.full_path.to_string_lossy().into_owned();
            self.state.items.insert(
                item.relative_path,
                CatalogItem::pending(full_path, item.meta),
            );
            added += 1;
        }
        self.recompute_counts();
        self.persist();
        info!(kind = %self.kind, added, total = self.state.total_files, "Registered discovered definitions");
        added
    }

    pub fn mark_created(&mut self, relative_path: &str, remote_id: Option<u64>) {
        let now = timestamp();
        self.transition(relative_path, |item| {
            item.status = ItemStatus::Created;
            item.created_at = Some(now);
            item.error_message = None;
            if remote_id.is_some() {
                item.remote_id = remote_id;
            }
        });
    }

    pub fn mark_failed(&mut self, relative_path: &str, message: impl Into<String>) {
        let message = message.into();
        self.transition(relative_path, |item| {
            item.status = ItemStatus::Failed;
            item.error_message = Some(message);
        });
    }

    pub fn mark_skipped(&mut self, relative_path: &str, reason: impl Into<String>) {
        let reason = reason.into();
        self.transition(relative_path, |item| {
            item.status = ItemStatus::Skipped;
            item.error_message = Some(reason);
        });
    }

    fn transition(&mut self, relative_path: &str, apply: impl FnOnce(&mut CatalogItem)) {
        let Some(item) = self.state.items.get_mut(relative_path) else {
            debug!(path = relative_path, "Ignoring transition for untracked path");
            return;
        };
        apply(item);
        self.recompute_counts();
        self.persist();
    }

    /// Items still pending, ordered by relative path.
    pub fn pending_items(&self) -> Vec<(String, CatalogItem)> {
        self.items_with(ItemStatus::Pending)
    }

    pub fn failed_items(&self) -> Vec<(String, CatalogItem)> {
        self.items_with(ItemStatus::Failed)
    }

    fn items_with(&self, status: ItemStatus) -> Vec<(String, CatalogItem)> {
        self.state
            .items
            .iter()
            .filter(|(_, item)| item.status == status)
            .map(|(path, item)| (path.clone(), item.clone()))
            .collect()
    }

    fn count(&self, status: ItemStatus) -> usize {
        self.state
            .items
            .values()
            .filter(|item| item.status == status)
            .count()
    }

    /// Counts cover every tracked item, including ones no longer found on
    /// disk, so `total` is the tracked count rather than the latest scan.
    pub fn summary(&self) -> LedgerSummary {
        let total = self.state.items.len();
        let created = self.count(ItemStatus::Created);
        let failed = self.count(ItemStatus::Failed);
        let skipped = self.count(ItemStatus::Skipped);
        let pending = self.count(ItemStatus::Pending);
        let progress_percent = if total == 0 {
            0.0
        } else {
            (created + failed + skipped) as f64 / total as f64 * 100.0
        };
        LedgerSummary {
            total,
            created,
            failed,
            skipped,
            pending,
            progress_percent,
            last_updated: self.state.last_updated.clone(),
        }
    }

    /// Put failed items back to pending. Returns how many were requeued.
    pub fn requeue_failed(&mut self) -> usize {
        self.requeue(|status| status == ItemStatus::Failed)
    }

    /// Put every finished item back to pending.
    pub fn requeue_all(&mut self) -> usize {
        self.requeue(|status| status != ItemStatus::Pending)
    }

    fn requeue(&mut self, select: impl Fn(ItemStatus) -> bool) -> usize {
        let mut requeued = 0;
        for item in self.state.items.values_mut() {
            if select(item.status) {
                item.status = ItemStatus::Pending;
                requeued += 1;
            }
        }
        if requeued > 0 {
            self.recompute_counts();
            self.persist();
        }
        requeued
    }

    /// Delete the persisted ledger and start over with an empty one.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Write` if the file exists and cannot be removed.
    pub fn reset(&mut self) -> Result<(), LedgerError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|source| LedgerError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        self.state = LedgerState::fresh();
        info!(kind = %self.kind, path = %self.path.display(), "Ledger reset");
        Ok(())
    }

    fn recompute_counts(&mut self) {
        self.state.processed_count = self.count(ItemStatus::Created);
        self.state.failed_count = self.count(ItemStatus::Failed);
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            warn!(path = %self.path.display(), error = %e, "Failed to persist ledger");
        }
    }

    /// Write the ledger through a sibling temp file renamed over the target.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if serialization or any file operation fails.
    pub fn save(&mut self) -> Result<(), LedgerError> {
        self.state.last_updated = timestamp();
        let document = to_document(&self.state, self.kind)?;
        let rendered = serde_json::to_string_pretty(&document)?;

        let write_err = |source| LedgerError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp = temp_path(&self.path);
        fs::write(&tmp, rendered).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn read_state(path: &Path, kind: EntityKind) -> Result<LedgerState, LedgerError> {
    let raw = fs::read_to_string(path).map_err(|source| LedgerError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut document: Value = serde_json::from_str(&raw)?;
    if let Value::Object(map) = &mut document {
        if let Some(items) = map.remove(kind.ledger_key()) {
            map.insert(ITEMS_KEY.to_string(), items);
        }
    }
    Ok(serde_json::from_value(document)?)
}

fn to_document(state: &LedgerState, kind: EntityKind) -> Result<Value, LedgerError> {
    let mut document = serde_json::to_value(state)?;
    if let Value::Object(map) = &mut document {
        if let Some(items) = map.remove(ITEMS_KEY) {
            map.insert(kind.ledger_key().to_string(), items);
        }
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn discovered(paths: &[&str]) -> Vec<DiscoveredItem> {
        paths
            .iter()
            .map(|p| DiscoveredItem {
                relative_path: (*p).to_string(),
                full_path: PathBuf::from("/library").join(p),
                meta: DefinitionMeta {
                    manufacturer: Some("Cisco".to_string()),
                    model: Some((*p).to_string()),
                    slug: None,
                },
            })
            .collect()
    }

    #[test]
    fn test_register_keeps_existing_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        let mut ledger = ProgressLedger::load_or_init(&path, EntityKind::ModuleType);

        assert_eq!(ledger.register_discovered(discovered(&["b.yaml", "a.yaml"])), 2);
        ledger.mark_failed("a.yaml", "boom");

        assert_eq!(
            ledger.register_discovered(discovered(&["a.yaml", "b.yaml", "c.yaml"])),
            1
        );
        assert_eq!(ledger.item("a.yaml").unwrap().status, ItemStatus::Failed);
        assert_eq!(ledger.total_files(), 3);

        let pending: Vec<String> = ledger.pending_items().into_iter().map(|(p, _)| p).collect();
        assert_eq!(pending, vec!["b.yaml", "c.yaml"]);
    }

    #[test]
    fn test_transitions_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("progress.json");
        let mut ledger = ProgressLedger::load_or_init(&path, EntityKind::DeviceType);
        ledger.register_discovered(discovered(&["a.yaml", "b.yaml", "c.yaml"]));
        ledger.mark_created("a.yaml", Some(11));
        ledger.mark_skipped("b.yaml", "Empty YAML file");

        let reloaded = ProgressLedger::load_or_init(&path, EntityKind::DeviceType);
        let a = reloaded.item("a.yaml").unwrap();
        assert_eq!(a.status, ItemStatus::Created);
        assert_eq!(a.remote_id, Some(11));
        assert!(a.created_at.is_some());
        assert_eq!(reloaded.pending_items().len(), 1);

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["processed_count"], json!(1));
        assert_eq!(raw["failed_count"], json!(0));
        assert_eq!(raw["device_types"]["b.yaml"]["status"], json!("skipped"));
        assert!(raw.get("items").is_none());
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_untracked_transition_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        let mut ledger = ProgressLedger::load_or_init(&path, EntityKind::DeviceType);
        ledger.mark_created("ghost.yaml", Some(1));
        assert!(ledger.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, "{not json").unwrap();
        let ledger = ProgressLedger::load_or_init(&path, EntityKind::RackType);
        assert!(ledger.is_empty());
        assert_eq!(ledger.summary().total, 0);
    }

    #[test]
    fn test_reads_legacy_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("module_type_progress.json");
        let legacy = json!({
            "created_at": "2024-05-01T10:00:00.123456",
            "last_updated": "2024-05-01T11:00:00.654321",
            "total_files": 2,
            "processed_count": 1,
            "failed_count": 0,
            "module_types": {
                "Cisco/nim-1ge.yaml": {
                    "full_path": "/lib/module-types/Cisco/nim-1ge.yaml",
                    "manufacturer": "Cisco",
                    "model": "NIM-1GE",
                    "slug": "",
                    "status": "created",
                    "created_at": "2024-05-01T10:30:00",
                    "error_message": null,
                    "netbox_id": 42
                },
                "Cisco/nim-2ge.yaml": {
                    "full_path": "/lib/module-types/Cisco/nim-2ge.yaml",
                    "manufacturer": "Cisco",
                    "model": "NIM-2GE",
                    "slug": "",
                    "status": "pending",
                    "created_at": null,
                    "error_message": null,
                    "netbox_id": null
                }
            }
        });
        fs::write(&path, legacy.to_string()).unwrap();

        let ledger = ProgressLedger::load_or_init(&path, EntityKind::ModuleType);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.item("Cisco/nim-1ge.yaml").unwrap().remote_id, Some(42));
        let summary = ledger.summary();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.pending, 1);
        assert!((summary.progress_percent - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_counts_items_missing_from_latest_scan() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        let mut ledger = ProgressLedger::load_or_init(&path, EntityKind::DeviceType);
        ledger.register_discovered(discovered(&["a.yaml", "b.yaml", "c.yaml", "d.yaml"]));
        for p in ["a.yaml", "b.yaml", "c.yaml", "d.yaml"] {
            ledger.mark_created(p, None);
        }

        assert_eq!(ledger.register_discovered(discovered(&["a.yaml", "b.yaml"])), 0);
        assert_eq!(ledger.total_files(), 2);

        let summary = ledger.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.created, 4);
        assert!(summary.total >= summary.created + summary.failed + summary.skipped + summary.pending);
        assert!((summary.progress_percent - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unwritable_ledger_keeps_memory_state() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("progress.json");

        let mut ledger = ProgressLedger::load_or_init(&path, EntityKind::ModuleType);
        assert_eq!(ledger.register_discovered(discovered(&["a.yaml", "b.yaml"])), 2);
        assert!(ledger.save().is_err());

        ledger.mark_failed("a.yaml", "rejected");

        assert!(!path.exists());
        let summary = ledger.summary();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.pending, 1);
        let failed = ledger.failed_items();
        assert_eq!(failed[0].0, "a.yaml");
        assert_eq!(failed[0].1.error_message.as_deref(), Some("rejected"));
    }

    #[test]
    fn test_requeue_and_reset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("progress.json");
        let mut ledger = ProgressLedger::load_or_init(&path, EntityKind::DeviceType);
        ledger.register_discovered(discovered(&["a.yaml", "b.yaml", "c.yaml"]));
        ledger.mark_failed("a.yaml", "rejected");
        ledger.mark_created("b.yaml", Some(2));

        assert_eq!(ledger.requeue_failed(), 1);
        assert_eq!(ledger.failed_items().len(), 0);
        assert_eq!(ledger.pending_items().len(), 2);

        assert_eq!(ledger.requeue_all(), 1);
        assert_eq!(ledger.pending_items().len(), 3);

        ledger.reset().unwrap();
        assert!(ledger.is_empty());
        assert!(!path.exists());
    }
}
