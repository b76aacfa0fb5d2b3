//! Sequential processing of pending ledger items.

use std::error::Error as StdError;
use std::path::Path;

use serde_json::Value;
use tracing::{error, info, warn};

use dcimsync_core::{Definition, EntityKind};
use dcimsync_inventory::{DynInventory, Endpoint};

use crate::components::ComponentSynchronizer;
use crate::error::{LoadError, ReconcileError};
use crate::error_log::ErrorLog;
use crate::ledger::{CatalogItem, ProgressLedger};
use crate::resolver::{EntityResolver, Outcome};
use crate::tags::{MarkerTag, TagManager};

/// Reads a definition document from storage into a JSON value.
///
/// An empty document is returned as `Value::Null`.
pub trait DocumentLoader: Send + Sync {
    /// # Errors
    ///
    /// Returns `LoadError::Io` when the file cannot be read and
    /// `LoadError::Parse` when its content is not a valid document.
    fn load(&self, path: &Path) -> Result<Value, LoadError>;
}

impl<F> DocumentLoader for F
where
    F: Fn(&Path) -> Result<Value, LoadError> + Send + Sync,
{
    fn load(&self, path: &Path) -> Result<Value, LoadError> {
        self(path)
    }
}

/// Counters for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub files_created: usize,
    pub files_failed: usize,
    pub files_skipped: usize,
    pub entities_created: usize,
    pub entities_updated: usize,
    pub entities_unchanged: usize,
    pub components_created: usize,
    pub components_updated: usize,
    pub components_unchanged: usize,
    pub components_failed: usize,
    pub tagged: usize,
}

impl RunReport {
    pub fn files_processed(&self) -> usize {
        self.files_created + self.files_failed + self.files_skipped
    }
}

enum ItemOutcome {
    Created(u64),
    Failed(String),
    Skipped(String),
}

/// Reconciles every pending item of a ledger, one at a time.
pub struct BatchRunner<L> {
    client: DynInventory,
    kind: EntityKind,
    resolver: EntityResolver,
    tags: TagManager,
    error_log: ErrorLog,
    loader: L,
}

impl<L: DocumentLoader> BatchRunner<L> {
    pub fn new(
        client: DynInventory,
        kind: EntityKind,
        marker: MarkerTag,
        error_log: ErrorLog,
        loader: L,
    ) -> Self {
        Self {
            resolver: EntityResolver::new(client.clone()),
            tags: TagManager::new(client.clone(), marker),
            client,
            kind,
            error_log,
            loader,
        }
    }

    pub fn tags(&self) -> &TagManager {
        &self.tags
    }

    /// Process every pending item, marking each in the ledger as it finishes.
    pub async fn run(&self, ledger: &mut ProgressLedger) -> RunReport {
        self.run_limited(ledger, None).await
    }

    /// Like [`run`](Self::run) but stops after `limit` items.
    pub async fn run_limited(&self, ledger: &mut ProgressLedger, limit: Option<usize>) -> RunReport {
        let mut report = RunReport::default();
        let pending = ledger.pending_items();
        let take = limit.unwrap_or(pending.len());
        info!(kind = %self.kind, pending = pending.len(), limit = take, "Starting run");

        for (relative_path, item) in pending.into_iter().take(take) {
            match self.process_item(&relative_path, &item, &mut report).await {
                ItemOutcome::Created(id) => {
                    report.files_created += 1;
                    ledger.mark_created(&relative_path, Some(id));
                }
                ItemOutcome::Failed(message) => {
                    report.files_failed += 1;
                    error!(path = %relative_path, error = %message, "Item failed");
                    ledger.mark_failed(&relative_path, message);
                }
                ItemOutcome::Skipped(reason) => {
                    report.files_skipped += 1;
                    warn!(path = %relative_path, reason = %reason, "Item skipped");
                    ledger.mark_skipped(&relative_path, reason);
                }
            }
        }

        info!(
            kind = %self.kind,
            created = report.files_created,
            failed = report.files_failed,
            skipped = report.files_skipped,
            "Run finished"
        );
        report
    }

    async fn process_item(
        &self,
        relative_path: &str,
        item: &CatalogItem,
        report: &mut RunReport,
    ) -> ItemOutcome {
        let full_path = Path::new(&item.full_path);
        info!(path = %relative_path, "Processing");

        let document = match self.loader.load(full_path) {
            Ok(document) => document,
            Err(e) => {
                let message = e.to_string();
                self.error_log.record(relative_path, &message, Some(&e as &(dyn StdError + 'static)));
                return if e.is_validation_error() {
                    ItemOutcome::Skipped(message)
                } else {
                    ItemOutcome::Failed(message)
                };
            }
        };

        let fallback = full_path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned());
        let definitions =
            match Definition::from_document(self.kind, document, relative_path, fallback.as_deref()) {
                Ok(definitions) => definitions,
                Err(e) => {
                    let message = e.to_string();
                    self.error_log.record(relative_path, &message, None);
                    return ItemOutcome::Skipped(message);
                }
            };

        let mut last_id = None;
        let mut first_failure: Option<String> = None;
        let mut first_invalid: Option<String> = None;
        for definition in &definitions {
            match self.reconcile_definition(relative_path, definition, report).await {
                Ok(id) => last_id = Some(id),
                Err(e) => {
                    let message = e.to_string();
                    self.error_log
                        .record(relative_path, &message, Some(&e as &(dyn StdError + 'static)));
                    let slot = if e.is_validation_error() {
                        &mut first_invalid
                    } else {
                        &mut first_failure
                    };
                    slot.get_or_insert(message);
                }
            }
        }

        match (last_id, first_failure, first_invalid) {
            (_, Some(failure), _) => ItemOutcome::Failed(failure),
            (None, None, Some(invalid)) => ItemOutcome::Skipped(invalid),
            (Some(_), None, Some(invalid)) => ItemOutcome::Failed(invalid),
            (Some(id), None, None) => ItemOutcome::Created(id),
            (None, None, None) => ItemOutcome::Skipped("No usable definitions".to_string()),
        }
    }

    /// Parent, then components, then tags. Component and tag failures are
    /// logged against the item but do not fail it.
    async fn reconcile_definition(
        &self,
        relative_path: &str,
        definition: &Definition,
        report: &mut RunReport,
    ) -> Result<u64, ReconcileError> {
        let reconciled = self.resolver.reconcile(definition).await?;
        match reconciled.outcome {
            Outcome::Created => report.entities_created += 1,
            Outcome::Updated => report.entities_updated += 1,
            Outcome::Skipped => report.entities_unchanged += 1,
        }
        let id = reconciled.id();

        if let Some(parent_field) = self.kind.parent_field() {
            let mut components = ComponentSynchronizer::new(self.client.clone(), parent_field, id);
            let components_report = components.sync_definition(definition).await;
            report.components_created += components_report.created();
            report.components_updated += components_report.updated();
            report.components_unchanged += components_report.unchanged();
            report.components_failed += components_report.failed();
            for (result, e) in components_report.failures() {
                let message = format!("Failed {} '{}': {e}", result.kind.label(), result.name);
                self.error_log
                    .record(relative_path, &message, Some(e as &(dyn StdError + 'static)));
            }
        }

        let declared = definition.declared_tags();
        let extra = if declared.is_empty() {
            Vec::new()
        } else {
            match self.tags.resolve_declared(&declared).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(path = %relative_path, error = %e, "Failed to resolve declared tags");
                    Vec::new()
                }
            }
        };
        match self
            .tags
            .ensure_tagged(Endpoint::Entity(self.kind), &reconciled.entity, &extra)
            .await
        {
            Ok(true) => report.tagged += 1,
            Ok(false) => {}
            Err(e) => warn!(path = %relative_path, id, error = %e, "Failed to tag"),
        }

        Ok(id)
    }
}
