//! Component template reconciliation scoped to one parent record.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info, warn};

use dcimsync_core::{
    ComponentKind, ComponentTemplate, CoreError, Definition, NormalizedPayload, RefTarget,
    ReferenceSpec,
};
use dcimsync_inventory::{Criteria, DynInventory, Endpoint, Lookup, RemoteEntity};

use crate::diff::changed_fields;
use crate::error::ReconcileError;
use crate::manufacturers::find_manufacturer;
use crate::resolver::Outcome;

/// Result for one template.
#[derive(Debug)]
pub struct ComponentResult {
    pub kind: ComponentKind,
    pub name: String,
    pub outcome: Result<(Outcome, u64), ReconcileError>,
}

/// Per-template results for one definition.
#[derive(Debug, Default)]
pub struct ComponentReport {
    pub results: Vec<ComponentResult>,
}

impl ComponentReport {
    fn count(&self, wanted: Outcome) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Ok((outcome, _)) if outcome == wanted))
            .count()
    }

    pub fn created(&self) -> usize {
        self.count(Outcome::Created)
    }

    pub fn updated(&self) -> usize {
        self.count(Outcome::Updated)
    }

    pub fn unchanged(&self) -> usize {
        self.count(Outcome::Skipped)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&ComponentResult, &ReconcileError)> {
        self.results
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (r, e)))
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }
}

/// Reconciles the component templates of one parent record.
///
/// Templates created or updated here are cached by (kind, name) so later
/// templates in the same definition can reference them without a lookup.
pub struct ComponentSynchronizer {
    client: DynInventory,
    parent_field: &'static str,
    parent_id: u64,
    cache: HashMap<(ComponentKind, String), u64>,
}

impl ComponentSynchronizer {
    pub fn new(client: DynInventory, parent_field: &'static str, parent_id: u64) -> Self {
        Self {
            client,
            parent_field,
            parent_id,
            cache: HashMap::new(),
        }
    }

    pub fn cached(&self, kind: ComponentKind, name: &str) -> Option<u64> {
        self.cache.get(&(kind, name.to_string())).copied()
    }

    /// Reconcile every template of `definition` in processing order.
    /// A failing template is reported and never stops the others.
    pub async fn sync_definition(&mut self, definition: &Definition) -> ComponentReport {
        let mut report = ComponentReport::default();
        for (kind, templates) in definition.components() {
            for template in templates {
                let name = template.name().unwrap_or_default();
                let outcome = self.sync_template(&template).await;
                match &outcome {
                    Ok((Outcome::Created, id)) => {
                        info!(kind = %kind, name = %name, id, parent = self.parent_id, "Created template")
                    }
                    Ok((Outcome::Updated, id)) => {
                        info!(kind = %kind, name = %name, id, parent = self.parent_id, "Updated template")
                    }
                    Ok((Outcome::Skipped, id)) => {
                        debug!(kind = %kind, name = %name, id, "Template unchanged")
                    }
                    Err(e) => warn!(kind = %kind, name = %name, error = %e, "Template failed"),
                }
                report.results.push(ComponentResult {
                    kind,
                    name,
                    outcome,
                });
            }
        }
        report
    }

    /// Reconcile one template against the parent.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError` for invalid templates, unresolved required
    /// references and inventory failures.
    pub async fn sync_template(
        &mut self,
        template: &ComponentTemplate,
    ) -> Result<(Outcome, u64), ReconcileError> {
        let kind = template.kind;
        let endpoint = Endpoint::Component(kind);
        let mut payload = template.payload()?;
        let name = template.name().unwrap_or_default();

        for spec in kind.schema().references {
            self.resolve_reference(kind, &name, spec, &mut payload).await?;
        }
        payload.insert(self.parent_field, Value::from(self.parent_id));

        let (outcome, id) = match self.find_existing(endpoint, &name).await? {
            Some(existing) => {
                let changes = changed_fields(payload.as_map(), &existing);
                if changes.is_empty() {
                    (Outcome::Skipped, existing.id)
                } else {
                    let updated = self
                        .client
                        .update(endpoint, existing.id, &changes)
                        .await
                        .map_err(|e| ReconcileError::write(endpoint, e))?;
                    (Outcome::Updated, updated.id)
                }
            }
            None => {
                let created = self
                    .client
                    .create(endpoint, payload.as_map())
                    .await
                    .map_err(|e| ReconcileError::write(endpoint, e))?;
                (Outcome::Created, created.id)
            }
        };

        if outcome != Outcome::Skipped {
            self.cache.insert((kind, name), id);
        }
        Ok((outcome, id))
    }

    /// Replace a by-name reference in `payload` with the referenced id.
    /// Unresolvable optional references are dropped; a required one that is
    /// absent or not a name fails the template before any write.
    async fn resolve_reference(
        &self,
        kind: ComponentKind,
        template: &str,
        spec: &ReferenceSpec,
        payload: &mut NormalizedPayload,
    ) -> Result<(), ReconcileError> {
        let Some(value) = payload.get(spec.field).cloned() else {
            if spec.required {
                return Err(CoreError::missing_field(kind.label(), spec.field).into());
            }
            return Ok(());
        };
        if value.is_u64() {
            return Ok(());
        }
        let Some(target) = value.as_str().map(str::to_string) else {
            if spec.required {
                return Err(CoreError::invalid_field(spec.field, "expected a template name").into());
            }
            payload.remove(spec.field);
            return Ok(());
        };

        let resolved = match spec.target {
            RefTarget::Component(target_kind) => self.find_sibling(target_kind, &target).await,
            RefTarget::Manufacturer => find_manufacturer(self.client.as_ref(), &target)
                .await
                .map(|m| m.id),
        };

        match resolved {
            Lookup::Found(id) => {
                payload.insert(spec.field, Value::from(id));
                Ok(())
            }
            Lookup::NotFound if spec.required => {
                Err(ReconcileError::reference(kind, template, spec.field, target))
            }
            Lookup::Failed(e) if spec.required => {
                Err(ReconcileError::lookup(reference_endpoint(spec), e))
            }
            Lookup::NotFound | Lookup::Failed(_) => {
                debug!(kind = %kind, template, field = spec.field, %target, "Dropping unresolved reference");
                payload.remove(spec.field);
                Ok(())
            }
        }
    }

    /// Id of a sibling template: from this definition's cache, else from the
    /// inventory scoped to the parent.
    async fn find_sibling(&self, kind: ComponentKind, name: &str) -> Lookup<u64> {
        if let Some(id) = self.cached(kind, name) {
            return Lookup::Found(id);
        }
        match self.find_existing(Endpoint::Component(kind), name).await {
            Ok(Some(found)) => Lookup::Found(found.id),
            Ok(None) => Lookup::NotFound,
            Err(ReconcileError::LookupFailed { source, .. }) => Lookup::Failed(source),
            Err(_) => Lookup::NotFound,
        }
    }

    /// A template with `name` that belongs to the parent.
    async fn find_existing(
        &self,
        endpoint: Endpoint,
        name: &str,
    ) -> Result<Option<RemoteEntity>, ReconcileError> {
        let criteria = Criteria::new()
            .with("name", name)
            .with(format!("{}_id", self.parent_field), self.parent_id);
        let candidates = self
            .client
            .filter(endpoint, &criteria)
            .await
            .map_err(|e| ReconcileError::lookup(endpoint, e))?;
        Ok(candidates
            .into_iter()
            .find(|c| c.reference_id(self.parent_field) == Some(self.parent_id)))
    }
}

fn reference_endpoint(spec: &ReferenceSpec) -> Endpoint {
    match spec.target {
        RefTarget::Component(kind) => Endpoint::Component(kind),
        RefTarget::Manufacturer => Endpoint::Manufacturers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcimsync_core::EntityKind;
    use dcimsync_inventory_memory::{InMemoryInventory, WriteOp};
    use serde_json::json;
    use std::sync::Arc;

    fn definition(doc: Value) -> Definition {
        Definition::new(
            EntityKind::ModuleType,
            doc.as_object().cloned().unwrap_or_default(),
            "test.yaml",
            None,
        )
    }

    #[tokio::test]
    async fn test_front_ports_resolve_rear_ports_from_cache() {
        let inventory = Arc::new(InMemoryInventory::new());
        let mut sync = ComponentSynchronizer::new(inventory.clone(), "module_type", 50);
        // Front ports listed first; rear ports are still processed first.
        let def = definition(json!({
            "model": "X",
            "front-ports": [{"name": "F1", "type": "lc", "rear_port": "R1"}],
            "rear-ports": [{"name": "R1", "type": "lc", "positions": 1}]
        }));

        let report = sync.sync_definition(&def).await;
        assert_eq!(report.created(), 2);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.results[0].kind, ComponentKind::RearPorts);

        let rear_id = sync.cached(ComponentKind::RearPorts, "R1").unwrap();
        let fronts = inventory
            .records(Endpoint::Component(ComponentKind::FrontPorts))
            .await;
        assert_eq!(fronts[0].reference_id("rear_port"), Some(rear_id));
        assert_eq!(fronts[0].field("rear_port_position"), Some(&json!(1)));
        assert_eq!(fronts[0].reference_id("module_type"), Some(50));
    }

    #[tokio::test]
    async fn test_missing_rear_port_fails_only_that_template() {
        let inventory = Arc::new(InMemoryInventory::new());
        let mut sync = ComponentSynchronizer::new(inventory.clone(), "device_type", 8);
        let def = definition(json!({
            "model": "X",
            "interfaces": [{"name": "eth0", "type": "1000base-t", "mgmt_only": "true"}],
            "front-ports": [{"name": "F1", "type": "lc", "rear_port": "R9"}]
        }));

        let report = sync.sync_definition(&def).await;
        assert_eq!(report.created(), 1);
        assert_eq!(report.failed(), 1);
        let (failed, err) = report.failures().next().unwrap();
        assert_eq!(failed.name, "F1");
        assert!(matches!(err, ReconcileError::ReferenceResolution { .. }));
        assert_eq!(
            inventory
                .count(Endpoint::Component(ComponentKind::FrontPorts))
                .await,
            0
        );
    }

    #[tokio::test]
    async fn test_front_port_without_rear_port_is_never_written() {
        let inventory = Arc::new(InMemoryInventory::new());
        let mut sync = ComponentSynchronizer::new(inventory.clone(), "module_type", 50);
        let def = definition(json!({
            "model": "X",
            "rear-ports": [{"name": "R1", "type": "lc"}],
            "front-ports": [{"name": "F1", "type": "lc"}]
        }));

        let report = sync.sync_definition(&def).await;
        assert_eq!(report.created(), 1);
        assert_eq!(report.failed(), 1);
        let (failed, err) = report.failures().next().unwrap();
        assert_eq!(failed.name, "F1");
        assert!(err.is_validation_error());
        assert_eq!(
            err.to_string(),
            "Missing required field 'rear_port' for FrontPortTemplate"
        );
        assert_eq!(
            inventory
                .write_count_for(Endpoint::Component(ComponentKind::FrontPorts), WriteOp::Create)
                .await,
            0
        );
    }

    #[tokio::test]
    async fn test_optional_references_dropped() {
        let inventory = Arc::new(InMemoryInventory::new());
        inventory
            .seed(Endpoint::Manufacturers, json!({"id": 3, "name": "Cisco", "slug": "cisco"}))
            .await;
        let mut sync = ComponentSynchronizer::new(inventory.clone(), "device_type", 8);
        let def = definition(json!({
            "model": "X",
            "power-outlets": [{"name": "O1", "type": "iec-60320-c13", "power_port": "PSU9"}],
            "inventory-items": [
                {"name": "Fan", "manufacturer": "Cisco"},
                {"name": "Optic", "manufacturer": "Nobody"}
            ]
        }));

        let report = sync.sync_definition(&def).await;
        assert_eq!(report.created(), 3);

        let outlet = &inventory
            .records(Endpoint::Component(ComponentKind::PowerOutlets))
            .await[0];
        assert!(outlet.field("power_port").is_none());

        let items = inventory
            .records(Endpoint::Component(ComponentKind::InventoryItems))
            .await;
        assert_eq!(items[0].reference_id("manufacturer"), Some(3));
        assert!(items[1].field("manufacturer").is_none());
    }

    #[tokio::test]
    async fn test_existing_templates_scoped_to_parent() {
        let inventory = Arc::new(InMemoryInventory::new());
        let endpoint = Endpoint::Component(ComponentKind::Interfaces);
        inventory
            .seed(endpoint, json!({"id": 100, "name": "eth0", "type": "1000base-t", "device_type": {"id": 9}}))
            .await;
        inventory
            .seed(endpoint, json!({"id": 101, "name": "eth0", "type": "10gbase-x-sfpp", "device_type": {"id": 8}}))
            .await;
        let mut sync = ComponentSynchronizer::new(inventory.clone(), "device_type", 8);

        let def = definition(json!({
            "model": "X",
            "interfaces": [{"name": "eth0", "type": "10gbase-x-sfpp"}]
        }));
        let report = sync.sync_definition(&def).await;
        assert_eq!(report.unchanged(), 1);
        assert!(matches!(report.results[0].outcome, Ok((Outcome::Skipped, 101))));
        assert!(sync.cached(ComponentKind::Interfaces, "eth0").is_none());

        let def = definition(json!({
            "model": "X",
            "interfaces": [{"name": "eth0", "type": "25gbase-x-sfp28"}]
        }));
        let report = sync.sync_definition(&def).await;
        assert_eq!(report.updated(), 1);
        assert_eq!(inventory.write_count_for(endpoint, WriteOp::Update).await, 1);
        assert_eq!(
            inventory.record(endpoint, 100).await.unwrap().str_field("type"),
            Some("1000base-t")
        );
    }
}
