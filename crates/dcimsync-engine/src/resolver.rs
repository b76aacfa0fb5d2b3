//! Parent entity reconciliation: find, diff, then create, update or skip.

use std::fmt;

use serde_json::Value;
use tracing::{debug, info};

use dcimsync_core::{CoreError, Definition, EntityKind, NormalizedPayload};
use dcimsync_inventory::{Criteria, DynInventory, Endpoint, Lookup, RemoteEntity};

use crate::diff::changed_fields;
use crate::error::ReconcileError;
use crate::manufacturers::resolve_manufacturer;

/// What reconciliation did to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Created,
    Updated,
    Skipped,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// A reconciled record and what was done to it.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub outcome: Outcome,
    pub entity: RemoteEntity,
}

impl Reconciled {
    pub fn id(&self) -> u64 {
        self.entity.id
    }
}

pub struct EntityResolver {
    client: DynInventory,
}

impl EntityResolver {
    pub fn new(client: DynInventory) -> Self {
        Self { client }
    }

    /// Reconcile the parent record of `definition`.
    ///
    /// The manufacturer must already exist. The record is located by
    /// explicit id, then slug, then model within the manufacturer; only a
    /// confirmed absence leads to a create.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Validation` for documents missing required
    /// fields, `ManufacturerUnresolved` when the manufacturer is absent and
    /// `LookupFailed`/`RemoteWrite` for inventory failures.
    pub async fn reconcile(&self, definition: &Definition) -> Result<Reconciled, ReconcileError> {
        let kind = definition.kind;
        let endpoint = Endpoint::Entity(kind);
        let mut payload = definition.payload()?;

        let manufacturer = definition
            .manufacturer_name()
            .ok_or_else(|| CoreError::missing_field(kind.as_str(), "manufacturer"))?;
        let manufacturer_id = resolve_manufacturer(self.client.as_ref(), &manufacturer).await?;

        let explicit_id = payload.remove("id").and_then(|v| as_id(&v));
        payload.remove("tags");
        payload.insert("manufacturer", Value::from(manufacturer_id));

        match self
            .locate(kind, &payload, explicit_id, manufacturer_id)
            .await?
        {
            Some(existing) => self.update_existing(endpoint, &payload, existing).await,
            None => {
                let created = self
                    .client
                    .create(endpoint, payload.as_map())
                    .await
                    .map_err(|e| ReconcileError::write(endpoint, e))?;
                info!(
                    kind = %kind,
                    id = created.id,
                    model = payload.get_str("model").unwrap_or_default(),
                    "Created"
                );
                Ok(Reconciled {
                    outcome: Outcome::Created,
                    entity: created,
                })
            }
        }
    }

    async fn update_existing(
        &self,
        endpoint: Endpoint,
        payload: &NormalizedPayload,
        existing: RemoteEntity,
    ) -> Result<Reconciled, ReconcileError> {
        let changes = changed_fields(payload.as_map(), &existing);
        if changes.is_empty() {
            debug!(endpoint = %endpoint, id = existing.id, "Unchanged");
            return Ok(Reconciled {
                outcome: Outcome::Skipped,
                entity: existing,
            });
        }

        let fields: Vec<&String> = changes.keys().collect();
        info!(endpoint = %endpoint, id = existing.id, fields = ?fields, "Updating");
        let updated = self
            .client
            .update(endpoint, existing.id, &changes)
            .await
            .map_err(|e| ReconcileError::write(endpoint, e))?;
        Ok(Reconciled {
            outcome: Outcome::Updated,
            entity: updated,
        })
    }

    /// Find the remote record a payload describes. First match wins.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::LookupFailed` as soon as any lookup fails.
    pub async fn locate(
        &self,
        kind: EntityKind,
        payload: &NormalizedPayload,
        explicit_id: Option<u64>,
        manufacturer_id: u64,
    ) -> Result<Option<RemoteEntity>, ReconcileError> {
        let endpoint = Endpoint::Entity(kind);

        if let Some(id) = explicit_id {
            if let Some(found) = self.lookup(endpoint, Criteria::new().with("id", id)).await? {
                return Ok(Some(found));
            }
        }

        if kind.has_slug() {
            if let Some(slug) = payload.get_str("slug").filter(|s| !s.is_empty()) {
                if let Some(found) = self.lookup(endpoint, Criteria::new().with("slug", slug)).await? {
                    return Ok(Some(found));
                }
            }
        }

        let Some(model) = payload.get_str("model") else {
            return Ok(None);
        };
        let criteria = Criteria::new()
            .with("model", model)
            .with("manufacturer_id", manufacturer_id);
        let candidates = self
            .client
            .filter(endpoint, &criteria)
            .await
            .map_err(|e| ReconcileError::lookup(endpoint, e))?;
        Ok(candidates
            .into_iter()
            .find(|c| c.reference_id("manufacturer") == Some(manufacturer_id)))
    }

    async fn lookup(
        &self,
        endpoint: Endpoint,
        criteria: Criteria,
    ) -> Result<Option<RemoteEntity>, ReconcileError> {
        match self.client.lookup(endpoint, &criteria).await {
            Lookup::Found(found) => {
                debug!(endpoint = %endpoint, %criteria, id = found.id, "Located");
                Ok(Some(found))
            }
            Lookup::NotFound => Ok(None),
            Lookup::Failed(e) => Err(ReconcileError::lookup(endpoint, e)),
        }
    }
}

fn as_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
