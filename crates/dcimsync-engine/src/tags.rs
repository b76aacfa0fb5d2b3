//! Marker tag and declared tag handling.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use dcimsync_core::slugify;
use dcimsync_inventory::{Criteria, DynInventory, Endpoint, Lookup, RemoteEntity};

use crate::error::ReconcileError;

/// Attributes of the tag attached to every reconciled record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerTag {
    pub name: String,
    pub slug: String,
    pub color: String,
    pub description: String,
}

impl Default for MarkerTag {
    fn default() -> Self {
        Self {
            name: "Valid".to_string(),
            slug: "valid".to_string(),
            color: "4caf50".to_string(),
            description: "Indicates a validated hardware type".to_string(),
        }
    }
}

impl MarkerTag {
    fn payload(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.insert("slug".to_string(), Value::String(self.slug.clone()));
        map.insert("color".to_string(), Value::String(self.color.clone()));
        map.insert(
            "description".to_string(),
            Value::String(self.description.clone()),
        );
        map
    }
}

/// Resolves tags and attaches them to records.
///
/// The marker tag id is looked up once and reused for the rest of the run.
pub struct TagManager {
    client: DynInventory,
    marker: MarkerTag,
    marker_id: OnceCell<u64>,
}

impl TagManager {
    pub fn new(client: DynInventory, marker: MarkerTag) -> Self {
        Self {
            client,
            marker,
            marker_id: OnceCell::new(),
        }
    }

    pub fn marker(&self) -> &MarkerTag {
        &self.marker
    }

    /// Id of the marker tag, found by slug, then name, else created.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError` when a lookup fails or the tag cannot be
    /// created. A failed attempt is retried on the next call.
    pub async fn ensure_marker_tag(&self) -> Result<u64, ReconcileError> {
        self.marker_id
            .get_or_try_init(|| self.find_or_create_marker())
            .await
            .copied()
    }

    async fn find_or_create_marker(&self) -> Result<u64, ReconcileError> {
        for criteria in [
            Criteria::new().with("slug", &self.marker.slug),
            Criteria::new().with("name", &self.marker.name),
        ] {
            match self.client.lookup(Endpoint::Tags, &criteria).await {
                Lookup::Found(tag) => {
                    debug!(tag_id = tag.id, %criteria, "Marker tag found");
                    return Ok(tag.id);
                }
                Lookup::NotFound => continue,
                Lookup::Failed(e) => return Err(ReconcileError::lookup(Endpoint::Tags, e)),
            }
        }

        let created = self
            .client
            .create(Endpoint::Tags, &self.marker.payload())
            .await
            .map_err(|e| ReconcileError::write(Endpoint::Tags, e))?;
        info!(tag_id = created.id, slug = %self.marker.slug, "Created marker tag");
        Ok(created.id)
    }

    /// Add the marker tag and `extra` tag ids to `entity`, keeping whatever
    /// tags it already has. Returns `true` if a write was needed.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError` when the marker tag cannot be resolved or the
    /// update is rejected.
    pub async fn ensure_tagged(
        &self,
        endpoint: Endpoint,
        entity: &RemoteEntity,
        extra: &[u64],
    ) -> Result<bool, ReconcileError> {
        let marker_id = self.ensure_marker_tag().await?;
        let mut tags = entity.tag_ids();
        let before = tags.len();
        for id in std::iter::once(marker_id).chain(extra.iter().copied()) {
            if !tags.contains(&id) {
                tags.push(id);
            }
        }
        if tags.len() == before {
            debug!(endpoint = %endpoint, id = entity.id, "Already tagged");
            return Ok(false);
        }

        let mut payload = Map::new();
        payload.insert("tags".to_string(), tag_list(&tags));
        self.client
            .update(endpoint, entity.id, &payload)
            .await
            .map_err(|e| ReconcileError::write(endpoint, e))?;
        info!(endpoint = %endpoint, id = entity.id, tags = ?tags, "Tagged");
        Ok(true)
    }

    /// Resolve tag slugs declared in a document to ids, creating missing tags.
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError` on the first lookup or create failure.
    pub async fn resolve_declared(&self, declared: &[String]) -> Result<Vec<u64>, ReconcileError> {
        let mut ids = Vec::with_capacity(declared.len());
        for raw in declared {
            let slug = slugify(raw);
            if slug.is_empty() {
                continue;
            }
            let criteria = Criteria::new().with("slug", &slug);
            let id = match self.client.lookup(Endpoint::Tags, &criteria).await {
                Lookup::Found(tag) => tag.id,
                Lookup::NotFound => {
                    let mut payload = Map::new();
                    payload.insert("name".to_string(), Value::String(raw.clone()));
                    payload.insert("slug".to_string(), Value::String(slug.clone()));
                    let created = self
                        .client
                        .create(Endpoint::Tags, &payload)
                        .await
                        .map_err(|e| ReconcileError::write(Endpoint::Tags, e))?;
                    info!(tag_id = created.id, %slug, "Created declared tag");
                    created.id
                }
                Lookup::Failed(e) => return Err(ReconcileError::lookup(Endpoint::Tags, e)),
            };
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

/// Tags as the inventory expects them on writes.
pub fn tag_list(ids: &[u64]) -> Value {
    Value::Array(ids.iter().map(|id| json!({ "id": id })).collect())
}
