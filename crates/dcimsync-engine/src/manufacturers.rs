//! Manufacturer lookup and seeding.
//!
//! Reconciliation never creates manufacturers; they are seeded up front from
//! the library's manufacturer folders with [`seed_manufacturers`].

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use dcimsync_core::slugify;
use dcimsync_inventory::{Criteria, Endpoint, InventoryClient, Lookup, RemoteEntity};

use crate::error::ReconcileError;
use crate::tags::{TagManager, tag_list};

/// Look a manufacturer up by exact name, then by its derived slug.
pub async fn find_manufacturer(client: &dyn InventoryClient, name: &str) -> Lookup<RemoteEntity> {
    let by_name = client
        .lookup(Endpoint::Manufacturers, &Criteria::new().with("name", name))
        .await;
    if !by_name.is_not_found() {
        return by_name;
    }
    let slug = slugify(name);
    if slug.is_empty() {
        return Lookup::NotFound;
    }
    client
        .lookup(Endpoint::Manufacturers, &Criteria::new().with("slug", slug))
        .await
}

/// Id of an existing manufacturer.
///
/// # Errors
///
/// Returns `ReconcileError::ManufacturerUnresolved` when it does not exist
/// and `ReconcileError::LookupFailed` when the lookup itself fails.
pub async fn resolve_manufacturer(
    client: &dyn InventoryClient,
    name: &str,
) -> Result<u64, ReconcileError> {
    match find_manufacturer(client, name).await {
        Lookup::Found(manufacturer) => {
            debug!(manufacturer = name, id = manufacturer.id, "Manufacturer resolved");
            Ok(manufacturer.id)
        }
        Lookup::NotFound => Err(ReconcileError::manufacturer_unresolved(name)),
        Lookup::Failed(e) => Err(ReconcileError::lookup(Endpoint::Manufacturers, e)),
    }
}

/// Outcome of a seeding pass.
#[derive(Debug, Default, Clone)]
pub struct SeedReport {
    pub created: Vec<String>,
    pub tagged: Vec<String>,
    pub unchanged: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Create each missing manufacturer (name, slugified slug, marker tag) and
/// tag the existing ones. Names whose slug repeats an earlier name are
/// ignored.
pub async fn seed_manufacturers(
    client: &dyn InventoryClient,
    tags: &TagManager,
    names: &[String],
) -> SeedReport {
    let mut report = SeedReport::default();
    let marker_id = match tags.ensure_marker_tag().await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(error = %e, "Marker tag unavailable, seeding without it");
            None
        }
    };

    let mut seen = Vec::new();
    for name in names {
        let slug = slugify(name);
        if slug.is_empty() || seen.contains(&slug) {
            continue;
        }
        seen.push(slug.clone());

        let criteria = Criteria::new().with("slug", &slug);
        match client.lookup(Endpoint::Manufacturers, &criteria).await {
            Lookup::Found(existing) => {
                if marker_id.is_none() {
                    report.unchanged.push(name.clone());
                    continue;
                }
                match tags.ensure_tagged(Endpoint::Manufacturers, &existing, &[]).await {
                    Ok(true) => report.tagged.push(name.clone()),
                    Ok(false) => report.unchanged.push(name.clone()),
                    Err(e) => {
                        warn!(manufacturer = %name, error = %e, "Failed to tag manufacturer");
                        report.failed.push((name.clone(), e.to_string()));
                    }
                }
            }
            Lookup::NotFound => {
                let mut payload = Map::new();
                payload.insert("name".to_string(), Value::String(name.clone()));
                payload.insert("slug".to_string(), Value::String(slug.clone()));
                if let Some(id) = marker_id {
                    payload.insert("tags".to_string(), tag_list(&[id]));
                }
                match client.create(Endpoint::Manufacturers, &payload).await {
                    Ok(created) => {
                        info!(manufacturer = %name, id = created.id, "Created manufacturer");
                        report.created.push(name.clone());
                    }
                    Err(e) => {
                        warn!(manufacturer = %name, error = %e, "Failed to create manufacturer");
                        report.failed.push((name.clone(), e.to_string()));
                    }
                }
            }
            Lookup::Failed(e) => {
                warn!(manufacturer = %name, error = %e, "Manufacturer lookup failed");
                report.failed.push((name.clone(), e.to_string()));
            }
        }
    }

    info!(
        created = report.created.len(),
        tagged = report.tagged.len(),
        unchanged = report.unchanged.len(),
        failed = report.failed.len(),
        "Manufacturers seeded"
    );
    report
}
