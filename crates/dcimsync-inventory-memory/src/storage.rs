use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use dcimsync_inventory::{
    Criteria, Endpoint, InventoryClient, InventoryError, RemoteEntity, collapse,
};

/// Kind of write recorded by the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOp {
    Create,
    Update,
}

/// One accepted write, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub endpoint: Endpoint,
    pub op: WriteOp,
    pub id: u64,
    pub payload: Map<String, Value>,
}

/// In-memory inventory backend.
///
/// Records live per endpoint, keyed by an id assigned from a shared counter.
/// Every accepted write is journaled so tests can assert on exactly what was
/// sent. Failures can be injected per endpoint for writes and for lookups.
#[derive(Debug)]
pub struct InMemoryInventory {
    records: RwLock<HashMap<Endpoint, BTreeMap<u64, RemoteEntity>>>,
    writes: RwLock<Vec<WriteRecord>>,
    failing_writes: RwLock<HashMap<Endpoint, String>>,
    failing_lookups: RwLock<HashMap<Endpoint, String>>,
    id_counter: AtomicU64,
}

impl Default for InMemoryInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            writes: RwLock::new(Vec::new()),
            failing_writes: RwLock::new(HashMap::new()),
            failing_lookups: RwLock::new(HashMap::new()),
            id_counter: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> u64 {
        self.id_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Inserts a record directly, bypassing the write journal.
    pub async fn seed(&self, endpoint: Endpoint, fields: Value) -> RemoteEntity {
        let mut fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let id = match fields.remove("id").and_then(|v| v.as_u64()) {
            Some(id) => {
                self.id_counter.fetch_max(id + 1, Ordering::SeqCst);
                id
            }
            None => self.next_id(),
        };
        let entity = RemoteEntity::new(id, fields);
        self.records
            .write()
            .await
            .entry(endpoint)
            .or_default()
            .insert(id, entity.clone());
        entity
    }

    /// All records stored under `endpoint`, ordered by id.
    pub async fn records(&self, endpoint: Endpoint) -> Vec<RemoteEntity> {
        self.records
            .read()
            .await
            .get(&endpoint)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn record(&self, endpoint: Endpoint, id: u64) -> Option<RemoteEntity> {
        self.records
            .read()
            .await
            .get(&endpoint)
            .and_then(|m| m.get(&id).cloned())
    }

    pub async fn count(&self, endpoint: Endpoint) -> usize {
        self.records
            .read()
            .await
            .get(&endpoint)
            .map_or(0, BTreeMap::len)
    }

    /// Journal of accepted writes.
    pub async fn writes(&self) -> Vec<WriteRecord> {
        self.writes.read().await.clone()
    }

    pub async fn write_count(&self) -> usize {
        self.writes.read().await.len()
    }

    pub async fn write_count_for(&self, endpoint: Endpoint, op: WriteOp) -> usize {
        self.writes
            .read()
            .await
            .iter()
            .filter(|w| w.endpoint == endpoint && w.op == op)
            .count()
    }

    pub async fn clear_writes(&self) {
        self.writes.write().await.clear();
    }

    /// Makes every create/update on `endpoint` fail with a rejection.
    pub async fn fail_writes(&self, endpoint: Endpoint, message: impl Into<String>) {
        self.failing_writes
            .write()
            .await
            .insert(endpoint, message.into());
    }

    /// Makes every get/filter on `endpoint` fail as unreachable.
    pub async fn fail_lookups(&self, endpoint: Endpoint, message: impl Into<String>) {
        self.failing_lookups
            .write()
            .await
            .insert(endpoint, message.into());
    }

    pub async fn clear_failures(&self) {
        self.failing_writes.write().await.clear();
        self.failing_lookups.write().await.clear();
    }

    async fn check_lookup(&self, endpoint: Endpoint) -> Result<(), InventoryError> {
        match self.failing_lookups.read().await.get(&endpoint) {
            Some(message) => Err(InventoryError::connection(message.clone())),
            None => Ok(()),
        }
    }

    async fn check_write(&self, endpoint: Endpoint) -> Result<(), InventoryError> {
        match self.failing_writes.read().await.get(&endpoint) {
            Some(message) => Err(InventoryError::rejected(
                endpoint.path(),
                400,
                message.clone(),
            )),
            None => Ok(()),
        }
    }

    async fn journal(&self, endpoint: Endpoint, op: WriteOp, id: u64, payload: &Map<String, Value>) {
        self.writes.write().await.push(WriteRecord {
            endpoint,
            op,
            id,
            payload: payload.clone(),
        });
    }
}

/// Render a value the way it would appear in a query string.
fn query_form(value: &Value) -> Option<String> {
    match collapse(value) {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A criterion matches a field directly, or `<field>_id` matches the id of
/// the related record stored under `<field>`.
fn matches_criterion(entity: &RemoteEntity, key: &str, expected: &str) -> bool {
    if let Some(value) = entity.scalar(key) {
        return query_form(&value).is_some_and(|v| v == expected);
    }
    if let Some(field) = key.strip_suffix("_id") {
        return entity
            .reference_id(field)
            .is_some_and(|id| id.to_string() == expected);
    }
    false
}

fn matches_all(entity: &RemoteEntity, criteria: &Criteria) -> bool {
    criteria
        .iter()
        .all(|(key, expected)| matches_criterion(entity, key, expected))
}

#[async_trait]
impl InventoryClient for InMemoryInventory {
    async fn get(
        &self,
        endpoint: Endpoint,
        criteria: &Criteria,
    ) -> Result<Option<RemoteEntity>, InventoryError> {
        let mut found = self.filter(endpoint, criteria).await?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            count => Err(InventoryError::multiple_results(endpoint.path(), count)),
        }
    }

    async fn filter(
        &self,
        endpoint: Endpoint,
        criteria: &Criteria,
    ) -> Result<Vec<RemoteEntity>, InventoryError> {
        self.check_lookup(endpoint).await?;
        let guard = self.records.read().await;
        Ok(guard
            .get(&endpoint)
            .map(|records| {
                records
                    .values()
                    .filter(|entity| matches_all(entity, criteria))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(
        &self,
        endpoint: Endpoint,
        payload: &Map<String, Value>,
    ) -> Result<RemoteEntity, InventoryError> {
        self.check_write(endpoint).await?;
        let id = self.next_id();
        let mut fields = payload.clone();
        fields.remove("id");
        let entity = RemoteEntity::new(id, fields);
        self.records
            .write()
            .await
            .entry(endpoint)
            .or_default()
            .insert(id, entity.clone());
        self.journal(endpoint, WriteOp::Create, id, payload).await;
        tracing::trace!(endpoint = %endpoint, id, "memory create");
        Ok(entity)
    }

    async fn update(
        &self,
        endpoint: Endpoint,
        id: u64,
        payload: &Map<String, Value>,
    ) -> Result<RemoteEntity, InventoryError> {
        self.check_write(endpoint).await?;
        let updated = {
            let mut guard = self.records.write().await;
            let entity = guard
                .get_mut(&endpoint)
                .and_then(|records| records.get_mut(&id))
                .ok_or_else(|| {
                    InventoryError::rejected(endpoint.path(), 404, format!("No record with id {id}"))
                })?;
            for (key, value) in payload {
                if key != "id" {
                    entity.fields.insert(key.clone(), value.clone());
                }
            }
            entity.clone()
        };
        self.journal(endpoint, WriteOp::Update, id, payload).await;
        tracing::trace!(endpoint = %endpoint, id, "memory update");
        Ok(updated)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
