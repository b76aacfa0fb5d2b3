//! The remote inventory contract.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::InventoryError;
use crate::types::{Criteria, Endpoint, Lookup, RemoteEntity};

/// Capability the reconciliation engine needs from the remote inventory.
///
/// Implementations must be thread-safe (`Send + Sync`). The engine calls
/// them strictly one after another; nothing here is retried.
///
/// # Example
///
/// ```ignore
/// use dcimsync_inventory::{Criteria, Endpoint, InventoryClient};
///
/// async fn manufacturer_id(client: &dyn InventoryClient, slug: &str) -> Option<u64> {
///     let criteria = Criteria::new().with("slug", slug);
///     client
///         .get(Endpoint::Manufacturers, &criteria)
///         .await
///         .ok()
///         .flatten()
///         .map(|m| m.id)
/// }
/// ```
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Fetches the single record matching `criteria`.
    ///
    /// Returns `None` when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::MultipleResults` when more than one record
    /// matches, or a transport/protocol error.
    async fn get(
        &self,
        endpoint: Endpoint,
        criteria: &Criteria,
    ) -> Result<Option<RemoteEntity>, InventoryError>;

    /// Lists every record matching `criteria`.
    ///
    /// # Errors
    ///
    /// Returns a transport/protocol error.
    async fn filter(
        &self,
        endpoint: Endpoint,
        criteria: &Criteria,
    ) -> Result<Vec<RemoteEntity>, InventoryError>;

    /// Creates a record.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Rejected` if the inventory refuses the payload.
    async fn create(
        &self,
        endpoint: Endpoint,
        payload: &Map<String, Value>,
    ) -> Result<RemoteEntity, InventoryError>;

    /// Partially updates record `id` with the fields in `payload`; fields
    /// absent from the payload keep their current value.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Rejected` if the inventory refuses the payload.
    async fn update(
        &self,
        endpoint: Endpoint,
        id: u64,
        payload: &Map<String, Value>,
    ) -> Result<RemoteEntity, InventoryError>;

    /// Returns the name of this client for logging/debugging.
    fn backend_name(&self) -> &'static str;

    /// [`get`](Self::get) as a three-way [`Lookup`].
    async fn lookup(&self, endpoint: Endpoint, criteria: &Criteria) -> Lookup<RemoteEntity> {
        self.get(endpoint, criteria).await.into()
    }
}
