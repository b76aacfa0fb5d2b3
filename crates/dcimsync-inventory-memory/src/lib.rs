//! In-memory inventory backend for dcimsync.
//!
//! This crate provides an in-memory implementation of the `InventoryClient`
//! trait from `dcimsync-inventory`. It behaves like the remote inventory for
//! lookups and writes, journals every write and can be told to fail.
//!
//! # Example
//!
//! ```ignore
//! use dcimsync_inventory::{Criteria, Endpoint, InventoryClient};
//! use dcimsync_inventory_memory::InMemoryInventory;
//!
//! let inventory = InMemoryInventory::new();
//! inventory
//!     .seed(Endpoint::Manufacturers, serde_json::json!({"name": "Cisco", "slug": "cisco"}))
//!     .await;
//! let cisco = inventory
//!     .get(Endpoint::Manufacturers, &Criteria::new().with("slug", "cisco"))
//!     .await?;
//! ```

pub mod storage;

// Re-export the client trait for convenience
pub use dcimsync_inventory::{InventoryClient, InventoryError, RemoteEntity};

pub use storage::{InMemoryInventory, WriteOp, WriteRecord};

/// Creates a new shareable in-memory inventory.
pub fn create_inventory() -> std::sync::Arc<InMemoryInventory> {
    std::sync::Arc::new(InMemoryInventory::new())
}
