//! # dcimsync-inventory
//!
//! Remote inventory abstraction for dcimsync.
//!
//! This crate defines the contract the reconciliation engine uses to read and
//! write records on the remote inventory. It contains no implementation; the
//! HTTP client lives in the CLI and an in-memory one in
//! `dcimsync-inventory-memory`.
//!
//! ## Overview
//!
//! [`InventoryClient`] exposes four operations over an [`Endpoint`]:
//! - `get`: at most one record matching [`Criteria`]
//! - `filter`: every record matching [`Criteria`]
//! - `create`: a new record from a payload
//! - `update`: a partial update of an existing record
//!
//! Lookups can be read as a three-way [`Lookup`] so that "absent" and
//! "unreachable" are never conflated.

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, InventoryError};
pub use traits::InventoryClient;
pub use types::{Criteria, Endpoint, Lookup, RemoteEntity, collapse};

/// Type alias for an inventory result.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Type alias for a shared inventory trait object.
pub type DynInventory = std::sync::Arc<dyn InventoryClient>;
