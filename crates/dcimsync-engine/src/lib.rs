//! # dcimsync-engine
//!
//! Reconciles hardware-type definitions against the remote inventory.
//!
//! For each pending item of a [`ProgressLedger`] the [`BatchRunner`] loads the
//! document, lets the [`EntityResolver`] create, update or skip the parent
//! record, hands the parent id to a [`ComponentSynchronizer`] for its
//! templates and finally attaches the marker tag through the [`TagManager`].
//! Each item's outcome is persisted to the ledger before the next one starts.
//!
//! All inventory calls are awaited one after another. Nothing is retried
//! within a run; failed items are retried by requeueing them in the ledger.

pub mod components;
pub mod diff;
pub mod error;
pub mod error_log;
pub mod ledger;
pub mod manufacturers;
pub mod resolver;
pub mod runner;
pub mod tags;

pub use components::{ComponentReport, ComponentResult, ComponentSynchronizer};
pub use diff::{changed_fields, values_match};
pub use error::{ErrorCategory, LedgerError, LoadError, ReconcileError};
pub use error_log::{ErrorLog, sanitize_name};
pub use ledger::{CatalogItem, DiscoveredItem, ItemStatus, LedgerSummary, ProgressLedger};
pub use manufacturers::{SeedReport, find_manufacturer, resolve_manufacturer, seed_manufacturers};
pub use resolver::{EntityResolver, Outcome, Reconciled};
pub use runner::{BatchRunner, DocumentLoader, RunReport};
pub use tags::{MarkerTag, TagManager};
