pub mod ledger;
pub mod manufacturers;
pub mod sync;
