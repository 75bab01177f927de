//! Storage layer: the persisted rounds document and the reconciler that
//! decides when a fetched feed replaces it.

mod error;
pub use error::StoreError;

mod json;
pub use json::{DEFAULT_DATA_FILE, JsonStore};

pub mod reconcile;
pub use reconcile::{DrawNumber, Reconciliation, reconcile};
