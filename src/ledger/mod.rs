//! Persistence layer: the settlement ledger and per-user preferences.

pub mod config_store;
pub mod store;

pub use config_store::UserConfigStore;
pub use store::LedgerStore;
