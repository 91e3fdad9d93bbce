//! Append-only stock ledger boundary.
//!
//! Storage-agnostic abstraction for appending and loading the stock movements
//! of one product. The ledger is the source of truth for quantity.

pub mod file;
pub mod in_memory;
pub mod r#trait;

pub use file::FileLedgerStore;
pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{LedgerEntry, LedgerStore, LedgerStoreError};
