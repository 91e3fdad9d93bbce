//! Infrastructure layer: stores, reconciliation, catalog and bulk operations.
//!
//! Everything here composes injected trait objects (`LedgerStore`,
//! `CatalogStore`, `BlobStore`, `AlertEmitter`); the in-memory and filesystem
//! implementations serve tests, development and the bundled binary.

mod alerts;

pub mod bulk;
pub mod catalog;
pub mod catalog_store;
pub mod config;
pub mod delimited;
pub mod error;
pub mod ledger_store;
pub mod locks;
pub mod reconciliation;
pub mod staging;

#[cfg(test)]
mod integration_tests;

pub use bulk::{BatchFailure, BatchReport, BulkCoordinator, ExportSummary, StagedOutcome};
pub use catalog::{
    CatalogService, DeletedProduct, LowInventoryReport, NewProduct, ProductUpdate, QueryResult,
    StockStatus,
};
pub use config::InfraConfig;
pub use error::{ServiceError, ServiceResult};
pub use reconciliation::{AdjustmentResult, PurchaseReceipt, ReconciliationEngine};
