//! Service-level error taxonomy.

use thiserror::Error;

use stockledger_core::{DomainError, ProductId};

use crate::catalog_store::CatalogStoreError;
use crate::delimited::DelimitedError;
use crate::ledger_store::LedgerStoreError;
use crate::staging::BlobStoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Every failure a catalog, stock or bulk operation can report.
///
/// Validation failures (`InvalidArgument`, `NotFound`, `Conflict`,
/// `InsufficientStock`) are raised before any write. `NegativeStockRace` is
/// raised after a compensating entry was written. `Dependency` may follow a
/// partial write; `ReconciliationEngine::reconcile` repairs the cached quantity.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient stock (available: {available}, requested: {requested})")]
    InsufficientStock { available: i64, requested: i64 },

    #[error(
        "stock for {product_id} went negative ({total_before_compensation}) after a concurrent write; adjustment reverted"
    )]
    NegativeStockRace {
        product_id: ProductId,
        total_before_compensation: i64,
    },

    #[error("dependency failure: {0}")]
    Dependency(String),
}

impl ServiceError {
    pub fn product_not_found(product_id: &ProductId) -> Self {
        ServiceError::NotFound(format!("product {product_id}"))
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InvalidArgument(msg) | DomainError::InvalidId(msg) => {
                ServiceError::InvalidArgument(msg)
            }
            DomainError::NotFound(what) => ServiceError::NotFound(what),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::InsufficientStock {
                available,
                requested,
            } => ServiceError::InsufficientStock {
                available,
                requested,
            },
        }
    }
}

impl From<LedgerStoreError> for ServiceError {
    fn from(value: LedgerStoreError) -> Self {
        ServiceError::Dependency(value.to_string())
    }
}

impl From<CatalogStoreError> for ServiceError {
    fn from(value: CatalogStoreError) -> Self {
        match value {
            CatalogStoreError::VersionConflict { .. } => ServiceError::Conflict(value.to_string()),
            CatalogStoreError::Unavailable(_)
            | CatalogStoreError::Io { .. }
            | CatalogStoreError::Corrupt { .. } => ServiceError::Dependency(value.to_string()),
        }
    }
}

impl From<BlobStoreError> for ServiceError {
    fn from(value: BlobStoreError) -> Self {
        match value {
            BlobStoreError::NotFound(key) => ServiceError::NotFound(format!("staged object {key}")),
            BlobStoreError::InvalidKey(_) => ServiceError::InvalidArgument(value.to_string()),
            BlobStoreError::Io { .. } => ServiceError::Dependency(value.to_string()),
        }
    }
}

impl From<DelimitedError> for ServiceError {
    fn from(value: DelimitedError) -> Self {
        ServiceError::InvalidArgument(value.to_string())
    }
}
