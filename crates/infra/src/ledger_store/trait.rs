use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockledger_core::ProductId;
use stockledger_inventory::StockMovement;

/// A movement persisted in a product's ledger (assigned a sequence number).
///
/// Sequence numbers are per product, start at 1 and increase by one per
/// append, so two entries written in the same instant never collide. They
/// order the audit trail; the stock total does not depend on order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub sequence_number: u64,
    #[serde(flatten)]
    pub movement: StockMovement,
}

impl LedgerEntry {
    pub fn product_id(&self) -> &ProductId {
        &self.movement.product_id
    }

    pub fn delta(&self) -> i64 {
        self.movement.delta
    }
}

/// Ledger store operation error.
///
/// Infrastructure failures only; stock rules live in the inventory domain.
#[derive(Debug, Error)]
pub enum LedgerStoreError {
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),

    #[error("invalid ledger append: {0}")]
    InvalidAppend(String),

    #[error("ledger file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger file {} line {line}: {reason}", .path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// Append-only, per-product stock ledger.
///
/// - `append` assigns the next sequence number for the movement's product and
///   persists it; entries are never updated or deleted.
/// - `entries` returns the product's full history in sequence order, or an
///   empty vector when nothing was ever written. Reads are restartable.
pub trait LedgerStore: Send + Sync {
    fn append(&self, movement: StockMovement) -> Result<LedgerEntry, LedgerStoreError>;

    fn entries(&self, product_id: &ProductId) -> Result<Vec<LedgerEntry>, LedgerStoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn append(&self, movement: StockMovement) -> Result<LedgerEntry, LedgerStoreError> {
        (**self).append(movement)
    }

    fn entries(&self, product_id: &ProductId) -> Result<Vec<LedgerEntry>, LedgerStoreError> {
        (**self).entries(product_id)
    }
}
