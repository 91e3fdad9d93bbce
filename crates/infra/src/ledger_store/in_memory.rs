use std::collections::HashMap;
use std::sync::RwLock;

use stockledger_core::ProductId;
use stockledger_events::Event;
use stockledger_inventory::StockMovement;

use super::r#trait::{LedgerEntry, LedgerStore, LedgerStoreError};

/// In-memory append-only ledger.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    ledgers: RwLock<HashMap<ProductId, Vec<LedgerEntry>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Zero deltas carry no stock movement and are refused by every store.
pub(super) fn validate_append(movement: &StockMovement) -> Result<(), LedgerStoreError> {
    if movement.delta == 0 {
        return Err(LedgerStoreError::InvalidAppend(
            "movement delta cannot be zero".to_string(),
        ));
    }
    Ok(())
}

/// The entry `movement` becomes when appended after `ledger`.
pub(super) fn next_entry(ledger: &[LedgerEntry], movement: StockMovement) -> LedgerEntry {
    LedgerEntry {
        sequence_number: ledger.last().map(|e| e.sequence_number).unwrap_or(0) + 1,
        movement,
    }
}

pub(super) fn log_append(entry: &LedgerEntry) {
    tracing::debug!(
        product_id = %entry.product_id(),
        sequence_number = entry.sequence_number,
        event_type = entry.movement.event_type(),
        schema_version = entry.movement.version(),
        occurred_at = %entry.movement.occurred_at(),
        delta = entry.delta(),
        "ledger entry appended"
    );
}

impl LedgerStore for InMemoryLedgerStore {
    fn append(&self, movement: StockMovement) -> Result<LedgerEntry, LedgerStoreError> {
        validate_append(&movement)?;

        let mut ledgers = self
            .ledgers
            .write()
            .map_err(|_| LedgerStoreError::Unavailable("lock poisoned".to_string()))?;

        let ledger = ledgers.entry(movement.product_id.clone()).or_default();
        let entry = next_entry(ledger, movement);
        ledger.push(entry.clone());
        log_append(&entry);

        Ok(entry)
    }

    fn entries(&self, product_id: &ProductId) -> Result<Vec<LedgerEntry>, LedgerStoreError> {
        let ledgers = self
            .ledgers
            .read()
            .map_err(|_| LedgerStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(ledgers.get(product_id).cloned().unwrap_or_default())
    }
}
