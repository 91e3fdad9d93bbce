//! Per-product mutual exclusion for read-validate-write sequences.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use stockledger_core::ProductId;

/// Lock table keyed by product id.
///
/// Holding a product's lock serializes every stock-changing operation on that
/// product inside this process. Different products never contend. Entries
/// exist only while some caller holds or waits on them.
#[derive(Debug, Default)]
pub struct ProductLocks {
    table: Mutex<HashMap<ProductId, Arc<Mutex<()>>>>,
}

impl ProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `product_id`.
    pub fn with_lock<T>(&self, product_id: &ProductId, f: impl FnOnce() -> T) -> T {
        let lock = self.handle(product_id);
        let result = {
            // The guarded value is `()`, so a poisoned lock carries no broken state.
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release(product_id, lock);
        result
    }

    /// Number of products with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn handle(&self, product_id: &ProductId) -> Arc<Mutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.entry(product_id.clone()).or_default().clone()
    }

    /// Clones are only handed out under the table lock, so a count of two
    /// (the table's and `lock`) means nobody else holds or waits on it.
    fn release(&self, product_id: &ProductId, lock: Arc<Mutex<()>>) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&lock) == 2 {
            table.remove(product_id);
        }
    }
}
