//! Reconciliation engine: keeps cached quantities consistent with the ledger.
//!
//! Every quantity-affecting operation follows the same pipeline:
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the product record (NotFound if absent)
//!   ↓
//! 2. Load the ledger and rehydrate a StockLevel (cached quantity if empty)
//!   ↓
//! 3. Decide movements (pure; InsufficientStock etc. before any write)
//!   ↓
//! 4. Append movements to the ledger
//!   ↓
//! 5. Re-read the ledger total; compensate if it went negative
//!   ↓
//! 6. Write the total back to the cached quantity (conditional on version)
//!   ↓
//! 7. Emit alerts (best-effort)
//! ```
//!
//! Steps 1 to 6 run under the product's lock, so writers in this process never
//! interleave on one product. Step 5 still guards against writers sharing the
//! ledger from elsewhere. Alert failures never undo committed writes.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{Aggregate, DomainResult, ExpectedVersion, ProductId};
use stockledger_events::{AlertEmitter, AlertKind};
use stockledger_inventory::{
    is_low_stock, AdjustStock, CorrectStock, MovementKind, RecordPurchase, SeedStock, StockCommand,
    StockLevel, StockMovement, LOW_STOCK_THRESHOLD,
};
use stockledger_products::{Price, Product, PurchaseQuote};

use crate::alerts;
use crate::catalog_store::{CatalogStore, CatalogStoreError};
use crate::error::{ServiceError, ServiceResult};
use crate::ledger_store::{LedgerEntry, LedgerStore};
use crate::locks::ProductLocks;

/// Conditional writes of the cached quantity are retried this many times.
const MAX_CACHE_WRITE_ATTEMPTS: usize = 3;

const OPENING_BALANCE_REMARKS: &str = "Opening balance from cached quantity";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentResult {
    pub product_id: ProductId,
    pub delta: i64,
    pub new_total: i64,
    pub low_stock: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity_purchased: i64,
    pub price_per_unit: Price,
    pub total_cost: Decimal,
    pub remaining_stock: i64,
}

/// Ledger-authoritative stock engine over injected stores and an alert sink.
///
/// - `L`: ledger store (source of truth for quantity)
/// - `C`: catalog store (holds the cached quantity)
/// - `A`: alert emitter
#[derive(Debug)]
pub struct ReconciliationEngine<L, C, A> {
    ledger: L,
    catalog: C,
    alerts: A,
    locks: ProductLocks,
}

impl<L, C, A> ReconciliationEngine<L, C, A> {
    pub fn new(ledger: L, catalog: C, alerts: A) -> Self {
        Self {
            ledger,
            catalog,
            alerts,
            locks: ProductLocks::new(),
        }
    }

    pub fn ledger_store(&self) -> &L {
        &self.ledger
    }

    pub fn catalog_store(&self) -> &C {
        &self.catalog
    }

    pub fn alerts(&self) -> &A {
        &self.alerts
    }

    /// Run `f` holding the lock for `product_id`.
    pub fn with_product_lock<T>(&self, product_id: &ProductId, f: impl FnOnce() -> T) -> T {
        self.locks.with_lock(product_id, f)
    }
}

impl<L, C, A> ReconciliationEngine<L, C, A>
where
    L: LedgerStore,
    C: CatalogStore,
    A: AlertEmitter,
{
    /// Authoritative quantity: the ledger sum, or the cached quantity when the
    /// product has no ledger entries yet.
    pub fn compute_total(&self, product_id: &ProductId) -> ServiceResult<i64> {
        let product = self.load_product(product_id)?;
        let level = self.load_level(&product)?;
        tracing::debug!(product_id = %product_id, total = level.total(), "computed stock total");
        Ok(level.total())
    }

    /// Full ledger for a product in sequence order. History of deleted
    /// products stays readable.
    pub fn ledger(&self, product_id: &ProductId) -> ServiceResult<Vec<LedgerEntry>> {
        Ok(self.ledger.entries(product_id)?)
    }

    /// Apply a signed stock delta with remarks.
    pub fn apply_adjustment(
        &self,
        product_id: &ProductId,
        delta: i64,
        remarks: &str,
    ) -> ServiceResult<AdjustmentResult> {
        let (product, new_total) = self.with_product_lock(product_id, || {
            let product = self.load_product(product_id)?;
            let mut level = self.load_level(&product)?;

            let command = StockCommand::Adjust(AdjustStock {
                product_id: product_id.clone(),
                delta,
                remarks: remarks.to_string(),
                occurred_at: Utc::now(),
            });
            let decided = level.handle(&command)?;

            self.bootstrap_ledger(&mut level)?;
            let new_total = self.append_checked(product_id, decided)?;
            let product = self.commit_cached(product_id, |_| Ok(()))?;
            Ok::<_, ServiceError>((product, new_total))
        })?;

        tracing::info!(product_id = %product_id, delta, new_total, "stock adjusted");
        let low_stock = self.emit_stock_alerts(&product, delta, new_total, remarks);

        Ok(AdjustmentResult {
            product_id: product_id.clone(),
            delta,
            new_total,
            low_stock,
        })
    }

    /// Sell `units`: one negative ledger entry plus one combined catalog write
    /// of the remaining quantity and the sales count.
    pub fn apply_purchase(&self, product_id: &ProductId, units: i64) -> ServiceResult<PurchaseReceipt> {
        let (product, quote, remarks) = self.with_product_lock(product_id, || {
            let product = self.load_product(product_id)?;
            let mut level = self.load_level(&product)?;

            let command = StockCommand::Purchase(RecordPurchase {
                product_id: product_id.clone(),
                quantity: units,
                occurred_at: Utc::now(),
            });
            let decided = level.handle(&command)?;
            let quote = PurchaseQuote::for_units(product.price(), units)?;
            let remarks = remarks_of(&decided);

            self.bootstrap_ledger(&mut level)?;
            self.append_checked(product_id, decided)?;
            let product = self.commit_cached(product_id, |p| p.record_sale(units))?;
            Ok::<_, ServiceError>((product, quote, remarks))
        })?;

        let remaining_stock = product.quantity();
        tracing::info!(
            product_id = %product_id,
            units,
            total_cost = %quote.total_cost,
            remaining_stock,
            "purchase recorded"
        );
        self.emit_stock_alerts(&product, -units, remaining_stock, &remarks);

        Ok(PurchaseReceipt {
            product_id: product_id.clone(),
            product_name: product.product_name().to_string(),
            quantity_purchased: quote.quantity_purchased,
            price_per_unit: quote.price_per_unit,
            total_cost: quote.total_cost,
            remaining_stock,
        })
    }

    /// Move the total to `target` with a correction entry, applying `edit` to
    /// the record in the same catalog write.
    pub fn apply_correction(
        &self,
        product_id: &ProductId,
        target: i64,
        edit: impl Fn(&mut Product) -> DomainResult<()>,
    ) -> ServiceResult<Product> {
        let product = self.with_product_lock(product_id, || {
            let product = self.load_product(product_id)?;
            edit(&mut product.clone())?;
            let mut level = self.load_level(&product)?;

            let command = StockCommand::Correct(CorrectStock {
                product_id: product_id.clone(),
                target,
                occurred_at: Utc::now(),
            });
            let decided = level.handle(&command)?;

            if !decided.is_empty() {
                self.bootstrap_ledger(&mut level)?;
                self.append_checked(product_id, decided)?;
            }
            self.commit_cached(product_id, &edit)
        })?;

        tracing::info!(product_id = %product_id, target, "product corrected");
        Ok(product)
    }

    /// Store a new product and seed its ledger with the opening quantity.
    pub fn register(&self, product: Product) -> ServiceResult<Product> {
        let product_id = product.product_id().clone();
        let opening = product.quantity();

        self.with_product_lock(&product_id, || {
            let stored = self
                .catalog
                .put(product, ExpectedVersion::Absent)
                .map_err(|err| match err {
                    CatalogStoreError::VersionConflict { .. } => {
                        ServiceError::Conflict(format!("product {product_id} already exists"))
                    }
                    other => other.into(),
                })?;

            let level = StockLevel::rehydrate(
                product_id.clone(),
                0,
                self.ledger.entries(&product_id)?.iter().map(|e| &e.movement),
            )?;
            let seed = StockCommand::Seed(SeedStock {
                product_id: product_id.clone(),
                quantity: opening,
                occurred_at: Utc::now(),
            });
            if level.has_history() {
                // Orphaned history from a deleted product with the same id.
                let target = StockCommand::Correct(CorrectStock {
                    product_id: product_id.clone(),
                    target: opening,
                    occurred_at: Utc::now(),
                });
                self.append_all(level.handle(&target)?)?;
            } else {
                self.append_all(level.handle(&seed)?)?;
            }

            tracing::info!(product_id = %product_id, opening, "product registered");
            Ok::<_, ServiceError>(stored)
        })
    }

    /// Remove a product record under its lock. Ledger history is kept.
    pub fn unregister(&self, product_id: &ProductId) -> ServiceResult<Product> {
        self.with_product_lock(product_id, || {
            let removed = self
                .catalog
                .delete(product_id)?
                .ok_or_else(|| ServiceError::product_not_found(product_id))?;
            tracing::info!(product_id = %product_id, "product removed");
            Ok::<_, ServiceError>(removed)
        })
    }

    /// Re-derive the total from the ledger and rewrite the cached quantity.
    ///
    /// Idempotent; repairs a cache left stale by a failed catalog write.
    pub fn reconcile(&self, product_id: &ProductId) -> ServiceResult<i64> {
        let product = self.with_product_lock(product_id, || {
            self.commit_cached(product_id, |_| Ok(()))
        })?;
        tracing::info!(product_id = %product_id, total = product.quantity(), "cached quantity reconciled");
        Ok(product.quantity())
    }

    fn load_product(&self, product_id: &ProductId) -> ServiceResult<Product> {
        self.catalog
            .get(product_id)?
            .ok_or_else(|| ServiceError::product_not_found(product_id))
    }

    fn load_level(&self, product: &Product) -> ServiceResult<StockLevel> {
        let entries = self.ledger.entries(product.product_id())?;
        Ok(StockLevel::rehydrate(
            product.product_id().clone(),
            product.quantity(),
            entries.iter().map(|e| &e.movement),
        )?)
    }

    /// A product whose quantity predates the ledger gets an opening entry, so
    /// the ledger sum keeps matching once real movements are appended.
    fn bootstrap_ledger(&self, level: &mut StockLevel) -> ServiceResult<()> {
        if level.has_history() || level.total() == 0 {
            return Ok(());
        }
        let opening = StockMovement {
            product_id: level.product_id().clone(),
            delta: level.total(),
            remarks: OPENING_BALANCE_REMARKS.to_string(),
            kind: MovementKind::Seed,
            occurred_at: Utc::now(),
        };
        let entry = self.ledger.append(opening)?;
        level.apply(&entry.movement)?;
        tracing::info!(product_id = %level.product_id(), opening = entry.delta(), "ledger bootstrapped");
        Ok(())
    }

    fn append_all(&self, movements: Vec<StockMovement>) -> ServiceResult<()> {
        for movement in movements {
            self.ledger.append(movement)?;
        }
        Ok(())
    }

    /// Append, then re-read the ledger. A negative total means another writer
    /// raced us: each appended movement is reversed and the call fails.
    fn append_checked(
        &self,
        product_id: &ProductId,
        movements: Vec<StockMovement>,
    ) -> ServiceResult<i64> {
        let mut appended = Vec::with_capacity(movements.len());
        for movement in movements {
            appended.push(self.ledger.append(movement)?);
        }

        let total = self.ledger_total(product_id)?;
        if total >= 0 {
            return Ok(total);
        }

        tracing::warn!(product_id = %product_id, total, "negative stock after write; compensating");
        for entry in appended.iter().rev() {
            let compensation = StockMovement::compensating(&entry.movement, Utc::now());
            self.ledger.append(compensation)?;
        }
        // Best-effort repair; the race error is what the caller needs to see.
        if let Err(err) = self.commit_cached(product_id, |_| Ok(())) {
            tracing::warn!(product_id = %product_id, error = %err, "cache repair after compensation failed");
        }

        Err(ServiceError::NegativeStockRace {
            product_id: product_id.clone(),
            total_before_compensation: total,
        })
    }

    /// Checked sum of every entry, ignoring the cached quantity.
    fn ledger_total(&self, product_id: &ProductId) -> ServiceResult<i64> {
        let entries = self.ledger.entries(product_id)?;
        let level = StockLevel::rehydrate(product_id.clone(), 0, entries.iter().map(|e| &e.movement))?;
        Ok(level.total())
    }

    /// Write the ledger-derived total (plus `edit`) to the catalog with a
    /// version check, retrying from fresh reads on conflict.
    fn commit_cached(
        &self,
        product_id: &ProductId,
        edit: impl Fn(&mut Product) -> DomainResult<()>,
    ) -> ServiceResult<Product> {
        let mut last_conflict = None;
        for attempt in 1..=MAX_CACHE_WRITE_ATTEMPTS {
            let mut product = self.load_product(product_id)?;
            let total = self.load_level(&product)?.total();
            let expected = ExpectedVersion::Exact(product.version());

            product.set_quantity(total);
            edit(&mut product)?;

            match self.catalog.put(product, expected) {
                Ok(stored) => return Ok(stored),
                Err(err @ CatalogStoreError::VersionConflict { .. }) => {
                    tracing::debug!(product_id = %product_id, attempt, "cached quantity write conflicted; retrying");
                    last_conflict = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(last_conflict.map(ServiceError::from).unwrap_or_else(|| {
            ServiceError::Conflict(format!("cached quantity write for {product_id} kept conflicting"))
        }))
    }

    /// Emits `stock-updated`, plus `low-stock-alert` at or under the threshold.
    /// Returns whether the low-stock alert fired.
    fn emit_stock_alerts(&self, product: &Product, delta: i64, total: i64, remarks: &str) -> bool {
        alerts::emit_best_effort(
            &self.alerts,
            AlertKind::StockUpdated,
            alerts::stock_updated(product, delta, total, remarks),
        );

        let low = is_low_stock(total);
        if low {
            alerts::emit_best_effort(
                &self.alerts,
                AlertKind::LowStock,
                alerts::low_stock(product, total, LOW_STOCK_THRESHOLD),
            );
        }
        low
    }
}

fn remarks_of(movements: &[StockMovement]) -> String {
    movements
        .first()
        .map(|m| m.remarks.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::InMemoryCatalogStore;
    use crate::ledger_store::InMemoryLedgerStore;
    use stockledger_events::NoopAlertEmitter;

    type Engine = ReconciliationEngine<InMemoryLedgerStore, InMemoryCatalogStore, NoopAlertEmitter>;

    fn engine() -> Engine {
        ReconciliationEngine::new(
            InMemoryLedgerStore::new(),
            InMemoryCatalogStore::new(),
            NoopAlertEmitter,
        )
    }

    fn pid(id: &str) -> ProductId {
        ProductId::parse(id).unwrap()
    }

    fn register(engine: &Engine, id: &str, quantity: i64) {
        let product = Product::new(pid(id), "Widget", Price::parse("2.50").unwrap(), quantity).unwrap();
        engine.register(product).unwrap();
    }

    #[test]
    fn total_is_the_ledger_sum() {
        let engine = engine();
        register(&engine, "p1", 20);
        engine.apply_adjustment(&pid("p1"), -4, "damaged").unwrap();
        engine.apply_adjustment(&pid("p1"), 7, "restock").unwrap();

        assert_eq!(engine.compute_total(&pid("p1")).unwrap(), 23);
        let cached = engine.catalog_store().get(&pid("p1")).unwrap().unwrap();
        assert_eq!(cached.quantity(), 23);
    }

    #[test]
    fn unknown_product_is_not_found() {
        let engine = engine();
        assert!(matches!(
            engine.compute_total(&pid("ghost")),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            engine.apply_adjustment(&pid("ghost"), 1, "x"),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn zero_delta_is_rejected_without_writes() {
        let engine = engine();
        register(&engine, "p1", 5);
        let err = engine.apply_adjustment(&pid("p1"), 0, "noop").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
        assert_eq!(engine.ledger(&pid("p1")).unwrap().len(), 1);
    }

    #[test]
    fn cached_quantity_without_ledger_is_bootstrapped() {
        let engine = engine();
        let legacy = Product::new(pid("old"), "Legacy", Price::parse("1").unwrap(), 12).unwrap();
        engine
            .catalog_store()
            .put(legacy, ExpectedVersion::Absent)
            .unwrap();

        assert_eq!(engine.compute_total(&pid("old")).unwrap(), 12);
        let result = engine.apply_adjustment(&pid("old"), -2, "sold offline").unwrap();
        assert_eq!(result.new_total, 10);
        assert!(result.low_stock);

        let kinds: Vec<_> = engine
            .ledger(&pid("old"))
            .unwrap()
            .iter()
            .map(|e| e.movement.kind)
            .collect();
        assert_eq!(kinds, vec![MovementKind::Seed, MovementKind::Adjustment]);
    }

    #[test]
    fn correction_moves_total_and_edits_record() {
        let engine = engine();
        register(&engine, "p1", 20);
        let updated = engine
            .apply_correction(&pid("p1"), 8, |p| p.rename("Gadget"))
            .unwrap();

        assert_eq!(updated.quantity(), 8);
        assert_eq!(updated.product_name(), "Gadget");
        let last = engine.ledger(&pid("p1")).unwrap().pop().unwrap();
        assert_eq!(last.movement.kind, MovementKind::Correction);
        assert_eq!(last.delta(), -12);
    }

    #[test]
    fn reconcile_repairs_stale_cache() {
        let engine = engine();
        register(&engine, "p1", 20);
        let mut stale = engine.catalog_store().get(&pid("p1")).unwrap().unwrap();
        let version = stale.version();
        stale.set_quantity(999);
        engine
            .catalog_store()
            .put(stale, ExpectedVersion::Exact(version))
            .unwrap();

        assert_eq!(engine.reconcile(&pid("p1")).unwrap(), 20);
        assert_eq!(
            engine.catalog_store().get(&pid("p1")).unwrap().unwrap().quantity(),
            20
        );
    }

    #[test]
    fn re_registering_an_id_continues_from_orphaned_history() {
        let engine = engine();
        register(&engine, "p1", 20);
        engine.unregister(&pid("p1")).unwrap();
        register(&engine, "p1", 5);

        assert_eq!(engine.compute_total(&pid("p1")).unwrap(), 5);
        assert_eq!(engine.ledger(&pid("p1")).unwrap().len(), 2);
    }

    #[test]
    fn out_of_range_deltas_are_rejected_before_any_write() {
        let engine = engine();
        register(&engine, "p1", 5);

        for delta in [i64::MIN, i64::MAX] {
            let err = engine.apply_adjustment(&pid("p1"), delta, "huge").unwrap_err();
            assert!(matches!(err, ServiceError::InvalidArgument(_)), "{delta}: {err:?}");
        }

        assert_eq!(engine.ledger(&pid("p1")).unwrap().len(), 1);
        assert_eq!(engine.compute_total(&pid("p1")).unwrap(), 5);
        assert_eq!(engine.apply_adjustment(&pid("p1"), 3, "restock").unwrap().new_total, 8);
    }
}
