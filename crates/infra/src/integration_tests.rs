//! Integration tests for the full stock pipeline.
//!
//! Tests: CatalogService → ReconciliationEngine → LedgerStore/CatalogStore →
//! AlertEmitter → EventBus subscription
//!
//! Verifies:
//! - the cached quantity always matches the ledger sum
//! - rejected operations leave no ledger entries behind
//! - alerts fire at the low-stock boundary and never roll back writes
//! - concurrent purchases on one product never oversell
//! - a racing external ledger writer triggers a compensating entry

use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use rust_decimal::Decimal;
use serde_json::Value as JsonValue;

use stockledger_core::ProductId;
use stockledger_events::{
    Alert, AlertEmitter, AlertError, AlertKind, BusAlertEmitter, EventBus, InMemoryEventBus,
    Subscription,
};
use stockledger_inventory::{MovementKind, StockMovement};
use stockledger_products::Price;

use crate::bulk::{BulkCoordinator, StagedOutcome};
use crate::catalog::{CatalogService, NewProduct, QueryResult};
use crate::catalog_store::{CatalogStore, InMemoryCatalogStore};
use crate::error::ServiceError;
use crate::ledger_store::{InMemoryLedgerStore, LedgerEntry, LedgerStore, LedgerStoreError};
use crate::reconciliation::ReconciliationEngine;
use crate::staging::{BlobStore, InMemoryBlobStore};

type Bus = Arc<InMemoryEventBus<Alert>>;
type Service<L> = CatalogService<L, InMemoryCatalogStore, BusAlertEmitter<Bus>>;

fn setup() -> (Service<InMemoryLedgerStore>, Subscription<Alert>) {
    setup_with_ledger(InMemoryLedgerStore::new())
}

fn setup_with_ledger<L: LedgerStore>(ledger: L) -> (Service<L>, Subscription<Alert>) {
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let subscription = bus.subscribe();
    let engine = ReconciliationEngine::new(ledger, InMemoryCatalogStore::new(), BusAlertEmitter::new(bus));
    (CatalogService::new(engine), subscription)
}

fn pid(id: &str) -> ProductId {
    ProductId::parse(id).unwrap()
}

fn product(id: &str, price: &str, quantity: i64) -> NewProduct {
    NewProduct {
        product_id: id.to_string(),
        product_name: format!("Product {id}"),
        price: Price::parse(price).unwrap(),
        quantity,
    }
}

fn kinds(alerts: &[Alert]) -> Vec<AlertKind> {
    alerts.iter().map(Alert::kind).collect()
}

fn ledger_sum<L: LedgerStore, C, A>(svc: &CatalogService<L, C, A>, id: &ProductId) -> i64 {
    svc.engine()
        .ledger_store()
        .entries(id)
        .unwrap()
        .iter()
        .map(LedgerEntry::delta)
        .sum()
}

#[test]
fn end_to_end_purchase_scenario() {
    let (svc, alerts) = setup();
    svc.create_product(NewProduct {
        product_id: "p1".to_string(),
        product_name: "Widget".to_string(),
        price: Price::parse("9.99").unwrap(),
        quantity: 20,
    })
    .unwrap();

    let receipt = svc.purchase(&pid("p1"), 5).unwrap();
    assert_eq!(receipt.quantity_purchased, 5);
    assert_eq!(receipt.total_cost, Decimal::from_str("49.95").unwrap());
    assert_eq!(receipt.remaining_stock, 15);

    let p1 = svc.get_product(&pid("p1")).unwrap();
    assert_eq!(p1.quantity(), 15);
    assert_eq!(p1.sales_count(), 5);

    let ledger = svc.engine().ledger(&pid("p1")).unwrap();
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.iter().map(LedgerEntry::delta).sum::<i64>(), 15);
    assert_eq!(ledger[1].movement.remarks, "Purchase of 5 units");

    assert_eq!(
        kinds(&alerts.drain()),
        vec![AlertKind::ProductCreated, AlertKind::StockUpdated]
    );
}

#[test]
fn purchase_cost_is_exact_decimal() {
    let (svc, _alerts) = setup();
    svc.create_product(product("p1", "0.1", 100)).unwrap();
    let receipt = svc.purchase(&pid("p1"), 3).unwrap();
    assert_eq!(receipt.total_cost, Decimal::from_str("0.3").unwrap());
    assert_eq!(receipt.price_per_unit, Price::parse("0.1").unwrap());
}

#[test]
fn cached_quantity_tracks_ledger_over_mixed_operations() {
    let (svc, _alerts) = setup();
    svc.create_product(product("p1", "3", 50)).unwrap();
    let engine = svc.engine();
    let id = pid("p1");

    engine.apply_adjustment(&id, -7, "damaged").unwrap();
    engine.apply_adjustment(&id, 12, "restock").unwrap();
    svc.purchase(&id, 9).unwrap();
    let _ = engine.apply_adjustment(&id, -1_000, "too much");
    engine.apply_adjustment(&id, 1, "found one").unwrap();

    let total = engine.compute_total(&id).unwrap();
    assert_eq!(total, 47);
    assert_eq!(total, ledger_sum(&svc, &id));
    let cached = engine.catalog_store().get(&id).unwrap().unwrap();
    assert_eq!(cached.quantity(), total);
}

#[test]
fn over_reduction_leaves_ledger_unchanged() {
    let (svc, alerts) = setup();
    svc.create_product(product("p1", "1", 4)).unwrap();
    alerts.drain();
    let before = svc.engine().ledger(&pid("p1")).unwrap().len();

    let err = svc
        .engine()
        .apply_adjustment(&pid("p1"), -5, "too much")
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::InsufficientStock {
            available: 4,
            requested: 5
        }
    ));
    assert_eq!(svc.engine().ledger(&pid("p1")).unwrap().len(), before);
    assert!(alerts.drain().is_empty());
}

#[test]
fn deleting_a_missing_product_reports_not_found() {
    let (svc, _alerts) = setup();
    assert!(matches!(
        svc.delete_product(&pid("ghost")),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn low_stock_alert_fires_at_threshold_only() {
    let (svc, alerts) = setup();
    svc.create_product(product("hit", "1", 15)).unwrap();
    svc.create_product(product("miss", "1", 15)).unwrap();
    alerts.drain();

    let hit = svc.engine().apply_adjustment(&pid("hit"), -5, "count").unwrap();
    assert!(hit.low_stock);
    let fired = alerts.drain();
    assert_eq!(kinds(&fired), vec![AlertKind::StockUpdated, AlertKind::LowStock]);
    assert_eq!(fired[0].detail()["total_quantity"], 10);
    assert_eq!(fired[0].detail()["delta"], -5);
    assert_eq!(fired[1].detail()["current_quantity"], 10);
    assert_eq!(fired[1].detail()["threshold"], 10);
    assert_eq!(fired[1].source(), "stockledger.inventory");

    let miss = svc.engine().apply_adjustment(&pid("miss"), -4, "count").unwrap();
    assert!(!miss.low_stock);
    assert_eq!(kinds(&alerts.drain()), vec![AlertKind::StockUpdated]);
}

#[test]
fn specialized_query_picks_extrema() {
    let (svc, _alerts) = setup();
    svc.create_product(product("A", "10", 1)).unwrap();
    svc.create_product(product("B", "50", 1)).unwrap();
    svc.create_product(product("C", "5", 1)).unwrap();

    let id_of = |kind: &str| match svc.specialized_query(kind).unwrap() {
        QueryResult::Single(p) => p.product_id().to_string(),
        QueryResult::All(_) => panic!("expected a single product"),
    };
    assert_eq!(id_of("most_expensive"), "B");
    assert_eq!(id_of("least_expensive"), "C");
}

#[test]
fn staged_batch_with_one_bad_record_imports_the_rest() {
    let (svc, _alerts) = setup();
    let svc = Arc::new(svc);
    let staging = InMemoryBlobStore::new();
    staging
        .put(
            "for_create/batch-001.csv",
            b"product_id,product_name,quantity,price\n\
              p1,Widget,20,9.99\n\
              p2,Gadget,5,19.50\n\
              p3,\"Bolt, hex\",100,0.15\n\
              p4,Broken,lots,1.00\n",
        )
        .unwrap();
    let bulk = BulkCoordinator::new(svc.clone(), staging);

    let report = match bulk.process_staged("for_create/batch-001.csv").unwrap() {
        StagedOutcome::Created { report, .. } => report,
        other => panic!("expected a create batch, got {other:?}"),
    };
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed_count, 1);
    assert_eq!(report.failures[0].record["product_id"], "p4");

    for id in ["p1", "p2", "p3"] {
        assert!(svc.get_product(&pid(id)).is_ok(), "{id} should be retrievable");
    }
    assert_eq!(svc.get_product(&pid("p3")).unwrap().product_name(), "Bolt, hex");
}

#[test]
fn staged_delete_and_unrelated_keys() {
    let (svc, _alerts) = setup();
    let svc = Arc::new(svc);
    svc.create_product(product("p1", "1", 1)).unwrap();

    let staging = InMemoryBlobStore::new();
    staging
        .put("for_delete/old.csv", b"product_id\np1\nnot-there\n")
        .unwrap();
    staging.put("reports/readme.txt", b"ignore me").unwrap();
    let bulk = BulkCoordinator::new(svc.clone(), staging);

    match bulk.process_staged("for_delete/old.csv").unwrap() {
        StagedOutcome::Deleted { report, .. } => {
            assert_eq!(report.succeeded, 2);
            assert_eq!(report.failed_count, 0);
        }
        other => panic!("expected a delete batch, got {other:?}"),
    }
    assert!(matches!(
        svc.get_product(&pid("p1")),
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(
        bulk.process_staged("reports/readme.txt").unwrap(),
        StagedOutcome::Skipped { .. }
    ));
}

#[test]
fn concurrent_purchases_never_oversell() {
    let (svc, _alerts) = setup();
    let svc = Arc::new(svc);
    svc.create_product(product("hot", "2", 20)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let svc = svc.clone();
            thread::spawn(move || svc.purchase(&pid("hot"), 3))
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let sold = results.iter().filter(|r| r.is_ok()).count() as i64;
    assert_eq!(sold, 6);
    assert!(results.iter().all(|r| matches!(
        r,
        Ok(_) | Err(ServiceError::InsufficientStock { .. })
    )));

    let hot = svc.get_product(&pid("hot")).unwrap();
    assert_eq!(hot.quantity(), 2);
    assert_eq!(hot.sales_count(), 18);
    assert_eq!(ledger_sum(&svc, &pid("hot")), 2);
}

/// Ledger shared with a writer in another process: every adjustment we append
/// is preceded by a foreign consumption the engine never saw.
#[derive(Debug)]
struct RacingLedger {
    inner: InMemoryLedgerStore,
    foreign_delta: i64,
}

impl LedgerStore for RacingLedger {
    fn append(&self, movement: StockMovement) -> Result<LedgerEntry, LedgerStoreError> {
        if movement.kind == MovementKind::Adjustment {
            self.inner.append(StockMovement {
                delta: self.foreign_delta,
                remarks: "foreign writer".to_string(),
                ..movement.clone()
            })?;
        }
        self.inner.append(movement)
    }

    fn entries(&self, product_id: &ProductId) -> Result<Vec<LedgerEntry>, LedgerStoreError> {
        self.inner.entries(product_id)
    }
}

#[test]
fn racing_writer_triggers_compensation() {
    let ledger = RacingLedger {
        inner: InMemoryLedgerStore::new(),
        foreign_delta: -8,
    };
    let (svc, alerts) = setup_with_ledger(ledger);
    svc.create_product(product("p1", "1", 10)).unwrap();
    alerts.drain();

    let err = svc
        .engine()
        .apply_adjustment(&pid("p1"), -5, "shrinkage")
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NegativeStockRace {
            total_before_compensation: -3,
            ..
        }
    ));

    let ledger = svc.engine().ledger(&pid("p1")).unwrap();
    let last = ledger.last().unwrap();
    assert_eq!(last.movement.kind, MovementKind::Compensation);
    assert_eq!(last.delta(), 5);
    assert_eq!(last.movement.remarks, "Reverting invalid stock adjustment: shrinkage");

    // Only the foreign consumption remains; the cache follows the ledger.
    assert_eq!(svc.engine().compute_total(&pid("p1")).unwrap(), 2);
    let cached = svc.engine().catalog_store().get(&pid("p1")).unwrap().unwrap();
    assert_eq!(cached.quantity(), 2);
    assert!(alerts.drain().is_empty());
}

#[derive(Debug)]
struct FailingEmitter;

impl AlertEmitter for FailingEmitter {
    fn emit(&self, _kind: AlertKind, _detail: JsonValue) -> Result<(), AlertError> {
        Err(AlertError::Publish("bus unreachable".to_string()))
    }
}

#[test]
fn alert_failures_do_not_roll_back_writes() {
    let engine = ReconciliationEngine::new(
        InMemoryLedgerStore::new(),
        InMemoryCatalogStore::new(),
        FailingEmitter,
    );
    let svc = CatalogService::new(engine);

    svc.create_product(product("p1", "1", 12)).unwrap();
    let result = svc.engine().apply_adjustment(&pid("p1"), -3, "sold").unwrap();
    assert_eq!(result.new_total, 9);
    assert_eq!(svc.get_product(&pid("p1")).unwrap().quantity(), 9);
}

#[test]
fn low_inventory_sweep_emits_one_alert_per_product() {
    let (svc, alerts) = setup();
    for (id, qty) in [("a", 1), ("b", 30), ("c", 0)] {
        svc.create_product(product(id, "1", qty)).unwrap();
    }
    alerts.drain();

    let report = svc.check_low_inventory(10).unwrap();
    assert_eq!(report.products.len(), 2);
    let fired = alerts.drain();
    assert_eq!(kinds(&fired), vec![AlertKind::LowStock, AlertKind::LowStock]);
    assert_eq!(fired[0].detail()["product_id"], "a");
}

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of adjustments, accepted or not, the
        /// total equals the ledger sum and never drops below zero.
        #[test]
        fn total_equals_ledger_sum(
            opening in 0i64..50,
            deltas in prop::collection::vec(-30i64..30, 1..25),
        ) {
            let (svc, _alerts) = setup();
            svc.create_product(product("p", "1", opening)).unwrap();
            let id = pid("p");
            for delta in deltas {
                let _ = svc.engine().apply_adjustment(&id, delta, "prop");
            }
            let total = svc.engine().compute_total(&id).unwrap();
            prop_assert_eq!(total, ledger_sum(&svc, &id));
            prop_assert!(total >= 0);
        }
    }
}
