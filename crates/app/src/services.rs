//! Explicit dependency wiring.
//!
//! Stores, the alert bus and the services built on them are constructed once
//! by [`AppServices::build`] and passed by handle; nothing is process-global.
//! The ledger and catalog live under the configured data directory, so state
//! carries over from one run to the next.

use std::sync::Arc;

use stockledger_core::ProductId;
use stockledger_events::{Alert, BusAlertEmitter, EventBus, InMemoryEventBus, Subscription};
use stockledger_infra::catalog_store::FileCatalogStore;
use stockledger_infra::ledger_store::{FileLedgerStore, LedgerEntry};
use stockledger_infra::staging::FsBlobStore;
use stockledger_infra::{
    AdjustmentResult, BulkCoordinator, CatalogService, DeletedProduct, ExportSummary, InfraConfig,
    LowInventoryReport, NewProduct, ProductUpdate, PurchaseReceipt, QueryResult,
    ReconciliationEngine, ServiceError, ServiceResult, StagedOutcome, StockStatus,
};
use stockledger_products::Product;

use crate::outcome::Outcome;

pub type AlertBus = Arc<InMemoryEventBus<Alert>>;
pub type AppEmitter = BusAlertEmitter<AlertBus>;
pub type AppCatalog = CatalogService<FileLedgerStore, FileCatalogStore, AppEmitter>;
pub type AppBulk = BulkCoordinator<FileLedgerStore, FileCatalogStore, AppEmitter, FsBlobStore>;

#[derive(Debug)]
pub struct AppServices {
    config: InfraConfig,
    bus: AlertBus,
    catalog: Arc<AppCatalog>,
    bulk: AppBulk,
}

impl AppServices {
    /// Open the stores under `config.data_dir` and wire the services.
    pub fn build(config: InfraConfig) -> ServiceResult<Self> {
        let ledger = FileLedgerStore::open(config.ledger_path())?;
        let catalog_store = FileCatalogStore::open(config.catalog_path())?;

        let bus: AlertBus = Arc::new(InMemoryEventBus::new());
        let emitter = BusAlertEmitter::new(bus.clone())
            .with_sources(config.catalog_source.clone(), config.inventory_source.clone());

        let engine = ReconciliationEngine::new(ledger, catalog_store, emitter);
        let catalog = Arc::new(CatalogService::new(engine).with_page_size(config.scan_page_size));
        let bulk = BulkCoordinator::new(catalog.clone(), FsBlobStore::new(&config.staging_dir))
            .with_prefixes(config.create_prefix.clone(), config.delete_prefix.clone());

        tracing::info!(
            data_dir = %config.data_dir.display(),
            staging_dir = %config.staging_dir.display(),
            create_prefix = %config.create_prefix,
            delete_prefix = %config.delete_prefix,
            "services initialized"
        );

        Ok(Self {
            config,
            bus,
            catalog,
            bulk,
        })
    }

    pub fn config(&self) -> &InfraConfig {
        &self.config
    }

    pub fn catalog(&self) -> &AppCatalog {
        &self.catalog
    }

    /// Receive every alert emitted from now on.
    pub fn subscribe_alerts(&self) -> Subscription<Alert> {
        self.bus.subscribe()
    }

    pub fn create_product(&self, input: NewProduct) -> Outcome<Product> {
        self.catalog.create_product(input).into()
    }

    pub fn get_product(&self, product_id: &str) -> Outcome<Product> {
        with_id(product_id, |id| self.catalog.get_product(id))
    }

    pub fn list_products(&self) -> Outcome<Vec<Product>> {
        self.catalog.list_products().into()
    }

    pub fn update_product(&self, product_id: &str, update: ProductUpdate) -> Outcome<Product> {
        with_id(product_id, |id| self.catalog.update_product(id, update))
    }

    pub fn delete_product(&self, product_id: &str) -> Outcome<DeletedProduct> {
        with_id(product_id, |id| self.catalog.delete_product(id))
    }

    pub fn purchase(&self, product_id: &str, quantity: i64) -> Outcome<PurchaseReceipt> {
        with_id(product_id, |id| self.catalog.purchase(id, quantity))
    }

    pub fn check_stock(&self, product_id: &str) -> Outcome<StockStatus> {
        with_id(product_id, |id| self.catalog.check_stock(id))
    }

    pub fn specialized_query(&self, kind: &str) -> Outcome<QueryResult> {
        self.catalog.specialized_query(kind).into()
    }

    pub fn adjust_stock(&self, product_id: &str, delta: i64, remarks: &str) -> Outcome<AdjustmentResult> {
        with_id(product_id, |id| {
            self.catalog.engine().apply_adjustment(id, delta, remarks)
        })
    }

    pub fn ledger(&self, product_id: &str) -> Outcome<Vec<LedgerEntry>> {
        with_id(product_id, |id| self.catalog.engine().ledger(id))
    }

    pub fn reconcile(&self, product_id: &str) -> Outcome<i64> {
        with_id(product_id, |id| self.catalog.engine().reconcile(id))
    }

    pub fn process_staged(&self, key: &str) -> Outcome<StagedOutcome> {
        self.bulk.process_staged(key).into()
    }

    /// Export to `key`, or to the configured export key.
    pub fn export_catalog(&self, key: Option<&str>) -> Outcome<ExportSummary> {
        let key = key.unwrap_or(self.config.export_key.as_str());
        self.bulk.export_catalog(key).into()
    }

    /// Low-inventory sweep at the configured threshold.
    pub fn check_low_inventory(&self) -> Outcome<LowInventoryReport> {
        self.catalog
            .check_low_inventory(self.config.low_inventory_threshold)
            .into()
    }

    /// Release the services. Alerts still queued on live subscriptions stay
    /// readable.
    pub fn shutdown(self) {
        let products = self.catalog.list_products().map(|p| p.len()).unwrap_or(0);
        tracing::info!(products, "services shut down");
    }
}

fn with_id<T>(raw: &str, f: impl FnOnce(&ProductId) -> ServiceResult<T>) -> Outcome<T> {
    ProductId::parse(raw)
        .map_err(ServiceError::from)
        .and_then(|id| f(&id))
        .into()
}
