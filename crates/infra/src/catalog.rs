//! Catalog operations: product lifecycle, purchases and catalog queries.
//!
//! Quantity-affecting work is delegated to the [`ReconciliationEngine`];
//! this layer validates input, shapes results and emits catalog alerts.

use serde::{Deserialize, Serialize};

use stockledger_core::ProductId;
use stockledger_events::{AlertEmitter, AlertKind};
use stockledger_inventory::Availability;
use stockledger_products::{select_extremum, Extrema, Price, Product, SpecializedQuery};

use crate::alerts;
use crate::catalog_store::CatalogStore;
use crate::config::DEFAULT_SCAN_PAGE_SIZE;
use crate::error::{ServiceError, ServiceResult};
use crate::ledger_store::LedgerStore;
use crate::reconciliation::{PurchaseReceipt, ReconciliationEngine};

/// Input for `create_product`. Fields arrive as the caller supplied them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub product_id: String,
    pub product_name: String,
    pub price: Price,
    pub quantity: i64,
}

/// Input for `update_product`: the full set of mutable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub product_name: String,
    pub quantity: i64,
    pub price: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedProduct {
    pub product_id: ProductId,
    pub product_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockStatus {
    pub product_id: ProductId,
    pub product_name: String,
    pub current_stock: i64,
    pub price: Price,
    pub availability: Availability,
}

/// Result of `specialized_query`: one extremum, or all five.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResult {
    Single(Product),
    All(Box<Extrema>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowInventoryReport {
    pub threshold: i64,
    pub products: Vec<Product>,
}

#[derive(Debug)]
pub struct CatalogService<L, C, A> {
    engine: ReconciliationEngine<L, C, A>,
    page_size: usize,
}

impl<L, C, A> CatalogService<L, C, A> {
    pub fn new(engine: ReconciliationEngine<L, C, A>) -> Self {
        Self {
            engine,
            page_size: DEFAULT_SCAN_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn engine(&self) -> &ReconciliationEngine<L, C, A> {
        &self.engine
    }
}

impl<L, C, A> CatalogService<L, C, A>
where
    L: LedgerStore,
    C: CatalogStore,
    A: AlertEmitter,
{
    pub fn create_product(&self, input: NewProduct) -> ServiceResult<Product> {
        let product_id = ProductId::parse(&input.product_id)?;
        let product = Product::new(product_id, input.product_name, input.price, input.quantity)?;

        let stored = self.engine.register(product)?;
        alerts::emit_best_effort(
            self.engine.alerts(),
            AlertKind::ProductCreated,
            alerts::product_snapshot(&stored),
        );
        Ok(stored)
    }

    /// The record with its quantity taken from the ledger.
    pub fn get_product(&self, product_id: &ProductId) -> ServiceResult<Product> {
        let product = self
            .engine
            .catalog_store()
            .get(product_id)?
            .ok_or_else(|| ServiceError::product_not_found(product_id))?;
        let total = self.engine.compute_total(product_id)?;
        tracing::debug!(product_id = %product_id, total, "product read");
        Ok(product.with_quantity(total))
    }

    /// Every product with cached quantities, in storage order.
    pub fn list_products(&self) -> ServiceResult<Vec<Product>> {
        Ok(self.engine.catalog_store().scan_all(self.page_size)?)
    }

    /// Overwrite name and price; the quantity change is posted to the ledger
    /// as a correction so the cached quantity stays derivable.
    pub fn update_product(
        &self,
        product_id: &ProductId,
        update: ProductUpdate,
    ) -> ServiceResult<Product> {
        let ProductUpdate {
            product_name,
            quantity,
            price,
        } = update;

        let updated = self.engine.apply_correction(product_id, quantity, |p| {
            p.rename(product_name.as_str())?;
            p.reprice(price);
            Ok(())
        })?;

        alerts::emit_best_effort(
            self.engine.alerts(),
            AlertKind::ProductUpdated,
            alerts::product_snapshot(&updated),
        );
        Ok(updated)
    }

    pub fn delete_product(&self, product_id: &ProductId) -> ServiceResult<DeletedProduct> {
        let removed = self.engine.unregister(product_id)?;
        Ok(DeletedProduct {
            product_id: removed.product_id().clone(),
            product_name: removed.product_name().to_string(),
        })
    }

    pub fn purchase(&self, product_id: &ProductId, quantity: i64) -> ServiceResult<PurchaseReceipt> {
        if quantity <= 0 {
            return Err(ServiceError::InvalidArgument(
                "purchase quantity must be positive".to_string(),
            ));
        }
        self.engine.apply_purchase(product_id, quantity)
    }

    pub fn check_stock(&self, product_id: &ProductId) -> ServiceResult<StockStatus> {
        let product = self.get_product(product_id)?;
        Ok(StockStatus {
            product_id: product.product_id().clone(),
            product_name: product.product_name().to_string(),
            current_stock: product.quantity(),
            price: product.price(),
            availability: Availability::classify(product.quantity()),
        })
    }

    /// Extremum by price, stock or sales; `all` returns all five at once.
    pub fn specialized_query(&self, kind: &str) -> ServiceResult<QueryResult> {
        let scope = SpecializedQuery::parse_scope(kind)?;
        let products = self.list_products()?;
        if products.is_empty() {
            return Err(ServiceError::NotFound("no products in catalog".to_string()));
        }

        let result = match scope {
            Some(kind) => select_extremum(&products, kind)
                .cloned()
                .map(QueryResult::Single),
            None => Extrema::from_products(&products).map(|e| QueryResult::All(Box::new(e))),
        };
        result.ok_or_else(|| ServiceError::NotFound("no products in catalog".to_string()))
    }

    /// Sweep the catalog for products under `threshold` and raise one
    /// low-stock alert per match.
    pub fn check_low_inventory(&self, threshold: i64) -> ServiceResult<LowInventoryReport> {
        let products: Vec<Product> = self
            .list_products()?
            .into_iter()
            .filter(|p| p.quantity() < threshold)
            .collect();

        for product in &products {
            alerts::emit_best_effort(
                self.engine.alerts(),
                AlertKind::LowStock,
                alerts::low_stock(product, product.quantity(), threshold),
            );
        }
        tracing::info!(threshold, flagged = products.len(), "low inventory sweep finished");

        Ok(LowInventoryReport {
            threshold,
            products,
        })
    }
}
