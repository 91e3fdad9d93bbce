use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use stockledger_core::{Entity, ExpectedVersion, ProductId};
use stockledger_products::Product;

use super::r#trait::{CatalogPage, CatalogStore, CatalogStoreError};

/// In-memory catalog for tests/dev.
///
/// Scans run in `ProductId` order.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    records: RwLock<BTreeMap<ProductId, Product>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> CatalogStoreError {
        CatalogStoreError::Unavailable("lock poisoned".to_string())
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn get(&self, product_id: &ProductId) -> Result<Option<Product>, CatalogStoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records.get(product_id).cloned())
    }

    fn put(
        &self,
        product: Product,
        expected: ExpectedVersion,
    ) -> Result<Product, CatalogStoreError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        put_record(&mut records, product, expected)
    }

    fn delete(&self, product_id: &ProductId) -> Result<Option<Product>, CatalogStoreError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        Ok(records.remove(product_id))
    }

    fn scan_page(
        &self,
        after: Option<&ProductId>,
        limit: usize,
    ) -> Result<CatalogPage, CatalogStoreError> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(page_of(&records, after, limit))
    }
}

/// Conditional insert: checks `expected` against the stored version, then
/// stamps and stores the record.
pub(super) fn put_record(
    records: &mut BTreeMap<ProductId, Product>,
    mut product: Product,
    expected: ExpectedVersion,
) -> Result<Product, CatalogStoreError> {
    let actual = records.get(product.id()).map(Product::version);
    if !expected.matches(actual) {
        return Err(CatalogStoreError::VersionConflict {
            product_id: product.id().clone(),
            expected,
            actual,
        });
    }

    product.set_version(actual.unwrap_or(0) + 1);
    records.insert(product.id().clone(), product.clone());
    Ok(product)
}

/// Up to `limit` records after `after`, in key order.
pub(super) fn page_of(
    records: &BTreeMap<ProductId, Product>,
    after: Option<&ProductId>,
    limit: usize,
) -> CatalogPage {
    let limit = limit.max(1);
    let lower = match after {
        Some(id) => Bound::Excluded(id),
        None => Bound::Unbounded,
    };
    let mut items: Vec<Product> = records
        .range::<ProductId, _>((lower, Bound::Unbounded))
        .take(limit + 1)
        .map(|(_, p)| p.clone())
        .collect();

    let next = if items.len() > limit {
        items.truncate(limit);
        items.last().map(|p| p.id().clone())
    } else {
        None
    };

    CatalogPage { items, next }
}
