use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use stockledger_core::{ExpectedVersion, ProductId};
use stockledger_products::Product;

/// One page of a catalog scan.
///
/// `next` is the continuation cursor: pass it as `after` to fetch the
/// following page. `None` means the scan is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPage {
    pub items: Vec<Product>,
    pub next: Option<ProductId>,
}

#[derive(Debug, Error)]
pub enum CatalogStoreError {
    #[error("version conflict on {product_id} (expected: {expected:?}, actual: {actual:?})")]
    VersionConflict {
        product_id: ProductId,
        expected: ExpectedVersion,
        actual: Option<u64>,
    },

    #[error("catalog store unavailable: {0}")]
    Unavailable(String),

    #[error("catalog file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog file {} is unreadable: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },
}

/// Keyed store of current product records.
///
/// `put` is a conditional write: the stored version must satisfy `expected`.
/// On success the store stamps the record with the next version (previous + 1,
/// or 1 for a new record) and returns it.
///
/// Scans iterate in a stable key order; `scan_page` supports continuation so
/// large catalogs never have to be materialized by one call.
pub trait CatalogStore: Send + Sync {
    fn get(&self, product_id: &ProductId) -> Result<Option<Product>, CatalogStoreError>;

    fn put(
        &self,
        product: Product,
        expected: ExpectedVersion,
    ) -> Result<Product, CatalogStoreError>;

    /// Returns the removed record, or `None` if nothing was stored.
    fn delete(&self, product_id: &ProductId) -> Result<Option<Product>, CatalogStoreError>;

    fn scan_page(
        &self,
        after: Option<&ProductId>,
        limit: usize,
    ) -> Result<CatalogPage, CatalogStoreError>;

    /// Follow continuations until the scan completes.
    fn scan_all(&self, page_size: usize) -> Result<Vec<Product>, CatalogStoreError> {
        let mut products = Vec::new();
        let mut cursor: Option<ProductId> = None;
        loop {
            let page = self.scan_page(cursor.as_ref(), page_size)?;
            products.extend(page.items);
            match page.next {
                Some(next) => cursor = Some(next),
                None => return Ok(products),
            }
        }
    }
}

impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    fn get(&self, product_id: &ProductId) -> Result<Option<Product>, CatalogStoreError> {
        (**self).get(product_id)
    }

    fn put(
        &self,
        product: Product,
        expected: ExpectedVersion,
    ) -> Result<Product, CatalogStoreError> {
        (**self).put(product, expected)
    }

    fn delete(&self, product_id: &ProductId) -> Result<Option<Product>, CatalogStoreError> {
        (**self).delete(product_id)
    }

    fn scan_page(
        &self,
        after: Option<&ProductId>,
        limit: usize,
    ) -> Result<CatalogPage, CatalogStoreError> {
        (**self).scan_page(after, limit)
    }
}
