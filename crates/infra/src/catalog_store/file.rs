use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use stockledger_core::{Entity, ExpectedVersion, ProductId};
use stockledger_products::Product;

use super::in_memory::{page_of, put_record};
use super::r#trait::{CatalogPage, CatalogStore, CatalogStoreError};

/// Catalog kept as a JSON snapshot file.
///
/// Every write replaces the snapshot atomically (temp file, sync, rename) and
/// only then becomes visible to readers. Scans run in `ProductId` order.
#[derive(Debug)]
pub struct FileCatalogStore {
    path: PathBuf,
    records: RwLock<BTreeMap<ProductId, Product>>,
}

impl FileCatalogStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CatalogStoreError> {
        let path = path.into();
        let records = load(&path)?;
        tracing::info!(
            path = %path.display(),
            products = records.len(),
            "catalog file opened"
        );
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn poisoned() -> CatalogStoreError {
        CatalogStoreError::Unavailable("lock poisoned".to_string())
    }

    fn persist(&self, records: &BTreeMap<ProductId, Product>) -> Result<(), CatalogStoreError> {
        let products: Vec<&Product> = records.values().collect();
        let body = serde_json::to_vec_pretty(&products).map_err(|err| CatalogStoreError::Corrupt {
            path: self.path.clone(),
            reason: err.to_string(),
        })?;

        let io_err = |source| io_error(&self.path, source);
        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path).map_err(io_err)?;
        file.write_all(&body).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        fs::rename(&temp_path, &self.path).map_err(io_err)
    }
}

impl CatalogStore for FileCatalogStore {
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
        let mut next = records.clone();
        let stored = put_record(&mut next, product, expected)?;
        self.persist(&next)?;
        *records = next;
        Ok(stored)
    }

    fn delete(&self, product_id: &ProductId) -> Result<Option<Product>, CatalogStoreError> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        if !records.contains_key(product_id) {
            return Ok(None);
        }
        let mut next = records.clone();
        let removed = next.remove(product_id);
        self.persist(&next)?;
        *records = next;
        Ok(removed)
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

fn io_error(path: &Path, source: std::io::Error) -> CatalogStoreError {
    CatalogStoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn load(path: &Path) -> Result<BTreeMap<ProductId, Product>, CatalogStoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| io_error(path, source))?;
    }
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(err) => return Err(io_error(path, err)),
    };

    let corrupt = |reason: String| CatalogStoreError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };
    let products: Vec<Product> =
        serde_json::from_slice(&bytes).map_err(|err| corrupt(err.to_string()))?;

    let mut records = BTreeMap::new();
    for product in products {
        let id = product.id().clone();
        if records.insert(id.clone(), product).is_some() {
            return Err(corrupt(format!("duplicate product {id}")));
        }
    }
    Ok(records)
}
