//! Blob/staging store for bulk import and export files.

pub mod fs;
pub mod in_memory;

use std::sync::Arc;

use thiserror::Error;

pub use fs::FsBlobStore;
pub use in_memory::InMemoryBlobStore;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("staged object not found: {0}")]
    NotFound(String),

    #[error("invalid staging key: {0}")]
    InvalidKey(String),

    #[error("staging io error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

/// Keyed byte storage. Keys are `/`-separated paths such as
/// `for_create/products.csv`.
pub trait BlobStore: Send + Sync {
    fn fetch(&self, key: &str) -> Result<Vec<u8>, BlobStoreError>;

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BlobStoreError>;
}

impl<S> BlobStore for Arc<S>
where
    S: BlobStore + ?Sized,
{
    fn fetch(&self, key: &str) -> Result<Vec<u8>, BlobStoreError> {
        (**self).fetch(key)
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BlobStoreError> {
        (**self).put(key, bytes)
    }
}
