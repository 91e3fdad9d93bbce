use std::collections::HashMap;
use std::sync::RwLock;

use super::{BlobStore, BlobStoreError};

#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

fn poisoned(key: &str) -> BlobStoreError {
    BlobStoreError::Io {
        key: key.to_string(),
        source: std::io::Error::other("lock poisoned"),
    }
}

impl BlobStore for InMemoryBlobStore {
    fn fetch(&self, key: &str) -> Result<Vec<u8>, BlobStoreError> {
        let objects = self
            .objects
            .read()
            .map_err(|_| poisoned(key))?;
        objects
            .get(key)
            .cloned()
            .ok_or_else(|| BlobStoreError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BlobStoreError> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| poisoned(key))?;
        objects.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
