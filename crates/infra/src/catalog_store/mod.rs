//! Catalog record storage (one current record per product).

pub mod file;
pub mod in_memory;
pub mod r#trait;

pub use file::FileCatalogStore;
pub use in_memory::InMemoryCatalogStore;
pub use r#trait::{CatalogPage, CatalogStore, CatalogStoreError};
