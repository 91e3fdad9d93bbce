//! Configuration loading and representation.

use std::path::PathBuf;
use std::str::FromStr;

use stockledger_events::emitter::{DEFAULT_CATALOG_SOURCE, DEFAULT_INVENTORY_SOURCE};

pub const DEFAULT_CREATE_PREFIX: &str = "for_create/";
pub const DEFAULT_DELETE_PREFIX: &str = "for_delete/";
pub const DEFAULT_EXPORT_KEY: &str = "exports/products.csv";
pub const DEFAULT_SCAN_PAGE_SIZE: usize = 100;
pub const DEFAULT_LOW_INVENTORY_THRESHOLD: i64 = 10;
pub const DEFAULT_STAGING_DIR: &str = "staging";
pub const DEFAULT_DATA_DIR: &str = "data";

const LEDGER_FILE: &str = "ledger.jsonl";
const CATALOG_FILE: &str = "catalog.json";

/// Runtime settings for the stores, bulk coordinator and alert sources.
///
/// Read from `STOCKLEDGER_*` environment variables:
///
/// | variable | default |
/// |---|---|
/// | `STOCKLEDGER_CREATE_PREFIX` | `for_create/` |
/// | `STOCKLEDGER_DELETE_PREFIX` | `for_delete/` |
/// | `STOCKLEDGER_EXPORT_KEY` | `exports/products.csv` |
/// | `STOCKLEDGER_SCAN_PAGE_SIZE` | `100` |
/// | `STOCKLEDGER_LOW_INVENTORY_THRESHOLD` | `10` |
/// | `STOCKLEDGER_CATALOG_SOURCE` | `stockledger.catalog` |
/// | `STOCKLEDGER_INVENTORY_SOURCE` | `stockledger.inventory` |
/// | `STOCKLEDGER_STAGING_DIR` | `staging` |
/// | `STOCKLEDGER_DATA_DIR` | `data` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraConfig {
    pub create_prefix: String,
    pub delete_prefix: String,
    pub export_key: String,
    pub scan_page_size: usize,
    pub low_inventory_threshold: i64,
    pub catalog_source: String,
    pub inventory_source: String,
    pub staging_dir: PathBuf,
    /// Holds the ledger and catalog files.
    pub data_dir: PathBuf,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            create_prefix: DEFAULT_CREATE_PREFIX.to_string(),
            delete_prefix: DEFAULT_DELETE_PREFIX.to_string(),
            export_key: DEFAULT_EXPORT_KEY.to_string(),
            scan_page_size: DEFAULT_SCAN_PAGE_SIZE,
            low_inventory_threshold: DEFAULT_LOW_INVENTORY_THRESHOLD,
            catalog_source: DEFAULT_CATALOG_SOURCE.to_string(),
            inventory_source: DEFAULT_INVENTORY_SOURCE.to_string(),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl InfraConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Unset or blank variables keep
    /// their defaults; unparsable numbers are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let scan_page_size = parse_or(
            "STOCKLEDGER_SCAN_PAGE_SIZE",
            var("STOCKLEDGER_SCAN_PAGE_SIZE"),
            defaults.scan_page_size,
        )
        .max(1);

        Self {
            create_prefix: var("STOCKLEDGER_CREATE_PREFIX").unwrap_or(defaults.create_prefix),
            delete_prefix: var("STOCKLEDGER_DELETE_PREFIX").unwrap_or(defaults.delete_prefix),
            export_key: var("STOCKLEDGER_EXPORT_KEY").unwrap_or(defaults.export_key),
            scan_page_size,
            low_inventory_threshold: parse_or(
                "STOCKLEDGER_LOW_INVENTORY_THRESHOLD",
                var("STOCKLEDGER_LOW_INVENTORY_THRESHOLD"),
                defaults.low_inventory_threshold,
            ),
            catalog_source: var("STOCKLEDGER_CATALOG_SOURCE").unwrap_or(defaults.catalog_source),
            inventory_source: var("STOCKLEDGER_INVENTORY_SOURCE")
                .unwrap_or(defaults.inventory_source),
            staging_dir: var("STOCKLEDGER_STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            data_dir: var("STOCKLEDGER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(CATALOG_FILE)
    }
}

fn parse_or<T: FromStr + Copy>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, "invalid numeric setting; using default");
            default
        }),
    }
}
