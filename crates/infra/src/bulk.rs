//! Bulk import/export over staged delimited files.
//!
//! One bad record never fails a batch: each item is attempted on its own and
//! failures are reported next to the offending record.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use stockledger_core::ProductId;
use stockledger_events::AlertEmitter;
use stockledger_products::Price;

use crate::catalog::{CatalogService, NewProduct};
use crate::catalog_store::CatalogStore;
use crate::config::{DEFAULT_CREATE_PREFIX, DEFAULT_DELETE_PREFIX};
use crate::delimited::{self, Record};
use crate::error::{ServiceError, ServiceResult};
use crate::ledger_store::LedgerStore;
use crate::staging::BlobStore;

/// Columns of an exported catalog file. Import reads the first four.
pub const EXPORT_COLUMNS: [&str; 5] = [
    "product_id",
    "product_name",
    "quantity",
    "price",
    "sales_count",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub record: Record,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed_count: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    fn success(&mut self) {
        self.succeeded += 1;
    }

    fn failure(&mut self, record: Record, error: impl ToString) {
        self.failed_count += 1;
        self.failures.push(BatchFailure {
            record,
            error: error.to_string(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StagedOutcome {
    Created { key: String, report: BatchReport },
    Deleted { key: String, report: BatchReport },
    /// Key outside the create/delete partitions; nothing was read.
    Skipped { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub key: String,
    pub products: usize,
}

#[derive(Debug)]
pub struct BulkCoordinator<L, C, A, B> {
    catalog: Arc<CatalogService<L, C, A>>,
    staging: B,
    create_prefix: String,
    delete_prefix: String,
}

impl<L, C, A, B> BulkCoordinator<L, C, A, B> {
    pub fn new(catalog: Arc<CatalogService<L, C, A>>, staging: B) -> Self {
        Self {
            catalog,
            staging,
            create_prefix: DEFAULT_CREATE_PREFIX.to_string(),
            delete_prefix: DEFAULT_DELETE_PREFIX.to_string(),
        }
    }

    pub fn with_prefixes(
        mut self,
        create_prefix: impl Into<String>,
        delete_prefix: impl Into<String>,
    ) -> Self {
        self.create_prefix = create_prefix.into();
        self.delete_prefix = delete_prefix.into();
        self
    }

    pub fn staging(&self) -> &B {
        &self.staging
    }
}

impl<L, C, A, B> BulkCoordinator<L, C, A, B>
where
    L: LedgerStore,
    C: CatalogStore,
    A: AlertEmitter,
    B: BlobStore,
{
    pub fn batch_create(&self, records: Vec<Record>) -> BatchReport {
        let mut report = BatchReport::default();
        for record in records {
            let created = new_product_from(&record).and_then(|p| self.catalog.create_product(p));
            match created {
                Ok(_) => report.success(),
                Err(err) => {
                    tracing::warn!(error = %err, "batch create: record rejected");
                    report.failure(record, err);
                }
            }
        }
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed_count,
            "batch create finished"
        );
        report
    }

    /// Delete each id; ids that are already gone count as deleted.
    pub fn batch_delete<I, K>(&self, keys: I) -> BatchReport
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut report = BatchReport::default();
        for key in keys {
            let raw = key.as_ref();
            let deleted = ProductId::parse(raw)
                .map_err(ServiceError::from)
                .and_then(|id| self.catalog.delete_product(&id));
            match deleted {
                Ok(_) | Err(ServiceError::NotFound(_)) => report.success(),
                Err(err) => {
                    tracing::warn!(product_id = raw, error = %err, "batch delete: key rejected");
                    report.failure(Record::from([("product_id".to_string(), raw.to_string())]), err);
                }
            }
        }
        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed_count,
            "batch delete finished"
        );
        report
    }

    /// Route a newly staged file by its key prefix.
    pub fn process_staged(&self, key: &str) -> ServiceResult<StagedOutcome> {
        if key.starts_with(&self.create_prefix) {
            let records = self.fetch_records(key)?;
            let report = self.batch_create(records);
            return Ok(StagedOutcome::Created {
                key: key.to_string(),
                report,
            });
        }

        if key.starts_with(&self.delete_prefix) {
            let mut report = BatchReport::default();
            let mut ids = Vec::new();
            for record in self.fetch_records(key)? {
                match record.get("product_id").filter(|v| !v.trim().is_empty()) {
                    Some(id) => ids.push(id.clone()),
                    None => report.failure(record, "missing field product_id"),
                }
            }
            let deleted = self.batch_delete(ids);
            report.succeeded += deleted.succeeded;
            report.failed_count += deleted.failed_count;
            report.failures.extend(deleted.failures);
            return Ok(StagedOutcome::Deleted {
                key: key.to_string(),
                report,
            });
        }

        tracing::debug!(key, "staged key outside import partitions; skipped");
        Ok(StagedOutcome::Skipped {
            key: key.to_string(),
        })
    }

    /// Write the whole catalog as a delimited file under `key`.
    pub fn export_catalog(&self, key: &str) -> ServiceResult<ExportSummary> {
        let products = self.catalog.list_products()?;
        let rows = products.iter().map(|p| {
            vec![
                p.product_id().to_string(),
                p.product_name().to_string(),
                p.quantity().to_string(),
                p.price().to_string(),
                p.sales_count().to_string(),
            ]
        });
        let body = delimited::write(&EXPORT_COLUMNS, rows);
        self.staging.put(key, body.as_bytes())?;

        tracing::info!(key, products = products.len(), "catalog exported");
        Ok(ExportSummary {
            key: key.to_string(),
            products: products.len(),
        })
    }

    fn fetch_records(&self, key: &str) -> ServiceResult<Vec<Record>> {
        let bytes = self.staging.fetch(key)?;
        Ok(delimited::parse_bytes(&bytes)?)
    }
}

fn new_product_from(record: &Record) -> ServiceResult<NewProduct> {
    let field = |name: &str| {
        record
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ServiceError::InvalidArgument(format!("missing field {name}")))
    };

    let quantity = field("quantity")?;
    let quantity = quantity
        .parse::<i64>()
        .map_err(|_| ServiceError::InvalidArgument(format!("quantity {quantity:?} is not an integer")))?;

    Ok(NewProduct {
        product_id: field("product_id")?.to_string(),
        product_name: field("product_name")?.to_string(),
        price: Price::parse(field("price")?)?,
        quantity,
    })
}
