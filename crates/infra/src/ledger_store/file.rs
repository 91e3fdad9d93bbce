use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use stockledger_core::ProductId;
use stockledger_inventory::StockMovement;

use super::in_memory::{log_append, next_entry, validate_append};
use super::r#trait::{LedgerEntry, LedgerStore, LedgerStoreError};

/// Ledger persisted as one JSON line per entry.
///
/// Each append is written and synced before the entry becomes visible. The
/// file is read once at open; afterwards this process owns it.
#[derive(Debug)]
pub struct FileLedgerStore {
    path: PathBuf,
    ledgers: Mutex<HashMap<ProductId, Vec<LedgerEntry>>>,
}

impl FileLedgerStore {
    /// Open (or create) the ledger file at `path` and load its history.
    ///
    /// A trailing line without a newline is an append that never finished; it
    /// is cut off. Any other unreadable line fails the open.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerStoreError> {
        let path = path.into();
        let ledgers = load(&path)?;
        tracing::info!(
            path = %path.display(),
            products = ledgers.len(),
            "ledger file opened"
        );
        Ok(Self {
            path,
            ledgers: Mutex::new(ledgers),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&self, entry: &LedgerEntry) -> Result<(), LedgerStoreError> {
        let mut line = serde_json::to_string(entry)
            .map_err(|err| LedgerStoreError::InvalidAppend(err.to_string()))?;
        line.push('\n');

        let io_err = |source| io_error(&self.path, source);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)
    }
}

impl LedgerStore for FileLedgerStore {
    fn append(&self, movement: StockMovement) -> Result<LedgerEntry, LedgerStoreError> {
        validate_append(&movement)?;

        let mut ledgers = self
            .ledgers
            .lock()
            .map_err(|_| LedgerStoreError::Unavailable("lock poisoned".to_string()))?;

        let ledger = ledgers.entry(movement.product_id.clone()).or_default();
        let entry = next_entry(ledger, movement);
        self.write_line(&entry)?;
        ledger.push(entry.clone());
        log_append(&entry);

        Ok(entry)
    }

    fn entries(&self, product_id: &ProductId) -> Result<Vec<LedgerEntry>, LedgerStoreError> {
        let ledgers = self
            .ledgers
            .lock()
            .map_err(|_| LedgerStoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(ledgers.get(product_id).cloned().unwrap_or_default())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> LedgerStoreError {
    LedgerStoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn corrupt(path: &Path, line: usize, reason: impl Into<String>) -> LedgerStoreError {
    LedgerStoreError::Corrupt {
        path: path.to_path_buf(),
        line,
        reason: reason.into(),
    }
}

fn load(path: &Path) -> Result<HashMap<ProductId, Vec<LedgerEntry>>, LedgerStoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| io_error(path, source))?;
    }
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(err) => return Err(io_error(path, err)),
    };

    let mut ledgers: HashMap<ProductId, Vec<LedgerEntry>> = HashMap::new();
    let mut complete_len = 0;
    for (index, line) in text.split_inclusive('\n').enumerate() {
        let line_no = index + 1;
        if !line.ends_with('\n') {
            tracing::warn!(path = %path.display(), line = line_no, "dropping unfinished ledger line");
            OpenOptions::new()
                .write(true)
                .open(path)
                .and_then(|file| file.set_len(complete_len as u64))
                .map_err(|source| io_error(path, source))?;
            break;
        }
        complete_len += line.len();
        if line.trim().is_empty() {
            continue;
        }

        let entry: LedgerEntry =
            serde_json::from_str(line).map_err(|err| corrupt(path, line_no, err.to_string()))?;
        let ledger = ledgers.entry(entry.product_id().clone()).or_default();
        let expected = ledger.last().map(|e| e.sequence_number).unwrap_or(0) + 1;
        if entry.sequence_number != expected {
            return Err(corrupt(
                path,
                line_no,
                format!(
                    "sequence number {} out of order (expected {expected})",
                    entry.sequence_number
                ),
            ));
        }
        ledger.push(entry);
    }
    Ok(ledgers)
}
