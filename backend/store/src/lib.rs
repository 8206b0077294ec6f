//! Receipt persistence.
//!
//! `RecordStore` owns the key layout (`receipt:{id}:data`, `receipt:{id}:file`);
//! the `KvStore` backends only move bytes.

pub mod memory;
pub mod records;
pub mod sqlite;

use std::sync::Arc;

use receiptforge_core::{KvStore, ReceiptError};
use tracing::info;

pub use memory::InMemoryKvStore;
pub use records::{RecordListing, RecordStore, SkippedEntry, data_key, file_key};
pub use sqlite::SqliteKvStore;

/// Open a key-value backend from a store URL.
///
/// `memory://` gives a process-local map, `sqlite://<path>` (or a bare path)
/// a SQLite file, `sqlite::memory:` an in-memory SQLite database.
pub fn open_store(url: &str) -> Result<Arc<dyn KvStore>, ReceiptError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ReceiptError::Config("store URL is empty".into()));
    }

    let store: Arc<dyn KvStore> = if url == "memory://" || url == "memory" {
        Arc::new(InMemoryKvStore::new())
    } else if url == "sqlite::memory:" {
        Arc::new(SqliteKvStore::in_memory()?)
    } else if let Some(path) = url.strip_prefix("sqlite://") {
        if path.is_empty() {
            return Err(ReceiptError::Config("sqlite store URL has no path".into()));
        }
        Arc::new(SqliteKvStore::open(path)?)
    } else if url.contains("://") {
        return Err(ReceiptError::Config(format!(
            "unsupported store URL: {url} (supported: sqlite://<path>, sqlite::memory:, memory://)"
        )));
    } else {
        Arc::new(SqliteKvStore::open(url)?)
    };

    info!(backend = store.name(), "Key-value store opened");
    Ok(store)
}
