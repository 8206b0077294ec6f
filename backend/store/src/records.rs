use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use receiptforge_core::{KvStore, ReceiptError, ReceiptRecord};
use receiptforge_logging::{ReceiptEvent, ReceiptEventLogger};
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

const DATA_PATTERN: &str = "receipt:*:data";

/// Metadata key for a record.
pub fn data_key(id: &Uuid) -> String {
    format!("receipt:{id}:data")
}

/// File payload key for a record.
pub fn file_key(id: &Uuid) -> String {
    format!("receipt:{id}:file")
}

/// An entry that was enumerated but could not be decoded.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntry {
    pub key: String,
    pub reason: String,
}

/// Result of enumerating every record.
#[derive(Debug, Clone, Default)]
pub struct RecordListing {
    /// Newest first.
    pub records: Vec<ReceiptRecord>,
    pub skipped: Vec<SkippedEntry>,
}

/// Record Store Adapter: receipts over an untyped key-value backend.
///
/// Metadata is JSON under `receipt:{id}:data`, file bytes are base64 under
/// `receipt:{id}:file`. The two writes are independent.
#[derive(Clone)]
pub struct RecordStore {
    kv: Arc<dyn KvStore>,
}

impl RecordStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn backend(&self) -> &str {
        self.kv.name()
    }

    /// Persist a record and, if given, its file payload.
    #[instrument(skip_all, fields(receipt_id = %record.id))]
    pub async fn put(
        &self,
        record: &ReceiptRecord,
        file_bytes: Option<&[u8]>,
    ) -> Result<(), ReceiptError> {
        let metadata = serde_json::to_vec(record)
            .map_err(|e| ReceiptError::corruption(data_key(&record.id), e))?;
        self.kv.set(&data_key(&record.id), &metadata).await?;

        if let Some(bytes) = file_bytes {
            let encoded = STANDARD.encode(bytes);
            self.kv
                .set(&file_key(&record.id), encoded.as_bytes())
                .await?;
        }

        debug!(
            size_bytes = file_bytes.map(<[u8]>::len).unwrap_or(0),
            "Receipt persisted"
        );
        Ok(())
    }

    /// Enumerate and decode every record.
    ///
    /// Undecodable entries are collected in `skipped` and reported as
    /// `record_skipped` events; they never fail the listing.
    pub async fn list(&self) -> Result<RecordListing, ReceiptError> {
        let keys = self.kv.keys(DATA_PATTERN).await?;
        let mut listing = RecordListing::default();

        for key in keys {
            // Keys can vanish between enumeration and read only if the
            // backend is shared with another writer; treat that as absent.
            let Some(raw) = self.kv.get(&key).await? else {
                continue;
            };
            match serde_json::from_slice::<ReceiptRecord>(&raw) {
                Ok(record) => listing.records.push(record),
                Err(e) => {
                    let skipped = SkippedEntry {
                        key: key.clone(),
                        reason: e.to_string(),
                    };
                    ReceiptEventLogger::log_event(ReceiptEvent::RecordSkipped {
                        key,
                        reason: skipped.reason.clone(),
                    });
                    listing.skipped.push(skipped);
                }
            }
        }

        listing
            .records
            .sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(listing)
    }

    /// Metadata only.
    pub async fn get_record(&self, id: &Uuid) -> Result<Option<ReceiptRecord>, ReceiptError> {
        let key = data_key(id);
        match self.kv.get(&key).await? {
            Some(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| ReceiptError::corruption(key, e)),
            None => Ok(None),
        }
    }

    /// Record and file bytes, or `None` when either half is missing.
    pub async fn get(&self, id: &Uuid) -> Result<Option<(ReceiptRecord, Vec<u8>)>, ReceiptError> {
        let key = file_key(id);
        let Some(encoded) = self.kv.get(&key).await? else {
            return Ok(None);
        };
        let Some(record) = self.get_record(id).await? else {
            return Ok(None);
        };
        let bytes = STANDARD
            .decode(&encoded)
            .map_err(|e| ReceiptError::corruption(key, e))?;
        Ok(Some((record, bytes)))
    }
}
