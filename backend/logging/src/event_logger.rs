//! Receipt Event Logger
//!
//! Lifecycle events (stored, degraded, rejected, skipped) emitted on the
//! `receipt_events` tracing target so they land in the NDJSON log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReceiptEvent {
    ReceiptStored {
        receipt_id: String,
        filename: String,
        size_bytes: usize,
        extraction: String,
    },
    ExtractionDegraded {
        receipt_id: String,
        reason: String,
    },
    UploadRejected {
        reason: String,
    },
    RecordSkipped {
        key: String,
        reason: String,
    },
}

impl ReceiptEvent {
    fn is_warning(&self) -> bool {
        !matches!(self, Self::ReceiptStored { .. })
    }

    fn redact(&mut self) {
        match self {
            Self::ExtractionDegraded { reason, .. }
            | Self::UploadRejected { reason }
            | Self::RecordSkipped { reason, .. } => {
                *reason = redact_sensitive_data(reason);
            }
            Self::ReceiptStored { .. } => {}
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReceiptEventEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: ReceiptEvent,
}

pub struct ReceiptEventLogger;

impl ReceiptEventLogger {
    /// Redacts the event and hands it to the tracing system as one JSON line.
    pub fn log_event(mut event: ReceiptEvent) -> ReceiptEventEntry {
        event.redact();
        let warning = event.is_warning();
        let entry = ReceiptEventEntry {
            timestamp: Utc::now(),
            event,
        };
        let json = serde_json::to_string(&entry).unwrap_or_default();
        if warning {
            warn!(target: "receipt_events", event = %json, "Receipt event");
        } else {
            info!(target: "receipt_events", event = %json, "Receipt event");
        }
        entry
    }
}
