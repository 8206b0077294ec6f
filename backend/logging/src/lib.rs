//! Telemetry and structured logging for receiptforge.
//!
//! Handles log redaction, console and rolling JSON output, and receipt lifecycle events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{ReceiptEvent, ReceiptEventEntry, ReceiptEventLogger};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
