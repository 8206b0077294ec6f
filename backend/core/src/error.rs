use thiserror::Error;

/// Top-level error type for receipt handling.
///
/// Handlers and the record store return this; the gateway maps each variant
/// to a status code.
#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unsupported media: {0}")]
    UnsupportedMedia(String),

    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("corrupt store entry {key}: {reason}")]
    StoreCorruption { key: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ReceiptError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable(err.to_string())
    }

    pub fn corruption(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::StoreCorruption {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}
