use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ReceiptError;

/// Byte-oriented key-value store the record adapter sits on.
///
/// No transactions: each call is one independent round trip.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Backend name for logs (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ReceiptError>;

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), ReceiptError>;

    /// Enumerate keys matching a glob pattern where `*` matches any run of characters.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ReceiptError>;
}

/// Trait for vision-capable inference services used by the field extractor.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider name (e.g., "openai", "gemini").
    fn name(&self) -> &str;

    /// Send one document plus instruction and return the reply text.
    async fn analyze(&self, request: &VisionRequest) -> Result<VisionResponse, VisionError>;
}

/// One inference request: an encoded document and the instruction to apply.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub instruction: String,
    /// Standard-alphabet base64 of the document bytes.
    pub document_b64: String,
    pub mime_type: String,
    pub filename: String,
    pub max_tokens: u32,
}

/// Reply from a vision provider.
#[derive(Debug, Clone)]
pub struct VisionResponse {
    pub content: String,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
}

/// Failure modes of a provider call, split by whether a retry can help.
#[derive(Debug, Clone, Error)]
pub enum VisionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl VisionError {
    /// Timeouts, connection failures, rate limiting and server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse(_) => false,
        }
    }
}
