use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use receiptforge_core::{
    ExtractionOutcome, ReceiptError, ReceiptFields, VisionError, VisionProvider, VisionRequest,
};
use receiptforge_logging::redact_sensitive_data;
use tracing::{debug, info, warn};

use crate::json_scan::parse_reply;
use crate::prompt::{DEFAULT_MAX_TOKENS, EXTRACTION_PROMPT};
use crate::retry::RetryPolicy;

/// Fields recovered from one document and how they were obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub fields: ReceiptFields,
    pub outcome: ExtractionOutcome,
}

impl Extraction {
    /// Empty fields, recording why the inference call failed.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            fields: ReceiptFields::default(),
            outcome: ExtractionOutcome::Failed {
                reason: reason.into(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Bound on each provider attempt.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub max_tokens: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Sends receipt bytes to a vision provider and parses the reply.
pub struct FieldExtractor {
    provider: Arc<dyn VisionProvider>,
    config: ExtractorConfig,
}

impl FieldExtractor {
    pub fn new(provider: Arc<dyn VisionProvider>) -> Self {
        Self {
            provider,
            config: ExtractorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Extract fields from a document.
    ///
    /// A reply without JSON is not an error (see [`parse_reply`]); empty
    /// input, empty replies and provider failures after retries are
    /// `ExtractionFailed`.
    pub async fn extract(
        &self,
        bytes: &[u8],
        mime_type: &str,
        filename: &str,
    ) -> Result<Extraction, ReceiptError> {
        if bytes.is_empty() {
            return Err(ReceiptError::ExtractionFailed("document is empty".into()));
        }

        let request = VisionRequest {
            instruction: EXTRACTION_PROMPT.to_string(),
            document_b64: STANDARD.encode(bytes),
            mime_type: mime_type.to_string(),
            filename: filename.to_string(),
            max_tokens: self.config.max_tokens,
        };

        let reply = self.call_with_retry(&request).await.map_err(|e| {
            ReceiptError::ExtractionFailed(redact_sensitive_data(&e.to_string()))
        })?;

        if reply.trim().is_empty() {
            return Err(ReceiptError::ExtractionFailed(
                "provider returned an empty reply".into(),
            ));
        }

        let extraction = parse_reply(&reply);
        info!(
            provider = self.provider.name(),
            outcome = %extraction.outcome,
            "Receipt fields extracted"
        );
        Ok(extraction)
    }

    async fn call_with_retry(&self, request: &VisionRequest) -> Result<String, VisionError> {
        let policy = &self.config.retry;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let call = self.provider.analyze(request);
            let result = match tokio::time::timeout(self.config.timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(VisionError::Timeout(self.config.timeout)),
            };

            match result {
                Ok(response) => {
                    debug!(
                        provider = %response.provider,
                        model = %response.model,
                        latency_ms = response.latency_ms,
                        attempt,
                        "Vision provider replied"
                    );
                    return Ok(response.content);
                }
                Err(e) if e.is_transient() && policy.should_retry(attempt) => {
                    let delay = policy.delay_for(attempt);
                    warn!(
                        provider = self.provider.name(),
                        attempt,
                        max = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %redact_sensitive_data(&e.to_string()),
                        "Vision call failed, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    warn!(
                        provider = self.provider.name(),
                        attempt,
                        error = %redact_sensitive_data(&e.to_string()),
                        "Vision call failed"
                    );
                    return Err(e);
                }
            }
        }
    }
}
