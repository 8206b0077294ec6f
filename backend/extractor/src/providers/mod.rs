pub mod gemini;
pub mod mock;
pub mod openai;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use receiptforge_core::{ReceiptError, VisionError, VisionProvider};
use receiptforge_logging::redact_sensitive_data;
use reqwest::Client;

use gemini::GeminiVisionProvider;
use mock::MockVisionProvider;
use openai::OpenAiVisionProvider;

/// Longest provider error body kept for logs and records.
const MAX_ERROR_BODY: usize = 512;

/// Which vision backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Mock,
}

impl FromStr for ProviderKind {
    type Err = ReceiptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            other => Err(ReceiptError::Config(format!(
                "unknown vision provider \"{other}\" (expected openai, gemini or mock)"
            ))),
        }
    }
}

/// Everything needed to construct a provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

/// Build the configured provider. Real providers require an API key.
pub fn build_provider(settings: &ProviderSettings) -> Result<Arc<dyn VisionProvider>, ReceiptError> {
    let provider: Arc<dyn VisionProvider> = match settings.kind {
        ProviderKind::Mock => Arc::new(MockVisionProvider::new()),
        ProviderKind::OpenAi => {
            let mut provider = OpenAiVisionProvider::new(http_client()?, require_key(settings)?);
            if let Some(model) = &settings.model {
                provider = provider.with_model(model);
            }
            if let Some(url) = &settings.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        ProviderKind::Gemini => {
            let mut provider = GeminiVisionProvider::new(http_client()?, require_key(settings)?);
            if let Some(model) = &settings.model {
                provider = provider.with_model(model);
            }
            if let Some(url) = &settings.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
    };
    Ok(provider)
}

fn require_key(settings: &ProviderSettings) -> Result<String, ReceiptError> {
    settings
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            ReceiptError::Config(format!("no API key configured for {:?} provider", settings.kind))
        })
}

fn http_client() -> Result<Client, ReceiptError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| ReceiptError::Config(format!("failed to build HTTP client: {e}")))
}

pub(crate) fn transport_error(err: reqwest::Error) -> VisionError {
    VisionError::Transport(redact_sensitive_data(&err.to_string()))
}

/// Redacted, length-capped error body of a failed response.
pub(crate) async fn read_error_body(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    let mut body = redact_sensitive_data(&body);
    if body.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|&i| body.is_char_boundary(i))
            .unwrap_or(0);
        body.truncate(cut);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(kind: ProviderKind, api_key: Option<&str>) -> ProviderSettings {
        ProviderSettings {
            kind,
            api_key: api_key.map(str::to_string),
            model: None,
            base_url: None,
        }
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" gemini ".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert!("ollama".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_real_provider_requires_key() {
        let err = build_provider(&settings(ProviderKind::OpenAi, None)).err().unwrap();
        assert!(matches!(err, ReceiptError::Config(_)));
        assert!(build_provider(&settings(ProviderKind::Gemini, Some("  "))).is_err());
    }

    #[test]
    fn test_builds_each_kind() {
        let openai = build_provider(&settings(ProviderKind::OpenAi, Some("sk-x"))).unwrap();
        assert_eq!(openai.name(), "openai");
        let gemini = build_provider(&settings(ProviderKind::Gemini, Some("g-x"))).unwrap();
        assert_eq!(gemini.name(), "gemini");
        let mock = build_provider(&settings(ProviderKind::Mock, None)).unwrap();
        assert_eq!(mock.name(), "mock");
    }
}
