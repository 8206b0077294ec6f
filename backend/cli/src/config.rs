use std::time::Duration;

use receiptforge_core::ReceiptError;
use receiptforge_extractor::{ProviderKind, ProviderSettings};

/// receiptforge runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Key-value store URL (`sqlite://path`, `memory://`)
    pub store_url: String,
    /// `openai`, `gemini` or `mock`
    pub vision_provider: String,
    pub vision_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub gemini_api_key: Option<String>,
    /// Per-attempt bound on an inference call
    pub extract_timeout_secs: u64,
    /// Request body limit in MiB
    pub max_upload_mb: usize,
    /// Directory for rolling JSON log files
    pub log_dir: Option<String>,
    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            store_url: "sqlite://receiptforge.db".to_string(),
            vision_provider: "openai".to_string(),
            vision_model: None,
            openai_api_key: None,
            openai_base_url: None,
            gemini_api_key: None,
            extract_timeout_secs: 60,
            max_upload_mb: 20,
            log_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] over an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        // Blank values count as unset.
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        Self {
            bind_address: var("RECEIPTFORGE_BIND").unwrap_or(defaults.bind_address),
            port: var("RECEIPTFORGE_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            store_url: var("RECEIPTFORGE_STORE_URL").unwrap_or(defaults.store_url),
            vision_provider: var("RECEIPTFORGE_VISION_PROVIDER")
                .unwrap_or(defaults.vision_provider),
            vision_model: var("RECEIPTFORGE_VISION_MODEL"),
            openai_api_key: var("OPENAI_API_KEY"),
            openai_base_url: var("OPENAI_BASE_URL"),
            gemini_api_key: var("GEMINI_API_KEY"),
            extract_timeout_secs: var("RECEIPTFORGE_EXTRACT_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|&s| s > 0)
                .unwrap_or(defaults.extract_timeout_secs),
            max_upload_mb: var("RECEIPTFORGE_MAX_UPLOAD_MB")
                .and_then(|s| s.parse().ok())
                .filter(|&mb| mb > 0)
                .unwrap_or(defaults.max_upload_mb),
            log_dir: var("RECEIPTFORGE_LOG_DIR"),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    /// Provider settings for the configured backend, with its credential.
    pub fn provider_settings(&self) -> Result<ProviderSettings, ReceiptError> {
        let kind: ProviderKind = self.vision_provider.parse()?;
        let (api_key, base_url) = match kind {
            ProviderKind::OpenAi => (self.openai_api_key.clone(), self.openai_base_url.clone()),
            ProviderKind::Gemini => (self.gemini_api_key.clone(), None),
            ProviderKind::Mock => (None, None),
        };
        Ok(ProviderSettings {
            kind,
            api_key,
            model: self.vision_model.clone(),
            base_url,
        })
    }

    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
