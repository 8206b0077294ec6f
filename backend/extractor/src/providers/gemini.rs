use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use receiptforge_core::{VisionError, VisionProvider, VisionRequest, VisionResponse};

use super::{read_error_body, transport_error};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Google Gemini `generateContent` provider. Accepts images and PDFs inline.
pub struct GeminiVisionProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiVisionProvider {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_body(request: &VisionRequest) -> Value {
        json!({
            "systemInstruction": { "parts": [{ "text": request.instruction }] },
            "contents": [{
                "role": "user",
                "parts": [
                    { "inlineData": { "mimeType": request.mime_type, "data": request.document_b64 } }
                ]
            }],
            "generationConfig": { "maxOutputTokens": request.max_tokens }
        })
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text parts of the first candidate.
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        Some(content.parts.into_iter().filter_map(|p| p.text).collect())
    }
}

#[async_trait]
impl VisionProvider for GeminiVisionProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn analyze(&self, request: &VisionRequest) -> Result<VisionResponse, VisionError> {
        let start = Instant::now();
        debug!(model = %self.model, mime = %request.mime_type, "Sending document to Gemini");

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_body(request))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(VisionError::Status {
                status: status.as_u16(),
                body: read_error_body(response).await,
            });
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| VisionError::InvalidResponse(e.to_string()))?;
        let content = generated
            .into_text()
            .ok_or_else(|| VisionError::InvalidResponse("response has no candidates".into()))?;

        Ok(VisionResponse {
            content,
            provider: "gemini".to_string(),
            model: self.model.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
