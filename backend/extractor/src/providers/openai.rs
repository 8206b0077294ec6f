use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use receiptforge_core::{VisionError, VisionProvider, VisionRequest, VisionResponse};

use super::{read_error_body, transport_error};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// OpenAI (or any OpenAI-compatible) chat completions provider with vision input.
pub struct OpenAiVisionProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiVisionProvider {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
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

    fn build_body(&self, request: &VisionRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.instruction },
                { "role": "user", "content": [document_part(request)] }
            ],
            "max_tokens": request.max_tokens
        })
    }
}

/// Images go as `image_url` data URLs; PDFs as `file` parts.
fn document_part(request: &VisionRequest) -> Value {
    let data_url = format!("data:{};base64,{}", request.mime_type, request.document_b64);
    if request.mime_type == "application/pdf" {
        json!({
            "type": "file",
            "file": { "filename": request.filename, "file_data": data_url }
        })
    } else {
        json!({
            "type": "image_url",
            "image_url": { "url": data_url }
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl VisionProvider for OpenAiVisionProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn analyze(&self, request: &VisionRequest) -> Result<VisionResponse, VisionError> {
        let start = Instant::now();
        debug!(model = %self.model, mime = %request.mime_type, "Sending document to OpenAI");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.build_body(request))
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

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| VisionError::InvalidResponse(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| VisionError::InvalidResponse("response has no choices".into()))?
            .message
            .content
            .unwrap_or_default();

        Ok(VisionResponse {
            content,
            provider: "openai".to_string(),
            model: self.model.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mime: &str) -> VisionRequest {
        VisionRequest {
            instruction: "extract".into(),
            document_b64: "QUJD".into(),
            mime_type: mime.into(),
            filename: "scan".into(),
            max_tokens: 400,
        }
    }

    #[test]
    fn test_image_sent_as_data_url() {
        let provider = OpenAiVisionProvider::new(Client::new(), "sk-test");
        let body = provider.build_body(&request("image/jpeg"));
        assert_eq!(body["model"], DEFAULT_OPENAI_MODEL);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(
            body["messages"][1]["content"][0]["image_url"]["url"],
            "data:image/jpeg;base64,QUJD"
        );
        assert_eq!(body["max_tokens"], 400);
    }

    #[test]
    fn test_pdf_sent_as_file_part() {
        let provider = OpenAiVisionProvider::new(Client::new(), "sk-test").with_model("gpt-4.1-mini");
        let body = provider.build_body(&request("application/pdf"));
        let part = &body["messages"][1]["content"][0];
        assert_eq!(part["type"], "file");
        assert_eq!(part["file"]["file_data"], "data:application/pdf;base64,QUJD");
        assert_eq!(body["model"], "gpt-4.1-mini");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider =
            OpenAiVisionProvider::new(Client::new(), "k").with_base_url("http://localhost:1234/v1/");
        assert_eq!(provider.base_url, "http://localhost:1234/v1");
    }
}
