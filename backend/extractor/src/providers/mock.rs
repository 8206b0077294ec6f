use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use receiptforge_core::{VisionError, VisionProvider, VisionRequest, VisionResponse};

/// A mock vision provider that returns canned or scripted replies.
///
/// Scripted results are consumed first, one per call; after that every call
/// gets the fixed response.
pub struct MockVisionProvider {
    fixed_response: Option<String>,
    script: Mutex<VecDeque<Result<String, VisionError>>>,
    delays: Mutex<VecDeque<Duration>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<VisionRequest>>,
}

impl MockVisionProvider {
    pub fn new() -> Self {
        Self {
            fixed_response: None,
            script: Mutex::new(VecDeque::new()),
            delays: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    pub fn with_script(self, script: Vec<Result<String, VisionError>>) -> Self {
        *self.script.lock().unwrap_or_else(|e| e.into_inner()) = script.into();
        self
    }

    /// Per-call delays applied before replying, consumed in order.
    pub fn with_delays(self, delays: Vec<Duration>) -> Self {
        *self.delays.lock().unwrap_or_else(|e| e.into_inner()) = delays.into();
        self
    }

    /// Number of `analyze` calls so far, including ones cut off by a timeout.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<VisionRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockVisionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisionProvider for MockVisionProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn analyze(&self, request: &VisionRequest) -> Result<VisionResponse, VisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        let delay = self.delays.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.script.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        let content = match scripted {
            Some(result) => result?,
            None => self
                .fixed_response
                .clone()
                .unwrap_or_else(|| r#"{"vendor": null, "date": null, "amount": null, "currency": null, "raw_text": ""}"#.to_string()),
        };

        Ok(VisionResponse {
            content,
            provider: "mock".to_string(),
            model: "mock".to_string(),
            latency_ms: 0,
        })
    }
}
