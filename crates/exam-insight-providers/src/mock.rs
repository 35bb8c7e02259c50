//! Mock backend for exercising the analyzer without network calls.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use exam_insight_core::error::BackendError;
use exam_insight_core::traits::{GenerateRequest, GenerateResponse, TextBackend, TokenUsage};

/// Reply used when a mock is configured without one.
pub const DEFAULT_MOCK_REPLY: &str = "1. Review the topics you missed and redo those questions.\n\
2. Pace yourself so every question gets a fair share of the time.\n\
3. Alternate short study sessions with practice problems.\n\
4. Take a short practice quiz on your weakest topic next.";

/// A mock backend that answers every prompt with the same text, or fails.
pub struct MockBackend {
    reply: String,
    fail: bool,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerateRequest>>,
}

impl MockBackend {
    /// Create a mock that always returns the same reply.
    pub fn with_fixed_response(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: false,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock whose every call fails with an API error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_fixed_response("")
        }
    }

    /// Number of calls made.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Last request received.
    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.last_request
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::with_fixed_response(DEFAULT_MOCK_REPLY)
    }
}

#[async_trait]
impl TextBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        if self.fail {
            return Err(BackendError::ApiError {
                status: 503,
                message: "mock backend configured to fail".into(),
            }
            .into());
        }

        let prompt_tokens = (request.prompt.len() / 4) as u32; // Rough estimate
        let completion_tokens = (self.reply.len() / 4) as u32;

        Ok(GenerateResponse {
            content: self.reply.clone(),
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
            latency_ms: 1,
        })
    }
}
