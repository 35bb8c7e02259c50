//! Text backend error types.
//!
//! Defined in `exam-insight-core` so the suggestion orchestrator can
//! downcast and log a classified cause before falling back.

use thiserror::Error;

/// Errors that can occur when calling a text-generation backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (missing or invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The backend answered but produced no text.
    #[error("backend returned an empty reply")]
    EmptyReply,
}

impl BackendError {
    /// Short machine-readable label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::RateLimited { .. } => "rate_limited",
            BackendError::AuthenticationFailed(_) => "auth",
            BackendError::ModelNotFound(_) => "model_not_found",
            BackendError::ApiError { .. } => "api",
            BackendError::Timeout(_) => "timeout",
            BackendError::NetworkError(_) => "network",
            BackendError::EmptyReply => "empty_reply",
        }
    }
}

/// Classify an opaque backend failure for logging.
pub fn classify(error: &anyhow::Error) -> &'static str {
    error
        .downcast_ref::<BackendError>()
        .map(BackendError::kind)
        .unwrap_or("other")
}
