//! HTTP plumbing shared by the remote backends.

use std::time::Duration;

use anyhow::{Context, Result};
use exam_insight_core::error::BackendError;

pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build HTTP client")
}

pub(crate) fn send_error(error: reqwest::Error, timeout_secs: u64) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout(timeout_secs)
    } else {
        BackendError::NetworkError(error.to_string())
    }
}

/// Map a non-success status to a [`BackendError`].
///
/// `extract_message` pulls a readable message out of the provider's error
/// body; the raw body is used when it returns `None`.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
    extract_message: fn(&str) -> Option<String>,
) -> Result<reqwest::Response, BackendError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }

    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5)
            .saturating_mul(1000);
        return Err(BackendError::RateLimited {
            retry_after_ms: retry_after,
        });
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_message(&body).unwrap_or(body);
    match status {
        401 | 403 => Err(BackendError::AuthenticationFailed(message)),
        404 => Err(BackendError::ModelNotFound(model.to_string())),
        _ => Err(BackendError::ApiError { status, message }),
    }
}

pub(crate) fn parse_error(error: reqwest::Error) -> BackendError {
    BackendError::ApiError {
        status: 0,
        message: format!("failed to parse response: {error}"),
    }
}
