//! Core trait definitions for text-generation backends and result storage.
//!
//! Backends are implemented by the `exam-insight-providers` crate; the
//! JSON-lines store lives in [`crate::store`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::store::AnalysisRecord;

// ---------------------------------------------------------------------------
// Text backend trait
// ---------------------------------------------------------------------------

/// Trait for generative-text backends that answer a single prompt.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Human-readable backend name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Generate a reply to a prompt. One request, one reply, no streaming.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse>;
}

/// Request to generate text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Model identifier (e.g. "gemini-1.5-pro").
    pub model: String,
    /// The full prompt.
    pub prompt: String,
    /// Optional system prompt override.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Reply from a text backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The raw reply text.
    pub content: String,
    /// Model that actually produced the reply.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Token accounting reported by a backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Append-only sink for finished analyses.
pub trait AnalysisStore: Send + Sync {
    /// Persist one record. Records are never updated in place.
    fn append(&self, record: &AnalysisRecord) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Default system prompt
// ---------------------------------------------------------------------------

/// Default system prompt for suggestion generation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an educational assistant that writes concise, encouraging, and specific study advice. Answer with exactly four numbered items (1. 2. 3. 4.) and nothing else.";
