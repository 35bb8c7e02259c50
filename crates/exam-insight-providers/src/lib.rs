//! exam-insight-providers: Text-generation backends.
//!
//! Implements the `TextBackend` trait for Gemini, OpenAI-compatible APIs,
//! Ollama, and a mock, plus the configuration file that selects between them.

pub mod config;
pub mod gemini;
mod http;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use config::{
    create_named_provider, create_provider, load_config, load_config_from, ExamInsightConfig,
    ProviderConfig,
};
pub use exam_insight_core::error::BackendError;
