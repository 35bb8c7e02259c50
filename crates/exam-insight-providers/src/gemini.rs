//! Google Gemini (Generative Language API) backend.

use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use exam_insight_core::error::BackendError;
use exam_insight_core::traits::{
    GenerateRequest, GenerateResponse, TextBackend, TokenUsage, DEFAULT_SYSTEM_PROMPT,
};

use crate::http::{build_client, check_status, parse_error, send_error};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent` backend.
pub struct GeminiBackend {
    api_key: String,
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: &str, base_url: Option<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout_secs,
            client: build_client(timeout_secs)?,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiContent,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: GeminiUsage,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    message: String,
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<GeminiError>(body)
        .ok()
        .map(|e| e.error.message)
}

#[async_trait]
impl TextBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let start = Instant::now();

        let system_prompt = request
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: request.prompt.clone(),
                }],
            }],
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: system_prompt,
                }],
            },
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, request.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout_secs))?;

        let response = check_status(response, &request.model, error_message).await?;
        let api_response: GeminiResponse = response.json().await.map_err(parse_error)?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let content: String = api_response
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(BackendError::EmptyReply.into());
        }

        let usage = api_response.usage_metadata;
        Ok(GenerateResponse {
            content,
            model: api_response
                .model_version
                .unwrap_or_else(|| request.model.clone()),
            token_usage: TokenUsage {
                prompt_tokens: usage.prompt_token_count,
                completion_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            },
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_insight_core::error::classify;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerateRequest {
        GenerateRequest {
            model: "gemini-1.5-pro".into(),
            prompt: "Give four study tips".into(),
            system_prompt: None,
            max_tokens: 256,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn successful_generation() {
        let server = MockServer::start().await;

        let response_body = serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "1. Review. "}, {"text": "2. Pace."}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 40, "candidatesTokenCount": 12, "totalTokenCount": 52},
            "modelVersion": "gemini-1.5-pro-002"
        });

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "Give four study tips"}]}],
                "generationConfig": {"maxOutputTokens": 256}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response_body))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("test-key", Some(server.uri()), 30).unwrap();
        let response = backend.generate(&request()).await.unwrap();
        assert_eq!(response.content, "1. Review. 2. Pace.");
        assert_eq!(response.model, "gemini-1.5-pro-002");
        assert_eq!(response.token_usage.total_tokens, 52);
    }

    #[tokio::test]
    async fn empty_candidates_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})),
            )
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("key", Some(server.uri()), 30).unwrap();
        let err = backend.generate(&request()).await.unwrap_err();
        assert_eq!(classify(&err), "empty_reply");
    }

    #[tokio::test]
    async fn forbidden_is_auth_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}
            })))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("bad", Some(server.uri()), 30).unwrap();
        let err = backend.generate(&request()).await.unwrap_err();
        assert_eq!(classify(&err), "auth");
        assert!(err.to_string().contains("API key not valid"));
    }

    #[tokio::test]
    async fn rate_limited_reads_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("key", Some(server.uri()), 30).unwrap();
        let err = backend.generate(&request()).await.unwrap_err();
        match err.downcast_ref::<BackendError>() {
            Some(BackendError::RateLimited { retry_after_ms }) => assert_eq!(*retry_after_ms, 7000),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn huge_retry_after_saturates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429).insert_header("retry-after", "99999999999999999"),
            )
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("key", Some(server.uri()), 30).unwrap();
        let err = backend.generate(&request()).await.unwrap_err();
        match err.downcast_ref::<BackendError>() {
            Some(BackendError::RateLimited { retry_after_ms }) => {
                assert_eq!(*retry_after_ms, u64::MAX)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn analyzer_falls_back_on_rate_limit() {
        use std::sync::Arc;

        use exam_insight_core::engine::{ExamAnalyzer, SuggestionConfig, SuggestionOrchestrator};
        use exam_insight_core::fallback::fallback_bundle;
        use exam_insight_core::model::{AnalysisRequest, Language, QuestionRecord, Rating};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429).insert_header("retry-after", "99999999999999999"),
            )
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("key", Some(server.uri()), 30).unwrap();
        let analyzer = ExamAnalyzer::new(SuggestionOrchestrator::new(
            Arc::new(backend),
            SuggestionConfig::default(),
        ));
        let request = AnalysisRequest {
            exam_content: "Biology Quiz".into(),
            subject: "Biology".into(),
            language: "en".into(),
            score: 9.0,
            time: 120.0,
            working_time: 60.0,
            rating: Rating::Excellent,
            total_questions: 1,
            empty_answers: 0,
            correct_answers: 1,
            wrong_answers: 0,
            question_labels: vec![QuestionRecord {
                question_number: 1,
                label: "cells".into(),
                is_correct: true,
            }],
        };

        let result = analyzer.analyze(&request).await;
        assert_eq!(
            result.suggestions,
            fallback_bundle(Language::English, 9.0, 120.0, 60.0)
        );
    }

    #[tokio::test]
    async fn malformed_body_is_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let backend = GeminiBackend::new("key", Some(server.uri()), 30).unwrap();
        let err = backend.generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("failed to parse response"));
    }
}
