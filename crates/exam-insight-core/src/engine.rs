//! Central analysis orchestrator.
//!
//! [`ExamAnalyzer`] runs the aggregation pipeline and asks a
//! [`SuggestionOrchestrator`] for coaching text. The orchestrator owns the
//! only external call (one request to a text backend) and the fallback
//! policy, so analysis always succeeds.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::classify;
use crate::fallback::{FallbackTable, TimeAdvice};
use crate::model::{
    AnalysisRequest, AnalysisResult, DetailExamResult, SuggestionBundle, SummaryResult,
};
use crate::parser::parse_reply;
use crate::prompt::{build_prompt, SuggestionContext};
use crate::statistics;
use crate::traits::{GenerateRequest, TextBackend};

/// Configuration for suggestion generation.
#[derive(Debug, Clone)]
pub struct SuggestionConfig {
    /// Model identifier passed to the backend.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Max tokens for the reply.
    pub max_tokens: u32,
    /// Upper bound on the backend call. Expiry counts as a backend failure.
    pub timeout: Duration,
    /// Optional system prompt override.
    pub system_prompt_override: Option<String>,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-pro".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout: Duration::from_secs(60),
            system_prompt_override: None,
        }
    }
}

/// Builds the prompt, calls the backend once, and parses or falls back.
pub struct SuggestionOrchestrator {
    backend: Arc<dyn TextBackend>,
    config: SuggestionConfig,
}

impl SuggestionOrchestrator {
    pub fn new(backend: Arc<dyn TextBackend>, config: SuggestionConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Produce the four suggestion texts for one exam attempt.
    ///
    /// Never fails: backend errors and timeouts yield the full fallback
    /// bundle, and sections missing from the reply are filled individually.
    pub async fn generate_suggestions(&self, ctx: &SuggestionContext<'_>) -> SuggestionBundle {
        let bucket = ctx.score_bucket();
        let advice = TimeAdvice::decide(bucket, ctx.time_signal());
        let table = FallbackTable::for_language(ctx.language);

        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: build_prompt(ctx),
            system_prompt: self.config.system_prompt_override.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let reply =
            tokio::time::timeout(self.config.timeout, self.backend.generate(&request)).await;

        match reply {
            Ok(Ok(response)) => {
                let parsed = parse_reply(&response.content);
                let found = parsed.found();
                if found < 4 {
                    debug!(
                        backend = self.backend.name(),
                        found, "reply is missing sections, filling from fallback table"
                    );
                }
                parsed.complete(table, bucket, advice)
            }
            Ok(Err(e)) => {
                warn!(
                    backend = self.backend.name(),
                    kind = classify(&e),
                    "suggestion generation failed, using fallback: {e:#}"
                );
                table.bundle(bucket, advice)
            }
            Err(_) => {
                warn!(
                    backend = self.backend.name(),
                    timeout_secs = self.config.timeout.as_secs_f64(),
                    "suggestion generation timed out, using fallback"
                );
                table.bundle(bucket, advice)
            }
        }
    }
}

/// Progress reporting trait for batch analysis.
pub trait ProgressReporter: Send + Sync {
    fn on_analysis_start(&self, index: usize, subject: &str);
    fn on_analysis_complete(&self, index: usize, result: &AnalysisResult);
    fn on_batch_complete(&self, total: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_analysis_start(&self, _: usize, _: &str) {}
    fn on_analysis_complete(&self, _: usize, _: &AnalysisResult) {}
    fn on_batch_complete(&self, _: usize, _: Duration) {}
}

/// Turns validated requests into complete analysis results.
pub struct ExamAnalyzer {
    suggestions: SuggestionOrchestrator,
}

impl ExamAnalyzer {
    pub fn new(suggestions: SuggestionOrchestrator) -> Self {
        Self { suggestions }
    }

    /// Analyze one exam attempt.
    ///
    /// The request is assumed to be validated; see
    /// [`crate::input::validate_request`].
    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        let start = Instant::now();
        let language = request.language();

        let topic_analysis = statistics::aggregate(&request.question_labels);
        let strengths = statistics::strengths(&topic_analysis);
        let weaknesses = statistics::weaknesses(&topic_analysis);
        let working_time_analysis =
            statistics::working_time(request.time, request.working_time, request.total_questions);

        let ctx = SuggestionContext {
            subject: &request.subject,
            score: request.score,
            average_speed: working_time_analysis.average_speed,
            time_spent: working_time_analysis.time_spent,
            strengths: &strengths,
            weaknesses: &weaknesses,
            topic_stats: &topic_analysis,
            language,
        };
        let suggestions = self.suggestions.generate_suggestions(&ctx).await;

        info!(
            subject = %request.subject,
            language = %language,
            topics = topic_analysis.len(),
            strengths = strengths.len(),
            weaknesses = weaknesses.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "exam analyzed"
        );

        AnalysisResult {
            summary: SummaryResult {
                exam_name: request.exam_content.clone(),
                subject: request.subject.clone(),
                score: request.score,
                time: request.time,
            },
            detail_exam_result: DetailExamResult {
                rating: request.rating,
                total_questions: request.total_questions,
                correct_answers: request.correct_answers,
                wrong_answers: request.wrong_answers,
                empty_answers: request.empty_answers,
            },
            topic_analysis,
            working_time_analysis,
            strengths,
            weaknesses,
            suggestions,
        }
    }

    /// Analyze many independent requests concurrently.
    ///
    /// At most `parallelism` backend calls are in flight at once. Results
    /// come back in the order of `requests`.
    pub async fn analyze_batch(
        &self,
        requests: &[AnalysisRequest],
        parallelism: usize,
        progress: &dyn ProgressReporter,
    ) -> Vec<AnalysisResult> {
        let start = Instant::now();
        let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));

        let mut futures = FuturesUnordered::new();
        for (index, request) in requests.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            futures.push(async move {
                // The semaphore is never closed, so acquisition only waits.
                let _permit = semaphore.acquire().await.ok();
                progress.on_analysis_start(index, &request.subject);
                (index, self.analyze(request).await)
            });
        }

        let mut results: Vec<Option<AnalysisResult>> = vec![None; requests.len()];
        while let Some((index, result)) = futures.next().await {
            progress.on_analysis_complete(index, &result);
            results[index] = Some(result);
        }

        progress.on_batch_complete(requests.len(), start.elapsed());

        results.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::BackendError;
    use crate::fallback::fallback_bundle;
    use crate::model::{Language, QuestionRecord, Rating};
    use crate::traits::{GenerateResponse, TokenUsage};

    enum Behavior {
        Reply(String),
        Fail,
        Hang,
    }

    struct StubBackend {
        behavior: Behavior,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl StubBackend {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl TextBackend for StubBackend {
        fn name(&self) -> &str {
            "stub"
        }

        async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(request.prompt.clone());
            match &self.behavior {
                Behavior::Reply(text) => Ok(GenerateResponse {
                    content: text.clone(),
                    model: request.model.clone(),
                    token_usage: TokenUsage::default(),
                    latency_ms: 1,
                }),
                Behavior::Fail => Err(BackendError::NetworkError("connection refused".into()).into()),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("the orchestrator timeout fires first")
                }
            }
        }
    }

    fn analyzer(backend: Arc<StubBackend>) -> ExamAnalyzer {
        let config = SuggestionConfig {
            timeout: Duration::from_millis(200),
            ..Default::default()
        };
        ExamAnalyzer::new(SuggestionOrchestrator::new(backend, config))
    }

    fn request(score: f64, language: &str) -> AnalysisRequest {
        AnalysisRequest {
            exam_content: "Math Midterm Exam".into(),
            subject: "Mathematics".into(),
            language: language.into(),
            score,
            time: 600.0,
            working_time: 500.0,
            rating: Rating::Good,
            total_questions: 4,
            empty_answers: 0,
            correct_answers: 3,
            wrong_answers: 1,
            question_labels: vec![
                QuestionRecord {
                    question_number: 1,
                    label: "geometry".into(),
                    is_correct: true,
                },
                QuestionRecord {
                    question_number: 2,
                    label: "geometry".into(),
                    is_correct: false,
                },
                QuestionRecord {
                    question_number: 3,
                    label: "algebra".into(),
                    is_correct: true,
                },
                QuestionRecord {
                    question_number: 4,
                    label: "algebra".into(),
                    is_correct: true,
                },
            ],
        }
    }

    #[tokio::test]
    async fn parsed_reply_populates_all_fields() {
        let backend = StubBackend::new(Behavior::Reply(
            "1. Improve A. 2. Time B. 3. Study C. 4. Next D.".into(),
        ));
        let result = analyzer(backend.clone()).analyze(&request(7.5, "en")).await;

        assert_eq!(result.suggestions.improvement_suggestions, "Improve A.");
        assert_eq!(result.suggestions.time_analysis_suggestions, "Time B.");
        assert_eq!(result.suggestions.study_method_suggestions, "Study C.");
        assert_eq!(result.suggestions.next_exam_suggestions, "Next D.");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        assert_eq!(result.summary.exam_name, "Math Midterm Exam");
        assert_eq!(result.topic_analysis.len(), 2);
        assert_eq!(result.strengths, vec!["algebra"]);
        assert!(result.weaknesses.is_empty());
        assert_eq!(result.working_time_analysis.average_speed, 150.0);
        assert_eq!(result.working_time_analysis.time_spent, 125.0);
    }

    #[tokio::test]
    async fn backend_failure_yields_fallback_bundle() {
        let backend = StubBackend::new(Behavior::Fail);
        let result = analyzer(backend.clone()).analyze(&request(9.0, "en")).await;

        let expected = fallback_bundle(Language::English, 9.0, 150.0, 125.0);
        assert_eq!(result.suggestions, expected);
        assert_eq!(
            result.suggestions.improvement_suggestions,
            "Maintain your study habits and consider exploring more advanced material."
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn backend_failure_uses_request_language() {
        let backend = StubBackend::new(Behavior::Fail);
        let result = analyzer(backend).analyze(&request(3.0, "vi")).await;

        let expected = fallback_bundle(Language::Vietnamese, 3.0, 150.0, 125.0);
        assert_eq!(result.suggestions, expected);
    }

    #[tokio::test]
    async fn unsupported_language_degrades_to_english() {
        let backend = StubBackend::new(Behavior::Fail);
        let result = analyzer(backend.clone()).analyze(&request(6.0, "fr")).await;

        let expected = fallback_bundle(Language::English, 6.0, 150.0, 125.0);
        assert_eq!(result.suggestions, expected);
    }

    #[tokio::test]
    async fn unparseable_reply_falls_back_per_field() {
        let backend = StubBackend::new(Behavior::Reply("Sorry, no numbered list.".into()));
        let result = analyzer(backend).analyze(&request(4.0, "en")).await;

        let expected = fallback_bundle(Language::English, 4.0, 150.0, 125.0);
        assert_eq!(result.suggestions, expected);
    }

    #[tokio::test]
    async fn partial_reply_keeps_parsed_fields() {
        let backend = StubBackend::new(Behavior::Reply("1. Only this one.".into()));
        let result = analyzer(backend).analyze(&request(5.5, "en")).await;

        let fallback = fallback_bundle(Language::English, 5.5, 150.0, 125.0);
        assert_eq!(result.suggestions.improvement_suggestions, "Only this one.");
        assert_eq!(
            result.suggestions.time_analysis_suggestions,
            fallback.time_analysis_suggestions
        );
        assert_eq!(
            result.suggestions.next_exam_suggestions,
            fallback.next_exam_suggestions
        );
    }

    #[tokio::test]
    async fn timeout_counts_as_backend_failure() {
        let backend = StubBackend::new(Behavior::Hang);
        let result = analyzer(backend).analyze(&request(9.0, "en")).await;

        let expected = fallback_bundle(Language::English, 9.0, 150.0, 125.0);
        assert_eq!(result.suggestions, expected);
    }

    #[tokio::test]
    async fn prompt_is_built_in_request_language() {
        let backend = StubBackend::new(Behavior::Fail);
        analyzer(backend.clone()).analyze(&request(7.0, "vi")).await;

        let prompt = backend.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Môn học: Mathematics"));
        assert!(prompt.contains("- geometry: 50.0% đúng (2 câu)"));
    }

    #[tokio::test]
    async fn single_question_timing() {
        let backend = StubBackend::new(Behavior::Fail);
        let mut req = request(5.0, "en");
        req.total_questions = 1;
        req.time = 60.0;
        req.working_time = 50.0;
        req.correct_answers = 1;
        req.wrong_answers = 0;
        req.question_labels.truncate(1);

        let result = analyzer(backend).analyze(&req).await;
        assert_eq!(result.working_time_analysis.average_speed, 60.0);
        assert_eq!(result.working_time_analysis.time_spent, 50.0);
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let backend = StubBackend::new(Behavior::Fail);
        let analyzer = analyzer(backend.clone());
        let requests: Vec<AnalysisRequest> = (0..6)
            .map(|i| {
                let mut r = request(i as f64, "en");
                r.subject = format!("subject-{i}");
                r
            })
            .collect();

        let results = analyzer.analyze_batch(&requests, 2, &NoopReporter).await;

        assert_eq!(results.len(), 6);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.summary.subject, format!("subject-{i}"));
        }
        assert_eq!(backend.calls.load(Ordering::SeqCst), 6);
    }

    /// Records how many `generate` calls overlap.
    #[derive(Default)]
    struct CountingBackend {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl TextBackend for CountingBackend {
        fn name(&self) -> &str {
            "counting"
        }

        async fn generate(&self, _: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Err(BackendError::EmptyReply.into())
        }
    }

    #[tokio::test]
    async fn batch_respects_parallelism() {
        let backend = Arc::new(CountingBackend::default());
        let analyzer = ExamAnalyzer::new(SuggestionOrchestrator::new(
            backend.clone(),
            SuggestionConfig::default(),
        ));
        let requests: Vec<AnalysisRequest> = (0..8).map(|_| request(6.0, "en")).collect();

        let results = analyzer.analyze_batch(&requests, 3, &NoopReporter).await;

        assert_eq!(results.len(), 8);
        let peak = backend.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {peak} exceeded the limit");
        assert!(peak >= 2, "batch ran sequentially");
        assert_eq!(backend.in_flight.load(Ordering::SeqCst), 0);
    }
}
