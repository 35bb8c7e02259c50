//! The `exam-insight analyze` command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use exam_insight_core::engine::{
    ExamAnalyzer, ProgressReporter, SuggestionConfig, SuggestionOrchestrator,
};
use exam_insight_core::input::{load_requests, validate_request};
use exam_insight_core::model::{AnalysisRequest, AnalysisResult};
use exam_insight_core::store::{AnalysisRecord, JsonlStore};
use exam_insight_core::traits::AnalysisStore;
use exam_insight_providers::{create_named_provider, load_config_from};

/// Arguments of the `analyze` subcommand.
pub struct AnalyzeArgs {
    pub request: PathBuf,
    pub config: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub timeout: Option<u64>,
    pub parallelism: Option<usize>,
    pub output: Option<PathBuf>,
    pub format: String,
    pub no_store: bool,
    pub store: Option<PathBuf>,
}

/// Console progress reporter.
struct ConsoleReporter {
    subjects: Vec<String>,
}

impl ProgressReporter for ConsoleReporter {
    fn on_analysis_start(&self, index: usize, subject: &str) {
        eprintln!("  Starting: [{}] {subject}", index + 1);
    }

    fn on_analysis_complete(&self, index: usize, result: &AnalysisResult) {
        let subject = self
            .subjects
            .get(index)
            .map(String::as_str)
            .unwrap_or(&result.summary.subject);
        eprintln!(
            "  Done: [{}] {subject} ({} topics, {} strengths, {} weaknesses)",
            index + 1,
            result.topic_analysis.len(),
            result.strengths.len(),
            result.weaknesses.len(),
        );
    }

    fn on_batch_complete(&self, total: usize, elapsed: Duration) {
        eprintln!(
            "\nComplete: {total} analyses ({:.1}s)",
            elapsed.as_secs_f64()
        );
    }
}

pub async fn execute(args: AnalyzeArgs) -> Result<()> {
    anyhow::ensure!(
        matches!(args.format.as_str(), "text" | "json"),
        "unknown format '{}', expected text or json",
        args.format
    );

    let mut config = load_config_from(args.config.as_deref())?;
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    let parallelism = args.parallelism.unwrap_or(config.parallelism);
    anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");
    anyhow::ensure!(config.timeout_secs >= 1, "timeout must be at least 1 second");

    let loaded = load_requests(&args.request)?;
    anyhow::ensure!(
        !loaded.is_empty(),
        "no request files found in {}",
        args.request.display()
    );

    let mut invalid = 0;
    for (path, request) in &loaded {
        for issue in validate_request(request) {
            let level = if issue.is_error() { "ERROR" } else { "WARNING" };
            eprintln!(
                "{}: {level} [{}] {}",
                path.display(),
                issue.field,
                issue.message
            );
            if issue.is_error() {
                invalid += 1;
            }
        }
    }
    anyhow::ensure!(
        invalid == 0,
        "{invalid} validation error(s); run `exam-insight validate` for details"
    );

    let provider_name = args
        .provider
        .clone()
        .unwrap_or_else(|| config.default_provider.clone());
    let backend = create_named_provider(&config, &provider_name)?;

    let suggestion_config = SuggestionConfig {
        model: args.model.clone().unwrap_or_else(|| config.default_model.clone()),
        temperature: config.default_temperature,
        max_tokens: config.max_tokens,
        timeout: Duration::from_secs(config.timeout_secs),
        system_prompt_override: config.system_prompt.clone(),
    };
    let model = suggestion_config.model.clone();
    let analyzer = ExamAnalyzer::new(SuggestionOrchestrator::new(
        Arc::from(backend),
        suggestion_config,
    ));

    let requests: Vec<AnalysisRequest> = loaded.into_iter().map(|(_, r)| r).collect();
    eprintln!(
        "exam-insight v{}: analyzing {} request(s) with {provider_name}/{model}",
        env!("CARGO_PKG_VERSION"),
        requests.len()
    );
    eprintln!();

    let reporter = ConsoleReporter {
        subjects: requests.iter().map(|r| r.subject.clone()).collect(),
    };
    let results = analyzer
        .analyze_batch(&requests, parallelism, &reporter)
        .await;

    match args.format.as_str() {
        "json" => println!("{}", results_json(&results)?),
        _ => {
            for result in &results {
                print_result(result);
            }
        }
    }

    if let Some(path) = &args.output {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, results_json(&results)?)
            .with_context(|| format!("failed to write results to {}", path.display()))?;
        eprintln!("Results saved to: {}", path.display());
    }

    if !args.no_store {
        let store = JsonlStore::new(args.store.clone().unwrap_or(config.store_path.clone()));
        for (request, result) in requests.iter().zip(&results) {
            store.append(&AnalysisRecord::new(request, result.clone()))?;
        }
        eprintln!(
            "Stored {} analysis record(s) in {}",
            results.len(),
            store.path().display()
        );
    }

    Ok(())
}

/// A single result as an object, several as an array.
fn results_json(results: &[AnalysisResult]) -> Result<String> {
    let json = match results {
        [single] => serde_json::to_string_pretty(single),
        _ => serde_json::to_string_pretty(results),
    };
    json.context("failed to serialize results")
}

fn print_result(result: &AnalysisResult) {
    use comfy_table::{Cell, Table};

    println!(
        "\n{} ({}): score {:.1}/10, rated {}",
        result.summary.exam_name,
        result.summary.subject,
        result.summary.score,
        result.detail_exam_result.rating
    );
    let detail = &result.detail_exam_result;
    println!(
        "Answers: {} correct, {} wrong, {} empty of {}",
        detail.correct_answers, detail.wrong_answers, detail.empty_answers, detail.total_questions
    );
    let timing = &result.working_time_analysis;
    println!(
        "Timing: {:.1}s allotted / {:.1}s spent per question",
        timing.average_speed, timing.time_spent
    );

    let mut table = Table::new();
    table.set_header(vec!["Topic", "Questions", "Correct", "Wrong", "Correct %"]);
    for topic in &result.topic_analysis {
        table.add_row(vec![
            Cell::new(&topic.topic),
            Cell::new(topic.question_count),
            Cell::new(topic.correct_count),
            Cell::new(topic.wrong_count),
            Cell::new(format!("{:.1}%", topic.correct_percentage)),
        ]);
    }
    println!("{table}");

    println!("Strengths: {}", join_or_dash(&result.strengths));
    println!("Weaknesses: {}", join_or_dash(&result.weaknesses));

    let s = &result.suggestions;
    println!("\nImprovement: {}", s.improvement_suggestions);
    println!("Time management: {}", s.time_analysis_suggestions);
    println!("Study method: {}", s.study_method_suggestions);
    println!("Next exam: {}", s.next_exam_suggestions);
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}
