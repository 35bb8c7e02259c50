//! Analysis request loading and validation.
//!
//! Requests are read from `.json` or `.toml` files. Validation mirrors the
//! checks the HTTP layer applies before a request reaches the analyzer.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::{AnalysisRequest, Language};

/// Load a single analysis request from a JSON or TOML file.
pub fn load_request(path: &Path) -> Result<AnalysisRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request file: {}", path.display()))?;

    let request = match extension(path).as_deref() {
        Some("toml") => toml::from_str::<AnalysisRequest>(&content)
            .with_context(|| format!("failed to parse TOML request: {}", path.display()))?,
        _ => serde_json::from_str::<AnalysisRequest>(&content)
            .with_context(|| format!("failed to parse JSON request: {}", path.display()))?,
    };

    Ok(request)
}

/// Load every `.json` / `.toml` request in a directory, sorted by file name.
pub fn load_request_directory(dir: &Path) -> Result<Vec<(PathBuf, AnalysisRequest)>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && matches!(extension(p).as_deref(), Some("json" | "toml")))
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let request = load_request(&path)?;
            Ok((path, request))
        })
        .collect()
}

/// Load a file, or every request file in a directory.
pub fn load_requests(path: &Path) -> Result<Vec<(PathBuf, AnalysisRequest)>> {
    if path.is_dir() {
        load_request_directory(path)
    } else {
        Ok(vec![(path.to_path_buf(), load_request(path)?)])
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// How serious a validation finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// The request must not be analyzed.
    Error,
    /// The request is usable but probably not what the caller meant.
    Warning,
}

/// A validation finding for one request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn error(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            field: field.to_string(),
            message: message.into(),
        }
    }

    fn warning(field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == IssueSeverity::Error
    }
}

/// Check a request against the analyzer's preconditions.
///
/// Rating membership is already enforced by deserialization.
pub fn validate_request(request: &AnalysisRequest) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if request.exam_content.trim().is_empty() {
        issues.push(ValidationIssue::error("examContent", "must not be empty"));
    }
    if request.subject.trim().is_empty() {
        issues.push(ValidationIssue::error("subject", "must not be empty"));
    }

    for (field, value) in [("time", request.time), ("workingTime", request.working_time)] {
        if !value.is_finite() || value < 0.0 {
            issues.push(ValidationIssue::error(
                field,
                format!("must be a non-negative number, got {value}"),
            ));
        }
    }
    if request.time > 0.0 && request.working_time > request.time {
        issues.push(ValidationIssue::warning(
            "workingTime",
            format!(
                "working time {} exceeds the allotted time {}",
                request.working_time, request.time
            ),
        ));
    }

    if !request.score.is_finite() || !(0.0..=10.0).contains(&request.score) {
        issues.push(ValidationIssue::error(
            "score",
            format!("must be between 0 and 10, got {}", request.score),
        ));
    }

    if request.total_questions < 1 {
        issues.push(ValidationIssue::error("totalQuestions", "must be at least 1"));
    }
    let answered = request.correct_answers as u64
        + request.wrong_answers as u64
        + request.empty_answers as u64;
    if answered != request.total_questions as u64 {
        issues.push(ValidationIssue::error(
            "totalQuestions",
            format!(
                "correct ({}) + wrong ({}) + empty ({}) = {answered}, expected {}",
                request.correct_answers,
                request.wrong_answers,
                request.empty_answers,
                request.total_questions
            ),
        ));
    }

    let mut seen = HashSet::new();
    for (i, question) in request.question_labels.iter().enumerate() {
        let field = format!("questionLabels[{i}]");
        if question.question_number < 1 {
            issues.push(ValidationIssue::error(&field, "questionNumber must be at least 1"));
        } else if !seen.insert(question.question_number) {
            issues.push(ValidationIssue::error(
                &field,
                format!("duplicate questionNumber {}", question.question_number),
            ));
        }
        if question.label.is_empty() {
            issues.push(ValidationIssue::error(&field, "label must not be empty"));
        }
    }

    if !Language::is_supported_tag(&request.language) {
        issues.push(ValidationIssue::warning(
            "language",
            format!(
                "unsupported language '{}', English will be used",
                request.language
            ),
        ));
    }

    issues
}
