//! Persisted analysis records with a JSON Lines backing file.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AnalysisRequest, AnalysisResult, QuestionRecord, Rating};
use crate::traits::AnalysisStore;

/// One stored analysis: the request's headline fields plus the full result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub subject: String,
    pub rating: Rating,
    pub total_questions: u32,
    pub empty_answers: u32,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    pub question_labels: Vec<QuestionRecord>,
    pub analysis_result: AnalysisResult,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn new(request: &AnalysisRequest, result: AnalysisResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            subject: request.subject.clone(),
            rating: request.rating,
            total_questions: request.total_questions,
            empty_answers: request.empty_answers,
            correct_answers: request.correct_answers,
            wrong_answers: request.wrong_answers,
            question_labels: request.question_labels.clone(),
            analysis_result: result,
            created_at: Utc::now(),
        }
    }
}

/// Append-only store writing one JSON record per line.
pub struct JsonlStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record in file order. A missing file yields no records.
    pub fn load_all(&self) -> Result<Vec<AnalysisRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("failed to open store {}", self.path.display()))?;

        let mut records = Vec::new();
        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("failed to read {}", self.path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: AnalysisRecord = serde_json::from_str(&line).with_context(|| {
                format!("invalid record on line {} of {}", i + 1, self.path.display())
            })?;
            records.push(record);
        }
        Ok(records)
    }
}

impl AnalysisStore for JsonlStore {
    fn append(&self, record: &AnalysisRecord) -> Result<()> {
        let line = serde_json::to_string(record).context("failed to serialize record")?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open store {}", self.path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to write to {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DetailExamResult, SuggestionBundle, SummaryResult, TopicStats, WorkingTimeAnalysis,
    };

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            exam_content: "Chemistry Final".into(),
            subject: "Chemistry".into(),
            language: "en".into(),
            score: 7.0,
            time: 300.0,
            working_time: 240.0,
            rating: Rating::Good,
            total_questions: 1,
            empty_answers: 0,
            correct_answers: 1,
            wrong_answers: 0,
            question_labels: vec![QuestionRecord {
                question_number: 1,
                label: "stoichiometry".into(),
                is_correct: true,
            }],
        }
    }

    fn result() -> AnalysisResult {
        AnalysisResult {
            summary: SummaryResult {
                exam_name: "Chemistry Final".into(),
                subject: "Chemistry".into(),
                score: 7.0,
                time: 300.0,
            },
            detail_exam_result: DetailExamResult {
                rating: Rating::Good,
                total_questions: 1,
                correct_answers: 1,
                wrong_answers: 0,
                empty_answers: 0,
            },
            topic_analysis: vec![TopicStats {
                topic: "stoichiometry".into(),
                question_count: 1,
                correct_count: 1,
                wrong_count: 0,
                correct_percentage: 100.0,
                incorrect_percentage: 0.0,
            }],
            working_time_analysis: WorkingTimeAnalysis {
                working_time: 240.0,
                average_speed: 300.0,
                time_spent: 240.0,
            },
            strengths: vec!["stoichiometry".into()],
            weaknesses: vec![],
            suggestions: SuggestionBundle {
                improvement_suggestions: "a".into(),
                time_analysis_suggestions: "b".into(),
                study_method_suggestions: "c".into(),
                next_exam_suggestions: "d".into(),
            },
        }
    }

    #[test]
    fn record_copies_request_fields() {
        let record = AnalysisRecord::new(&request(), result());
        assert_eq!(record.subject, "Chemistry");
        assert_eq!(record.rating, Rating::Good);
        assert_eq!(record.question_labels.len(), 1);
        assert_eq!(record.analysis_result.strengths, vec!["stoichiometry"]);
    }

    #[test]
    fn record_json_is_camel_case_with_flat_suggestions() {
        let record = AnalysisRecord::new(&request(), result());
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("totalQuestions").is_some());
        let analysis = &value["analysisResult"];
        assert_eq!(analysis["improvementSuggestions"], "a");
        assert_eq!(analysis["workingTimeAnalysis"]["averageSpeed"], 300.0);
        assert!(analysis.get("suggestions").is_none());
    }

    #[test]
    fn append_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStore::new(dir.path().join("nested/analyses.jsonl"));
        assert!(store.load_all().unwrap().is_empty());

        let first = AnalysisRecord::new(&request(), result());
        let second = AnalysisRecord::new(&request(), result());
        store.append(&first).unwrap();
        store.append(&second).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, first.id);
        assert_eq!(loaded[1].id, second.id);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn corrupt_line_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyses.jsonl");
        let store = JsonlStore::new(&path);
        store
            .append(&AnalysisRecord::new(&request(), result()))
            .unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"{not json}\n")
            .unwrap();

        let err = store.load_all().unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }
}
