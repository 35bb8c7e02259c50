//! Core data model types for exam-insight.
//!
//! These are the request and result types that flow through the analysis
//! pipeline. Field names use camelCase on the wire so stored records and
//! request files stay compatible with the HTTP API they originate from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One answered (or skipped) question, tagged with its topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    /// 1-based question number, unique within an exam.
    pub question_number: u32,
    /// Topic label (e.g. "geometry").
    pub label: String,
    /// Whether the learner answered this question correctly.
    pub is_correct: bool,
}

/// Rating attached to an exam attempt by the grading side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Weak,
    Average,
    Good,
    Excellent,
    Outstanding,
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rating::Weak => write!(f, "weak"),
            Rating::Average => write!(f, "average"),
            Rating::Good => write!(f, "good"),
            Rating::Excellent => write!(f, "excellent"),
            Rating::Outstanding => write!(f, "outstanding"),
        }
    }
}

impl FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weak" => Ok(Rating::Weak),
            "average" => Ok(Rating::Average),
            "good" => Ok(Rating::Good),
            "excellent" => Ok(Rating::Excellent),
            "outstanding" => Ok(Rating::Outstanding),
            other => Err(format!("unknown rating: {other}")),
        }
    }
}

/// Languages the prompt and fallback tables are written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    English,
    Vietnamese,
}

impl Language {
    /// Resolve a locale tag such as `"vi"` or `"en-US"`.
    ///
    /// Unsupported tags fall back to English.
    pub fn from_tag(tag: &str) -> Self {
        Self::from_str(tag).unwrap_or_default()
    }

    /// Whether `tag` names a language with its own templates.
    pub fn is_supported_tag(tag: &str) -> bool {
        Self::from_str(tag).is_ok()
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Vietnamese => "vi",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s.split(['-', '_']).next().unwrap_or_default();
        match primary.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "vi" | "vietnamese" => Ok(Language::Vietnamese),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

/// A single exam attempt submitted for analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Exam content or title (e.g. "Math Midterm Exam").
    pub exam_content: String,
    /// Subject of the exam.
    pub subject: String,
    /// Locale tag for the generated text.
    #[serde(default = "default_language_tag")]
    pub language: String,
    /// Score on a 0-10 scale.
    pub score: f64,
    /// Total time allotted, in seconds.
    pub time: f64,
    /// Time actually spent, in seconds.
    pub working_time: f64,
    pub rating: Rating,
    pub total_questions: u32,
    pub empty_answers: u32,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    /// Per-question topic labels and correctness.
    #[serde(default)]
    pub question_labels: Vec<QuestionRecord>,
}

fn default_language_tag() -> String {
    "en".to_string()
}

impl AnalysisRequest {
    /// The resolved output language.
    pub fn language(&self) -> Language {
        Language::from_tag(&self.language)
    }
}

/// Per-topic tallies derived from the question records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicStats {
    pub topic: String,
    pub question_count: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    /// `100 * correct_count / question_count`, unrounded.
    pub correct_percentage: f64,
    /// `100 * wrong_count / question_count`, unrounded.
    pub incorrect_percentage: f64,
}

/// The four coaching texts attached to every analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionBundle {
    pub improvement_suggestions: String,
    pub time_analysis_suggestions: String,
    pub study_method_suggestions: String,
    pub next_exam_suggestions: String,
}

/// Headline figures of the exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    pub exam_name: String,
    pub subject: String,
    pub score: f64,
    pub time: f64,
}

/// Answer counts of the exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailExamResult {
    pub rating: Rating,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    pub empty_answers: u32,
}

/// Per-question timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingTimeAnalysis {
    pub working_time: f64,
    /// Allotted seconds per question (`time / total_questions`).
    pub average_speed: f64,
    /// Spent seconds per question (`working_time / total_questions`).
    pub time_spent: f64,
}

/// The complete report produced for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: SummaryResult,
    pub detail_exam_result: DetailExamResult,
    pub topic_analysis: Vec<TopicStats>,
    pub working_time_analysis: WorkingTimeAnalysis,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    #[serde(flatten)]
    pub suggestions: SuggestionBundle,
}
