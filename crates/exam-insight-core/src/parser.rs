//! Structured-reply parser with fixed fallback.
//!
//! Backends answer in free-form text with four numbered items. The reply is
//! split on every "digit, period, whitespace" marker and the sections are
//! picked by position, not by content: segment 1 is the improvement text,
//! 2 time analysis, 3 study method, 4 next exam. Segment 0 is whatever
//! preceded the first marker and is discarded.
//!
//! The split is deliberately naive. A sentence such as "aim for 9. Then
//! review" inside an item also splits, which shifts later sections. Callers
//! depend on this positional behavior, so it must not be made smarter.

use crate::fallback::{FallbackTable, ScoreBucket, TimeAdvice};
use crate::model::SuggestionBundle;

/// The four sections of a reply, each `None` when missing or blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReply {
    pub improvement: Option<String>,
    pub time_analysis: Option<String>,
    pub study_method: Option<String>,
    pub next_exam: Option<String>,
}

impl ParsedReply {
    /// Number of sections that were found.
    pub fn found(&self) -> usize {
        [
            &self.improvement,
            &self.time_analysis,
            &self.study_method,
            &self.next_exam,
        ]
        .iter()
        .filter(|s| s.is_some())
        .count()
    }

    /// Fill every missing section from the fallback table.
    pub fn complete(
        self,
        table: &FallbackTable,
        bucket: ScoreBucket,
        advice: TimeAdvice,
    ) -> SuggestionBundle {
        SuggestionBundle {
            improvement_suggestions: self
                .improvement
                .unwrap_or_else(|| table.improvement(bucket).to_string()),
            time_analysis_suggestions: self
                .time_analysis
                .unwrap_or_else(|| table.time_analysis(advice).to_string()),
            study_method_suggestions: self
                .study_method
                .unwrap_or_else(|| table.study_method().to_string()),
            next_exam_suggestions: self
                .next_exam
                .unwrap_or_else(|| table.next_exam().to_string()),
        }
    }
}

/// Split `text` on every ASCII digit followed by `.` and one or more
/// whitespace characters. The markers themselves are dropped.
pub fn split_numbered(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i].is_ascii_digit() && bytes[i + 1] == b'.' {
            let rest = &text[i + 2..];
            let ws_len: usize = rest
                .chars()
                .take_while(|c| c.is_whitespace())
                .map(char::len_utf8)
                .sum();
            if ws_len > 0 {
                segments.push(&text[start..i]);
                start = i + 2 + ws_len;
                i = start;
                continue;
            }
        }
        i += 1;
    }

    segments.push(&text[start..]);
    segments
}

fn section(segments: &[&str], index: usize) -> Option<String> {
    segments
        .get(index)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse a backend reply into its four positional sections.
pub fn parse_reply(text: &str) -> ParsedReply {
    let segments = split_numbered(text);
    ParsedReply {
        improvement: section(&segments, 1),
        time_analysis: section(&segments, 2),
        study_method: section(&segments, 3),
        next_exam: section(&segments, 4),
    }
}
