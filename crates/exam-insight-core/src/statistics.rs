//! Per-topic aggregation, strength/weakness classification, and timing.
//!
//! Everything here is pure: no I/O, no shared state, no failure modes.

use std::collections::HashMap;

use crate::model::{QuestionRecord, TopicStats, WorkingTimeAnalysis};

/// A topic at or above this correct percentage is a strength.
pub const STRENGTH_THRESHOLD: f64 = 80.0;

/// A topic strictly below this correct percentage is a weakness.
pub const WEAKNESS_THRESHOLD: f64 = 50.0;

/// Running counts for one topic while folding over the records.
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    total: u32,
    correct: u32,
}

impl Tally {
    fn record(mut self, is_correct: bool) -> Self {
        self.total += 1;
        if is_correct {
            self.correct += 1;
        }
        self
    }

    fn into_stats(self, topic: String) -> TopicStats {
        let wrong = self.total - self.correct;
        TopicStats {
            topic,
            question_count: self.total,
            correct_count: self.correct,
            wrong_count: wrong,
            correct_percentage: percentage(self.correct, self.total),
            incorrect_percentage: percentage(wrong, self.total),
        }
    }
}

fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    100.0 * part as f64 / whole as f64
}

/// Group question records by label into per-topic statistics.
///
/// Topics come out in order of first appearance. An empty input yields an
/// empty vector.
pub fn aggregate(records: &[QuestionRecord]) -> Vec<TopicStats> {
    let (order, tallies) = records.iter().fold(
        (Vec::<&str>::new(), HashMap::<&str, Tally>::new()),
        |(mut order, mut tallies), record| {
            let label = record.label.as_str();
            let tally = tallies.entry(label).or_insert_with(|| {
                order.push(label);
                Tally::default()
            });
            *tally = tally.record(record.is_correct);
            (order, tallies)
        },
    );

    order
        .into_iter()
        .map(|topic| tallies[topic].into_stats(topic.to_string()))
        .collect()
}

/// Topics whose correct percentage is at least [`STRENGTH_THRESHOLD`].
pub fn strengths(stats: &[TopicStats]) -> Vec<String> {
    stats
        .iter()
        .filter(|t| t.correct_percentage >= STRENGTH_THRESHOLD)
        .map(|t| t.topic.clone())
        .collect()
}

/// Topics whose correct percentage is below [`WEAKNESS_THRESHOLD`].
pub fn weaknesses(stats: &[TopicStats]) -> Vec<String> {
    stats
        .iter()
        .filter(|t| t.correct_percentage < WEAKNESS_THRESHOLD)
        .map(|t| t.topic.clone())
        .collect()
}

/// Per-question timing figures for an exam.
///
/// A zero question count yields zero rates rather than NaN.
pub fn working_time(time: f64, working_time: f64, total_questions: u32) -> WorkingTimeAnalysis {
    let per_question = |seconds: f64| {
        if total_questions == 0 {
            0.0
        } else {
            seconds / total_questions as f64
        }
    };

    WorkingTimeAnalysis {
        working_time,
        average_speed: per_question(time),
        time_spent: per_question(working_time),
    }
}
