//! Deterministic, localized suggestion text.
//!
//! Used field-by-field when a backend reply is missing a section, and for
//! the whole bundle when the backend call fails. The text lives in one
//! table per language, indexed by score bucket and time advice.

use crate::model::{Language, SuggestionBundle};

/// Spent/allotted time ratio below which an attempt counts as rushed.
pub const RUSHING_RATIO: f64 = 0.5;

/// Spent/allotted time ratio at or above which an attempt counts as slow.
pub const SLOW_RATIO: f64 = 0.9;

/// Three-way performance bucket on the 0-10 score scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreBucket {
    /// `score < 5`
    Low,
    /// `5 <= score < 8`
    Medium,
    /// `score >= 8`
    High,
}

impl ScoreBucket {
    pub fn from_score(score: f64) -> Self {
        if score < 5.0 {
            ScoreBucket::Low
        } else if score < 8.0 {
            ScoreBucket::Medium
        } else {
            ScoreBucket::High
        }
    }

    fn index(self) -> usize {
        match self {
            ScoreBucket::Low => 0,
            ScoreBucket::Medium => 1,
            ScoreBucket::High => 2,
        }
    }
}

/// How much of the allotted per-question time the learner used.
///
/// Derived from `time_spent / average_speed`, i.e. spent seconds per
/// question over allotted seconds per question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeSignal {
    Rushing,
    Steady,
    Slow,
}

impl TimeSignal {
    pub fn from_rates(average_speed: f64, time_spent: f64) -> Self {
        if average_speed <= 0.0 || !average_speed.is_finite() || !time_spent.is_finite() {
            return TimeSignal::Steady;
        }
        let ratio = time_spent / average_speed;
        if ratio < RUSHING_RATIO {
            TimeSignal::Rushing
        } else if ratio >= SLOW_RATIO {
            TimeSignal::Slow
        } else {
            TimeSignal::Steady
        }
    }
}

/// Which time-management text applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeAdvice {
    /// Fast but low score.
    Rushing,
    /// Slow despite a high score.
    SlowDespiteGoodResults,
    /// Everything else.
    Balance,
}

impl TimeAdvice {
    pub fn decide(bucket: ScoreBucket, signal: TimeSignal) -> Self {
        match (bucket, signal) {
            (ScoreBucket::Low, TimeSignal::Rushing) => TimeAdvice::Rushing,
            (ScoreBucket::High, TimeSignal::Slow) => TimeAdvice::SlowDespiteGoodResults,
            _ => TimeAdvice::Balance,
        }
    }

    fn index(self) -> usize {
        match self {
            TimeAdvice::Rushing => 0,
            TimeAdvice::SlowDespiteGoodResults => 1,
            TimeAdvice::Balance => 2,
        }
    }
}

/// Canned suggestion text for one language.
#[derive(Debug)]
pub struct FallbackTable {
    /// Indexed by [`ScoreBucket`]: low, medium, high.
    improvement: [&'static str; 3],
    /// Indexed by [`TimeAdvice`]: rushing, slow, balance.
    time_analysis: [&'static str; 3],
    study_method: &'static str,
    next_exam: &'static str,
}

impl FallbackTable {
    pub fn for_language(language: Language) -> &'static FallbackTable {
        match language {
            Language::English => &ENGLISH,
            Language::Vietnamese => &VIETNAMESE,
        }
    }

    pub fn improvement(&self, bucket: ScoreBucket) -> &'static str {
        self.improvement[bucket.index()]
    }

    pub fn time_analysis(&self, advice: TimeAdvice) -> &'static str {
        self.time_analysis[advice.index()]
    }

    pub fn study_method(&self) -> &'static str {
        self.study_method
    }

    pub fn next_exam(&self) -> &'static str {
        self.next_exam
    }

    /// The complete fallback bundle for a bucket and time advice.
    pub fn bundle(&self, bucket: ScoreBucket, advice: TimeAdvice) -> SuggestionBundle {
        SuggestionBundle {
            improvement_suggestions: self.improvement(bucket).to_string(),
            time_analysis_suggestions: self.time_analysis(advice).to_string(),
            study_method_suggestions: self.study_method().to_string(),
            next_exam_suggestions: self.next_exam().to_string(),
        }
    }
}

/// Fallback bundle for the given language, score, and per-question timing.
pub fn fallback_bundle(
    language: Language,
    score: f64,
    average_speed: f64,
    time_spent: f64,
) -> SuggestionBundle {
    let bucket = ScoreBucket::from_score(score);
    let advice = TimeAdvice::decide(bucket, TimeSignal::from_rates(average_speed, time_spent));
    FallbackTable::for_language(language).bundle(bucket, advice)
}

static ENGLISH: FallbackTable = FallbackTable {
    improvement: [
        "Focus on mastering the basic concepts before moving to advanced topics.",
        "Continue practicing the weak topics to improve your overall performance.",
        "Maintain your study habits and consider exploring more advanced material.",
    ],
    time_analysis: [
        "You finished quickly but the score is low. Slow down, read each question carefully, and check your answers before submitting.",
        "Your results are good, but you used most of the available time. Practice timed exercises to answer faster while keeping your accuracy.",
        "Keep balancing speed and accuracy: budget your time per question and leave a few minutes at the end to review your answers.",
    ],
    study_method: "Use a combination of textbooks, video tutorials, and practice problems. Review mistakes carefully to understand where you went wrong.",
    next_exam: "Try a practice exam that focuses specifically on your weak areas to measure your improvement.",
};

static VIETNAMESE: FallbackTable = FallbackTable {
    improvement: [
        "Hãy tập trung nắm vững các kiến thức cơ bản trước khi chuyển sang các chủ đề nâng cao.",
        "Hãy tiếp tục luyện tập các chủ đề còn yếu để cải thiện kết quả tổng thể.",
        "Hãy duy trì thói quen học tập hiện tại và tìm hiểu thêm các nội dung nâng cao.",
    ],
    time_analysis: [
        "Bạn làm bài khá nhanh nhưng điểm số còn thấp. Hãy chậm lại, đọc kỹ từng câu hỏi và kiểm tra lại đáp án trước khi nộp bài.",
        "Kết quả của bạn tốt nhưng bạn đã dùng gần hết thời gian làm bài. Hãy luyện tập làm bài có giới hạn thời gian để trả lời nhanh hơn mà vẫn giữ được độ chính xác.",
        "Hãy tiếp tục cân bằng giữa tốc độ và độ chính xác: phân bổ thời gian cho từng câu hỏi và dành vài phút cuối để xem lại bài.",
    ],
    study_method: "Kết hợp sách giáo khoa, video bài giảng và bài tập thực hành. Xem lại kỹ các lỗi sai để hiểu mình đã sai ở đâu.",
    next_exam: "Hãy thử một bài kiểm tra luyện tập tập trung vào các chủ đề còn yếu để đánh giá mức độ tiến bộ của bạn.",
};
