//! Localized prompt construction for suggestion generation.
//!
//! The whole prompt is written in the learner's language so the backend
//! answers in that language too.

use crate::fallback::{ScoreBucket, TimeSignal};
use crate::model::{Language, TopicStats};

/// Everything the suggestion step needs to know about one exam attempt.
#[derive(Debug, Clone, Copy)]
pub struct SuggestionContext<'a> {
    pub subject: &'a str,
    /// Score on a 0-10 scale.
    pub score: f64,
    /// Allotted seconds per question.
    pub average_speed: f64,
    /// Spent seconds per question.
    pub time_spent: f64,
    pub strengths: &'a [String],
    pub weaknesses: &'a [String],
    pub topic_stats: &'a [TopicStats],
    pub language: Language,
}

impl SuggestionContext<'_> {
    pub fn score_bucket(&self) -> ScoreBucket {
        ScoreBucket::from_score(self.score)
    }

    pub fn time_signal(&self) -> TimeSignal {
        TimeSignal::from_rates(self.average_speed, self.time_spent)
    }
}

struct PromptTemplate {
    intro: &'static str,
    subject: &'static str,
    score: &'static str,
    average_speed: &'static str,
    time_spent: &'static str,
    unit: &'static str,
    strengths: &'static str,
    weaknesses: &'static str,
    none: &'static str,
    breakdown: &'static str,
    correct: &'static str,
    questions: &'static str,
    request: &'static str,
    improvement: &'static str,
    /// Indexed low, medium, high.
    bucket_names: [&'static str; 3],
    /// Indexed low, medium, high.
    bucket_guidance: [&'static str; 3],
    time_analysis: &'static str,
    /// Fast-but-low-score, slow-but-high-score, balanced.
    time_cases: [&'static str; 3],
    study_method: &'static str,
    next_exam: &'static str,
    closing: &'static str,
}

static ENGLISH: PromptTemplate = PromptTemplate {
    intro: "As an educational AI assistant, provide personalized learning recommendations based on the following exam analysis.",
    subject: "Subject",
    score: "Overall score",
    average_speed: "Average speed (allotted time per question)",
    time_spent: "Time spent per question",
    unit: "seconds/question",
    strengths: "Strengths (topics with at least 80% correct)",
    weaknesses: "Weaknesses (topics with less than 50% correct)",
    none: "None",
    breakdown: "Topic breakdown",
    correct: "correct",
    questions: "questions",
    request: "Please provide four separate recommendations:",
    improvement: "Improvement suggestions based on the score",
    bucket_names: ["low", "medium", "high"],
    bucket_guidance: [
        "the learner needs to rebuild the fundamentals, so focus on core concepts and simple, confidence-building practice",
        "the learner has a reasonable base, so focus on closing the gaps in the weak topics and avoiding careless mistakes",
        "the learner is performing well, so focus on keeping good habits and moving on to more challenging material",
    ],
    time_analysis: "Time management analysis comparing the time spent per question with the allotted time.",
    time_cases: [
        "If the learner answered quickly but scored low, advise slowing down and reading questions carefully.",
        "If the learner was slow but scored high, advise practicing under time pressure to gain speed without losing accuracy.",
        "Otherwise, advise how to keep a good balance between speed and accuracy.",
    ],
    study_method: "Study method suggestions for the weak topics",
    next_exam: "Recommendations for what type of exam or practice to try next",
    closing: "Answer in English. Start each recommendation with its number (1. 2. 3. 4.).",
};

static VIETNAMESE: PromptTemplate = PromptTemplate {
    intro: "Với vai trò là trợ lý học tập AI, hãy đưa ra các gợi ý học tập cá nhân hóa dựa trên kết quả phân tích bài thi sau.",
    subject: "Môn học",
    score: "Điểm tổng",
    average_speed: "Tốc độ trung bình (thời gian cho phép mỗi câu)",
    time_spent: "Thời gian thực tế mỗi câu",
    unit: "giây/câu",
    strengths: "Điểm mạnh (chủ đề đúng từ 80% trở lên)",
    weaknesses: "Điểm yếu (chủ đề đúng dưới 50%)",
    none: "Không có",
    breakdown: "Chi tiết theo chủ đề",
    correct: "đúng",
    questions: "câu",
    request: "Hãy đưa ra bốn gợi ý riêng biệt:",
    improvement: "Gợi ý cải thiện dựa trên điểm số",
    bucket_names: ["thấp", "trung bình", "cao"],
    bucket_guidance: [
        "người học cần củng cố lại nền tảng, hãy tập trung vào các khái niệm cốt lõi và bài tập đơn giản để lấy lại sự tự tin",
        "người học đã có nền tảng khá, hãy tập trung khắc phục các chủ đề còn yếu và tránh lỗi bất cẩn",
        "người học đang làm tốt, hãy tập trung duy trì thói quen tốt và chuyển sang các nội dung thử thách hơn",
    ],
    time_analysis: "Phân tích thời gian làm bài, so sánh thời gian thực tế mỗi câu với thời gian cho phép.",
    time_cases: [
        "Nếu người học làm nhanh nhưng điểm thấp, hãy khuyên họ chậm lại và đọc kỹ đề.",
        "Nếu người học làm chậm nhưng điểm cao, hãy khuyên họ luyện tập với giới hạn thời gian để tăng tốc mà vẫn chính xác.",
        "Các trường hợp còn lại, hãy khuyên cách giữ cân bằng giữa tốc độ và độ chính xác.",
    ],
    study_method: "Gợi ý phương pháp học cho các chủ đề còn yếu",
    next_exam: "Gợi ý loại bài kiểm tra hoặc bài luyện tập nên thử tiếp theo",
    closing: "Trả lời bằng tiếng Việt. Bắt đầu mỗi gợi ý bằng số thứ tự của nó (1. 2. 3. 4.).",
};

fn template(language: Language) -> &'static PromptTemplate {
    match language {
        Language::English => &ENGLISH,
        Language::Vietnamese => &VIETNAMESE,
    }
}

fn join_or<'a>(items: &[String], none: &'a str) -> std::borrow::Cow<'a, str> {
    if items.is_empty() {
        none.into()
    } else {
        items.join(", ").into()
    }
}

/// Build the instruction block sent to the text backend.
pub fn build_prompt(ctx: &SuggestionContext<'_>) -> String {
    let t = template(ctx.language);
    let bucket = match ctx.score_bucket() {
        ScoreBucket::Low => 0,
        ScoreBucket::Medium => 1,
        ScoreBucket::High => 2,
    };

    let mut prompt = String::new();
    prompt.push_str(t.intro);
    prompt.push_str("\n\n");

    prompt.push_str(&format!("{}: {}\n", t.subject, ctx.subject));
    prompt.push_str(&format!("{}: {:.1}/10\n", t.score, ctx.score));
    prompt.push_str(&format!(
        "{}: {:.1} {}\n",
        t.average_speed, ctx.average_speed, t.unit
    ));
    prompt.push_str(&format!("{}: {:.1} {}\n", t.time_spent, ctx.time_spent, t.unit));
    prompt.push_str(&format!(
        "{}: {}\n",
        t.strengths,
        join_or(ctx.strengths, t.none)
    ));
    prompt.push_str(&format!(
        "{}: {}\n\n",
        t.weaknesses,
        join_or(ctx.weaknesses, t.none)
    ));

    prompt.push_str(&format!("{}:\n", t.breakdown));
    if ctx.topic_stats.is_empty() {
        prompt.push_str(&format!("- {}\n", t.none));
    }
    for topic in ctx.topic_stats {
        prompt.push_str(&format!(
            "- {}: {:.1}% {} ({} {})\n",
            topic.topic, topic.correct_percentage, t.correct, topic.question_count, t.questions
        ));
    }
    prompt.push('\n');

    prompt.push_str(t.request);
    prompt.push('\n');
    prompt.push_str(&format!(
        "1. {} ({}: {})\n",
        t.improvement, t.bucket_names[bucket], t.bucket_guidance[bucket]
    ));
    prompt.push_str(&format!(
        "2. {} {} {} {}\n",
        t.time_analysis, t.time_cases[0], t.time_cases[1], t.time_cases[2]
    ));
    prompt.push_str(&format!(
        "3. {}: {}\n",
        t.study_method,
        join_or(ctx.weaknesses, t.none)
    ));
    prompt.push_str(&format!("4. {}\n\n", t.next_exam));
    prompt.push_str(t.closing);

    prompt
}
