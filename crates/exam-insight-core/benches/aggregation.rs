use criterion::{black_box, criterion_group, criterion_main, Criterion};

use exam_insight_core::model::QuestionRecord;
use exam_insight_core::statistics::{aggregate, strengths, weaknesses};

const TOPICS: [&str; 6] = [
    "algebra",
    "geometry",
    "calculus",
    "probability",
    "statistics",
    "trigonometry",
];

fn make_questions(n: u32) -> Vec<QuestionRecord> {
    (1..=n)
        .map(|i| QuestionRecord {
            question_number: i,
            label: TOPICS[i as usize % TOPICS.len()].to_string(),
            is_correct: i % 3 != 0,
        })
        .collect()
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for n in [10, 100, 1000] {
        let questions = make_questions(n);
        group.bench_function(format!("questions={n}"), |b| {
            b.iter(|| aggregate(black_box(&questions)))
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let stats = aggregate(&make_questions(1000));

    c.bench_function("strengths_and_weaknesses", |b| {
        b.iter(|| {
            (
                strengths(black_box(&stats)),
                weaknesses(black_box(&stats)),
            )
        })
    });
}

criterion_group!(benches, bench_aggregate, bench_classify);
criterion_main!(benches);
