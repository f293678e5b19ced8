use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use examkit_core::model::ExamResult;
use examkit_core::scoring::compute_score;
use examkit_core::statistics::{exam_statistics, score_distribution};

fn make_answers(n: usize) -> (Vec<Option<u32>>, Vec<u32>) {
    let correct: Vec<u32> = (0..n).map(|i| (i % 4) as u32).collect();
    let answers = (0..n)
        .map(|i| match i % 5 {
            0 => None,
            1 => Some(((i + 1) % 4) as u32),
            _ => Some((i % 4) as u32),
        })
        .collect();
    (answers, correct)
}

fn make_results(n: usize) -> Vec<ExamResult> {
    (0..n)
        .map(|i| ExamResult {
            id: i as i64,
            exam_id: 1,
            student_id: (i % 37) as i64,
            score: (i % 21) as u32,
            answers: vec![],
            correct_answers: vec![],
            time_spent_secs: 600,
            exam_title: "bench".into(),
            total_questions: 20,
            submitted_at: Utc::now(),
        })
        .collect()
}

fn bench_compute_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_score");

    for n in [10, 100, 1000] {
        let (answers, correct) = make_answers(n);
        group.bench_function(format!("questions={n}"), |b| {
            b.iter(|| compute_score(black_box(&answers), black_box(&correct)))
        });
    }

    group.finish();
}

fn bench_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("statistics");
    let results = make_results(1000);

    group.bench_function("distribution/1000", |b| {
        b.iter(|| score_distribution(black_box(&results)))
    });

    group.bench_function("exam_statistics/1000", |b| {
        b.iter(|| exam_statistics(black_box(&results)))
    });

    group.finish();
}

criterion_group!(benches, bench_compute_score, bench_statistics);
criterion_main!(benches);
