//! Results and review assembly.
//!
//! A stored [`ExamResult`] carries snapshots of the answer key and title.
//! Reviews pair those snapshots with the exam as it exists now, judging
//! correctness against the snapshot and flagging any drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ExamError, Result};
use crate::model::{Exam, ExamResult, Question};
use crate::scoring::ScoreBand;
use crate::statistics::{exam_statistics, result_percentage, ExamStatistics};
use crate::traits::ExamStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Incorrect,
    Unanswered,
}

/// One question of a review, next to what the student picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    /// 1-based position in the exam.
    pub number: usize,
    pub question: Question,
    pub user_answer: Option<u32>,
    /// Correct option recorded at submission time.
    pub correct_answer: Option<u32>,
    pub outcome: Outcome,
    /// The live answer key disagrees with the snapshot.
    pub key_changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewView {
    pub exam: Exam,
    pub result_id: i64,
    pub items: Vec<ReviewItem>,
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    pub band: ScoreBand,
    pub time_spent_secs: u32,
    pub submitted_at: DateTime<Utc>,
    /// Question count or answer key changed since submission.
    pub desynced: bool,
}

impl ReviewView {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.items.iter().filter(|i| i.outcome == outcome).count()
    }
}

/// Build the review of `result` against exam `exam_id`.
#[tracing::instrument(skip(store, result), fields(result_id = result.id))]
pub async fn load_review(
    store: &dyn ExamStore,
    exam_id: i64,
    result: &ExamResult,
) -> Result<ReviewView> {
    let exam = store
        .get_exam(exam_id)
        .await?
        .ok_or_else(|| ExamError::not_found(format!("exam {exam_id}")))?;
    let questions = store.get_questions(exam_id).await?;
    if questions.is_empty() {
        return Err(ExamError::not_found(format!("no questions for exam {exam_id}")));
    }

    let mut desynced = questions.len() != result.total_questions as usize;
    let items: Vec<ReviewItem> = questions
        .into_iter()
        .enumerate()
        .map(|(i, question)| {
            let user_answer = result.answers.get(i).copied().flatten();
            let correct_answer = result.correct_answers.get(i).copied();
            let outcome = match user_answer {
                None => Outcome::Unanswered,
                Some(answer) if Some(answer) == correct_answer => Outcome::Correct,
                Some(_) => Outcome::Incorrect,
            };
            let key_changed = correct_answer != Some(question.correct_option);
            ReviewItem {
                number: i + 1,
                question,
                user_answer,
                correct_answer,
                outcome,
                key_changed,
            }
        })
        .collect();
    desynced |= items.iter().any(|i| i.key_changed);

    if desynced {
        tracing::warn!(
            live_questions = items.len(),
            recorded_questions = result.total_questions,
            "exam changed since submission; judging against the recorded key"
        );
    }

    let percentage = result_percentage(result).round() as u32;
    Ok(ReviewView {
        exam,
        result_id: result.id,
        items,
        score: result.score,
        total: result.total_questions,
        percentage,
        band: ScoreBand::from_percentage(percentage),
        time_spent_secs: result.time_spent_secs,
        submitted_at: result.submitted_at,
        desynced,
    })
}

/// A row of a student's results list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub result_id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    /// Live question count, or the recorded total if the exam is gone.
    pub question_count: u32,
    pub score: u32,
    pub total_questions: u32,
    pub percentage: u32,
    pub time_spent_secs: u32,
    pub submitted_at: DateTime<Utc>,
    /// `false` when the exam no longer exists.
    pub exam_available: bool,
}

/// Every result of `student_id`, newest first.
#[tracing::instrument(skip(store))]
pub async fn list_results_for_student(
    store: &dyn ExamStore,
    student_id: i64,
) -> Result<Vec<ResultSummary>> {
    let mut results = store.get_results_by_student(student_id).await?;
    results.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));

    let mut summaries = Vec::with_capacity(results.len());
    for result in results {
        let (exam_title, question_count, exam_available) =
            match store.get_exam(result.exam_id).await? {
                Some(exam) => {
                    let count = store.get_questions(exam.id).await?.len() as u32;
                    (exam.title, count, true)
                }
                None => (result.exam_title.clone(), result.total_questions, false),
            };
        summaries.push(ResultSummary {
            result_id: result.id,
            exam_id: result.exam_id,
            exam_title,
            question_count,
            score: result.score,
            total_questions: result.total_questions,
            percentage: result_percentage(&result).round() as u32,
            time_spent_secs: result.time_spent_secs,
            submitted_at: result.submitted_at,
            exam_available,
        });
    }
    Ok(summaries)
}

/// Everything the instructor statistics screen shows for one exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamReport {
    pub exam: Exam,
    pub question_count: usize,
    /// Newest first.
    pub results: Vec<ExamResult>,
    pub statistics: Option<ExamStatistics>,
}

#[tracing::instrument(skip(store))]
pub async fn exam_report(store: &dyn ExamStore, exam_id: i64) -> Result<ExamReport> {
    let exam = store
        .get_exam(exam_id)
        .await?
        .ok_or_else(|| ExamError::not_found(format!("exam {exam_id}")))?;
    let question_count = store.get_questions(exam_id).await?.len();

    let mut results = store.get_results_by_exam(exam_id).await?;
    results.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
    let statistics = exam_statistics(&results);

    Ok(ExamReport {
        exam,
        question_count,
        results,
        statistics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authoring::{ExamDraft, QuestionDraft};
    use crate::memory::MemoryStore;
    use crate::model::NewResult;
    use chrono::Duration;

    async fn algebra(store: &MemoryStore) -> Exam {
        store
            .create_exam(&ExamDraft {
                title: "Algebra".into(),
                duration_minutes: 1,
                questions: [1, 0]
                    .into_iter()
                    .enumerate()
                    .map(|(i, correct)| QuestionDraft {
                        text: format!("Q{i}"),
                        options: vec!["a".into(), "b".into()],
                        correct_option: correct,
                        explanation: Some("because".into()),
                    })
                    .collect(),
            })
            .await
            .unwrap()
    }

    async fn submit(
        store: &MemoryStore,
        exam: &Exam,
        student_id: i64,
        answers: Vec<Option<u32>>,
        minutes_ago: i64,
    ) -> ExamResult {
        let correct = vec![1, 0];
        store
            .insert_result(&NewResult {
                exam_id: exam.id,
                student_id,
                score: crate::scoring::compute_score(&answers, &correct),
                answers,
                correct_answers: correct,
                time_spent_secs: 60,
                exam_title: exam.title.clone(),
                total_questions: 2,
                submitted_at: Utc::now() - Duration::minutes(minutes_ago),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn review_marks_each_outcome() {
        let store = MemoryStore::new();
        let exam = algebra(&store).await;
        let result = submit(&store, &exam, 5, vec![Some(1), None], 0).await;

        let review = load_review(&store, exam.id, &result).await.unwrap();
        assert_eq!(review.items[0].outcome, Outcome::Correct);
        assert_eq!(review.items[1].outcome, Outcome::Unanswered);
        assert_eq!(review.items[1].number, 2);
        assert_eq!(review.score, 1);
        assert_eq!(review.percentage, 50);
        assert_eq!(review.band, ScoreBand::Low);
        assert!(!review.desynced);
        assert_eq!(review.count(Outcome::Incorrect), 0);
    }

    #[tokio::test]
    async fn changed_key_is_flagged_but_snapshot_wins() {
        let store = MemoryStore::new();
        let exam = algebra(&store).await;
        let result = submit(&store, &exam, 5, vec![Some(1), Some(0)], 0).await;

        let mut edited = store.get_questions(exam.id).await.unwrap()[0].clone();
        edited.correct_option = 0;
        store.replace_question(edited).unwrap();

        let review = load_review(&store, exam.id, &result).await.unwrap();
        assert!(review.desynced);
        assert!(review.items[0].key_changed);
        assert_eq!(review.items[0].outcome, Outcome::Correct);
        assert_eq!(review.band, ScoreBand::High);
    }

    #[tokio::test]
    async fn review_of_missing_exam_is_not_found() {
        let store = MemoryStore::new();
        let exam = algebra(&store).await;
        let result = submit(&store, &exam, 5, vec![None, None], 0).await;
        let err = load_review(&store, 999, &result).await.unwrap_err();
        assert!(matches!(err, ExamError::NotFound(_)));
    }

    #[tokio::test]
    async fn student_results_newest_first() {
        let store = MemoryStore::new();
        let exam = algebra(&store).await;
        let older = submit(&store, &exam, 5, vec![Some(0), Some(0)], 30).await;
        let newer = submit(&store, &exam, 5, vec![Some(1), Some(0)], 1).await;
        submit(&store, &exam, 6, vec![Some(1), Some(0)], 2).await;

        let rows = list_results_for_student(&store, 5).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].result_id, newer.id);
        assert_eq!(rows[0].percentage, 100);
        assert_eq!(rows[1].result_id, older.id);
        assert_eq!(rows[1].question_count, 2);
        assert!(rows[1].exam_available);
    }

    #[tokio::test]
    async fn results_of_deleted_exam_fall_back_to_snapshot() {
        let store = MemoryStore::new();
        let exam = algebra(&store).await;
        let mut ghost = exam.clone();
        ghost.id = 4242;
        ghost.title = "Retired".into();
        submit(&store, &ghost, 5, vec![Some(1), None], 0).await;

        let rows = list_results_for_student(&store, 5).await.unwrap();
        assert_eq!(rows[0].exam_title, "Retired");
        assert_eq!(rows[0].question_count, 2);
        assert!(!rows[0].exam_available);
    }

    #[tokio::test]
    async fn report_carries_statistics() {
        let store = MemoryStore::new();
        let exam = algebra(&store).await;
        let empty = exam_report(&store, exam.id).await.unwrap();
        assert!(empty.statistics.is_none());
        assert_eq!(empty.question_count, 2);

        submit(&store, &exam, 5, vec![Some(1), Some(0)], 5).await;
        submit(&store, &exam, 6, vec![Some(1), None], 1).await;
        let report = exam_report(&store, exam.id).await.unwrap();
        let stats = report.statistics.unwrap();
        assert_eq!(stats.total_students, 2);
        assert_eq!(stats.average_score, 75);
        assert_eq!(stats.highest_score, 100);
        assert_eq!(stats.lowest_score, 50);
        assert_eq!(report.results[0].student_id, 6);
    }
}
