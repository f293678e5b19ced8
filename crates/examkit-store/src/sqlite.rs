//! SQLite-backed store.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::types::Json;
use tracing::{debug, info, instrument};

use examkit_core::authoring::ExamDraft;
use examkit_core::error::StoreError;
use examkit_core::model::{
    Exam, ExamResult, ExamSummary, NewResult, NewUser, Question, QuizProgress, Role, User,
};
use examkit_core::traits::{ExamStore, UserStore};

use crate::config::DatabaseConfig;
use crate::schema::{CURRENT_SCHEMA, DEMO_PASSWORD, DEMO_USERS};

fn db_err(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolClosed => StoreError::Closed,
        other => StoreError::Database(other.to_string()),
    }
}

fn corrupt(what: &str, reason: impl ToString) -> StoreError {
    StoreError::Corrupt {
        what: what.to_string(),
        reason: reason.to_string(),
    }
}

fn to_u32(value: i64, what: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| corrupt(what, format!("{value} is out of range")))
}

fn decode_json<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| corrupt(what, e))
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
    display_name: String,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            role: Role::from_str(&row.role).map_err(|e| corrupt("users.role", e))?,
            id: row.id,
            username: row.username,
            password: row.password,
            display_name: row.display_name,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExamRow {
    id: i64,
    title: String,
    duration_minutes: i64,
}

impl TryFrom<ExamRow> for Exam {
    type Error = StoreError;

    fn try_from(row: ExamRow) -> Result<Self, Self::Error> {
        Ok(Exam {
            id: row.id,
            title: row.title,
            duration_minutes: to_u32(row.duration_minutes, "exams.duration_minutes")?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ExamSummaryRow {
    id: i64,
    title: String,
    duration_minutes: i64,
    question_count: i64,
}

#[derive(sqlx::FromRow)]
struct QuestionRow {
    id: i64,
    exam_id: i64,
    text: String,
    options: String,
    correct_option: i64,
    explanation: Option<String>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = StoreError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let options: Vec<String> = decode_json(&row.options, "questions.options")?;
        let correct_option = to_u32(row.correct_option, "questions.correct_option")?;
        if correct_option as usize >= options.len() {
            return Err(corrupt(
                "questions.correct_option",
                format!(
                    "question {} points at option {correct_option} of {}",
                    row.id,
                    options.len()
                ),
            ));
        }
        Ok(Question {
            id: row.id,
            exam_id: row.exam_id,
            text: row.text,
            options,
            correct_option,
            explanation: row.explanation,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProgressRow {
    exam_id: i64,
    user_id: i64,
    answers: String,
    last_updated: DateTime<Utc>,
    time_left_secs: i64,
}

impl TryFrom<ProgressRow> for QuizProgress {
    type Error = StoreError;

    fn try_from(row: ProgressRow) -> Result<Self, Self::Error> {
        Ok(QuizProgress {
            exam_id: row.exam_id,
            user_id: row.user_id,
            answers: decode_json(&row.answers, "quiz_progress.answers")?,
            last_updated: row.last_updated,
            time_left_secs: to_u32(row.time_left_secs, "quiz_progress.time_left_secs")?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ResultRow {
    id: i64,
    exam_id: i64,
    student_id: i64,
    score: i64,
    answers: String,
    correct_answers: String,
    time_spent_secs: i64,
    exam_title: String,
    total_questions: i64,
    submitted_at: DateTime<Utc>,
}

impl TryFrom<ResultRow> for ExamResult {
    type Error = StoreError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        Ok(ExamResult {
            id: row.id,
            exam_id: row.exam_id,
            student_id: row.student_id,
            score: to_u32(row.score, "results.score")?,
            answers: decode_json(&row.answers, "results.answers")?,
            correct_answers: decode_json(&row.correct_answers, "results.correct_answers")?,
            time_spent_secs: to_u32(row.time_spent_secs, "results.time_spent_secs")?,
            exam_title: row.exam_title,
            total_questions: to_u32(row.total_questions, "results.total_questions")?,
            submitted_at: row.submitted_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const RESULT_COLUMNS: &str = "id, exam_id, student_id, score, answers, correct_answers, \
     time_spent_secs, exam_title, total_questions, submitted_at";

/// An [`ExamStore`] + [`UserStore`] over a SQLite connection pool.
///
/// Construct with [`SqliteStore::open`]; every call after [`close`](Self::close)
/// fails with [`StoreError::Closed`].
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect, apply the schema and optionally seed the demo accounts.
    #[instrument(skip_all, fields(url = %config.url))]
    pub async fn open(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(db_err)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `sqlite::memory:` is its own database, so an
        // in-memory store must keep exactly one connection alive.
        let pool_options = if config.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await.map_err(db_err)?;
        sqlx::raw_sql(CURRENT_SCHEMA)
            .execute(&pool)
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        if config.seed_demo_users {
            store.seed_demo_users().await?;
        }
        info!("store opened");
        Ok(store)
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("store closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    fn pool(&self) -> Result<&SqlitePool, StoreError> {
        if self.pool.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(&self.pool)
        }
    }

    async fn seed_demo_users(&self) -> Result<(), StoreError> {
        for (username, display_name, role) in DEMO_USERS {
            let inserted = sqlx::query(
                "INSERT OR IGNORE INTO users (username, password, display_name, role)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(*username)
            .bind(DEMO_PASSWORD)
            .bind(*display_name)
            .bind(*role)
            .execute(self.pool()?)
            .await
            .map_err(db_err)?
            .rows_affected();
            if inserted > 0 {
                debug!(username, "seeded demo user");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ExamStore for SqliteStore {
    #[instrument(skip(self))]
    async fn get_exam(&self, id: i64) -> Result<Option<Exam>, StoreError> {
        sqlx::query_as::<_, ExamRow>("SELECT id, title, duration_minutes FROM exams WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool()?)
            .await
            .map_err(db_err)?
            .map(Exam::try_from)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn get_questions(&self, exam_id: i64) -> Result<Vec<Question>, StoreError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            "SELECT id, exam_id, text, options, correct_option, explanation
             FROM questions
             WHERE exam_id = ?
             ORDER BY id",
        )
        .bind(exam_id)
        .fetch_all(self.pool()?)
        .await
        .map_err(db_err)?;
        convert_all(rows)
    }

    async fn list_exams(&self) -> Result<Vec<ExamSummary>, StoreError> {
        let rows = sqlx::query_as::<_, ExamSummaryRow>(
            "SELECT e.id, e.title, e.duration_minutes, COUNT(q.id) AS question_count
             FROM exams e
             LEFT JOIN questions q ON q.exam_id = e.id
             GROUP BY e.id
             ORDER BY e.id",
        )
        .fetch_all(self.pool()?)
        .await
        .map_err(db_err)?;

        rows.into_iter()
            .map(|row| {
                Ok(ExamSummary {
                    id: row.id,
                    title: row.title,
                    duration_minutes: to_u32(row.duration_minutes, "exams.duration_minutes")?,
                    question_count: to_u32(row.question_count, "question count")?,
                })
            })
            .collect()
    }

    #[instrument(skip_all, fields(title = %draft.title))]
    async fn create_exam(&self, draft: &ExamDraft) -> Result<Exam, StoreError> {
        let mut tx = self.pool()?.begin().await.map_err(db_err)?;

        let exam_id = sqlx::query("INSERT INTO exams (title, duration_minutes) VALUES (?, ?)")
            .bind(&draft.title)
            .bind(i64::from(draft.duration_minutes))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .last_insert_rowid();

        for question in &draft.questions {
            sqlx::query(
                "INSERT INTO questions (exam_id, text, options, correct_option, explanation)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(exam_id)
            .bind(&question.text)
            .bind(Json(&question.options))
            .bind(i64::from(question.correct_option))
            .bind(question.explanation.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        debug!(exam_id, questions = draft.questions.len(), "exam stored");

        Ok(Exam {
            id: exam_id,
            title: draft.title.clone(),
            duration_minutes: draft.duration_minutes,
        })
    }

    async fn get_progress(
        &self,
        exam_id: i64,
        user_id: i64,
    ) -> Result<Option<QuizProgress>, StoreError> {
        sqlx::query_as::<_, ProgressRow>(
            "SELECT exam_id, user_id, answers, last_updated, time_left_secs
             FROM quiz_progress
             WHERE exam_id = ? AND user_id = ?",
        )
        .bind(exam_id)
        .bind(user_id)
        .fetch_optional(self.pool()?)
        .await
        .map_err(db_err)?
        .map(QuizProgress::try_from)
        .transpose()
    }

    async fn upsert_progress(&self, progress: &QuizProgress) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO quiz_progress (exam_id, user_id, answers, last_updated, time_left_secs)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (exam_id, user_id) DO UPDATE SET
                 answers = excluded.answers,
                 last_updated = excluded.last_updated,
                 time_left_secs = excluded.time_left_secs",
        )
        .bind(progress.exam_id)
        .bind(progress.user_id)
        .bind(Json(&progress.answers))
        .bind(progress.last_updated)
        .bind(i64::from(progress.time_left_secs))
        .execute(self.pool()?)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_progress(&self, exam_id: i64, user_id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM quiz_progress WHERE exam_id = ? AND user_id = ?")
            .bind(exam_id)
            .bind(user_id)
            .execute(self.pool()?)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_progress_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        Ok(sqlx::query("DELETE FROM quiz_progress WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool()?)
            .await
            .map_err(db_err)?
            .rows_affected())
    }

    #[instrument(skip_all, fields(exam_id = result.exam_id, student_id = result.student_id))]
    async fn insert_result(&self, result: &NewResult) -> Result<ExamResult, StoreError> {
        let id = sqlx::query(
            "INSERT INTO results (exam_id, student_id, score, answers, correct_answers,
                                  time_spent_secs, exam_title, total_questions, submitted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(result.exam_id)
        .bind(result.student_id)
        .bind(i64::from(result.score))
        .bind(Json(&result.answers))
        .bind(Json(&result.correct_answers))
        .bind(i64::from(result.time_spent_secs))
        .bind(&result.exam_title)
        .bind(i64::from(result.total_questions))
        .bind(result.submitted_at)
        .execute(self.pool()?)
        .await
        .map_err(db_err)?
        .last_insert_rowid();

        Ok(ExamResult::from_new(id, result.clone()))
    }

    async fn get_result(&self, id: i64) -> Result<Option<ExamResult>, StoreError> {
        sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool()?)
        .await
        .map_err(db_err)?
        .map(ExamResult::try_from)
        .transpose()
    }

    async fn get_results_by_student(&self, user_id: i64) -> Result<Vec<ExamResult>, StoreError> {
        let rows = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results
             WHERE student_id = ?
             ORDER BY submitted_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool()?)
        .await
        .map_err(db_err)?;
        convert_all(rows)
    }

    async fn get_results_by_exam(&self, exam_id: i64) -> Result<Vec<ExamResult>, StoreError> {
        let rows = sqlx::query_as::<_, ResultRow>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results
             WHERE exam_id = ?
             ORDER BY submitted_at DESC, id DESC"
        ))
        .bind(exam_id)
        .fetch_all(self.pool()?)
        .await
        .map_err(db_err)?;
        convert_all(rows)
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, display_name, role FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool()?)
        .await
        .map_err(db_err)?
        .map(User::try_from)
        .transpose()
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, display_name, role FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool()?)
        .await
        .map_err(db_err)?
        .map(User::try_from)
        .transpose()
    }

    #[instrument(skip_all, fields(username = %user.username))]
    async fn insert_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let id = sqlx::query(
            "INSERT INTO users (username, password, display_name, role) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.display_name)
        .bind(user.role.to_string())
        .execute(self.pool()?)
        .await
        .map_err(db_err)?
        .last_insert_rowid();

        Ok(User {
            id,
            username: user.username.clone(),
            password: user.password.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use examkit_core::auth;
    use examkit_core::authoring::QuestionDraft;
    use examkit_core::session::{ExamSession, SessionConfig, SessionState};

    async fn memory_store() -> SqliteStore {
        SqliteStore::open(&DatabaseConfig::in_memory()).await.unwrap()
    }

    fn algebra() -> ExamDraft {
        ExamDraft {
            title: "Algebra".into(),
            duration_minutes: 1,
            questions: vec![
                QuestionDraft {
                    text: "x + 1 = 2".into(),
                    options: vec!["0".into(), "1".into()],
                    correct_option: 1,
                    explanation: Some("Subtract one.".into()),
                },
                QuestionDraft {
                    text: "2x = 0".into(),
                    options: vec!["0".into(), "2".into()],
                    correct_option: 0,
                    explanation: None,
                },
            ],
        }
    }

    fn result_for(exam: &Exam, student_id: i64, answers: Vec<Option<u32>>) -> NewResult {
        NewResult {
            exam_id: exam.id,
            student_id,
            score: 1,
            answers,
            correct_answers: vec![1, 0],
            time_spent_secs: 42,
            exam_title: exam.title.clone(),
            total_questions: 2,
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn exam_round_trip_keeps_question_order() {
        let store = memory_store().await;
        let exam = store.create_exam(&algebra()).await.unwrap();

        let loaded = store.get_exam(exam.id).await.unwrap().unwrap();
        assert_eq!(loaded, exam);

        let questions = store.get_questions(exam.id).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].text, "x + 1 = 2");
        assert_eq!(questions[0].options, vec!["0", "1"]);
        assert_eq!(questions[0].explanation.as_deref(), Some("Subtract one."));
        assert_eq!(questions[1].correct_option, 0);
        assert!(store.get_exam(exam.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_exams_counts_questions() {
        let store = memory_store().await;
        store.create_exam(&algebra()).await.unwrap();
        store
            .create_exam(&ExamDraft {
                title: "Empty".into(),
                duration_minutes: 5,
                questions: vec![],
            })
            .await
            .unwrap();

        let exams = store.list_exams().await.unwrap();
        assert_eq!(exams.len(), 2);
        assert_eq!(exams[0].question_count, 2);
        assert_eq!(exams[1].question_count, 0);
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = memory_store().await;
        let progress = QuizProgress {
            exam_id: 1,
            user_id: 2,
            answers: BTreeMap::from([(0, 2)]),
            last_updated: Utc::now(),
            time_left_secs: 300,
        };
        store.upsert_progress(&progress).await.unwrap();
        store.upsert_progress(&progress).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_progress")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let loaded = store.get_progress(1, 2).await.unwrap().unwrap();
        assert_eq!(loaded.answers, progress.answers);
        assert_eq!(loaded.time_left_secs, 300);

        let mut later = progress.clone();
        later.answers.insert(1, 0);
        later.time_left_secs = 120;
        store.upsert_progress(&later).await.unwrap();
        let loaded = store.get_progress(1, 2).await.unwrap().unwrap();
        assert_eq!(loaded.answers.len(), 2);
        assert_eq!(loaded.time_left_secs, 120);
    }

    #[tokio::test]
    async fn progress_purge_counts_rows() {
        let store = memory_store().await;
        for exam_id in 1..=3 {
            store
                .upsert_progress(&QuizProgress {
                    exam_id,
                    user_id: 9,
                    answers: BTreeMap::new(),
                    last_updated: Utc::now(),
                    time_left_secs: 10,
                })
                .await
                .unwrap();
        }
        store.delete_progress(1, 9).await.unwrap();
        assert_eq!(store.delete_progress_for_user(9).await.unwrap(), 2);
        assert!(store.get_progress(2, 9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn results_keep_unanswered_markers() {
        let store = memory_store().await;
        let exam = store.create_exam(&algebra()).await.unwrap();
        let stored = store
            .insert_result(&result_for(&exam, 7, vec![Some(1), None]))
            .await
            .unwrap();

        let loaded = store.get_result(stored.id).await.unwrap().unwrap();
        assert_eq!(loaded.answers, vec![Some(1), None]);
        assert_eq!(loaded.correct_answers, vec![1, 0]);
        assert_eq!(loaded.exam_title, "Algebra");
        assert_eq!(store.get_results_by_student(7).await.unwrap().len(), 1);
        assert_eq!(store.get_results_by_exam(exam.id).await.unwrap().len(), 1);
        assert!(store.get_results_by_student(8).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_is_corrupt() {
        let store = memory_store().await;
        let exam = store.create_exam(&algebra()).await.unwrap();
        sqlx::query("UPDATE questions SET options = 'not json' WHERE exam_id = ?")
            .bind(exam.id)
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.get_questions(exam.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }), "got: {err}");
        assert!(err.to_string().contains("questions.options"));
    }

    #[tokio::test]
    async fn demo_users_seeded_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("exams.db").display()),
            max_connections: 2,
            seed_demo_users: true,
        };

        let store = SqliteStore::open(&config).await.unwrap();
        store.close().await;
        let store = SqliteStore::open(&config).await.unwrap();

        let user = auth::login(&store, "instructor", "password123").await.unwrap();
        assert_eq!(user.role, Role::Instructor);
        assert_eq!(user.display_name, "Instructor One");
        let student = store.find_user_by_username("student").await.unwrap().unwrap();
        assert_eq!(student.role, Role::Student);
    }

    #[tokio::test]
    async fn duplicate_username_is_a_database_error() {
        let store = memory_store().await;
        let user = NewUser {
            username: "ada".into(),
            password: "pw".into(),
            display_name: "Ada".into(),
            role: Role::Student,
        };
        let stored = store.insert_user(&user).await.unwrap();
        assert_eq!(store.get_user(stored.id).await.unwrap().unwrap().username, "ada");
        assert!(matches!(
            store.insert_user(&user).await,
            Err(StoreError::Database(_))
        ));
    }

    #[tokio::test]
    async fn closed_store_rejects_calls() {
        let store = memory_store().await;
        store.close().await;
        assert!(store.is_closed());
        assert!(matches!(store.get_exam(1).await, Err(StoreError::Closed)));
    }

    #[tokio::test]
    async fn session_resumes_and_submits_over_sqlite() {
        let store = Arc::new(memory_store().await);
        let exam = store.create_exam(&algebra()).await.unwrap();
        let student = store
            .insert_user(&NewUser {
                username: "s".into(),
                password: "pw".into(),
                display_name: "S".into(),
                role: Role::Student,
            })
            .await
            .unwrap();
        let config = SessionConfig {
            tick_ms: 5,
            checkpoint_every_secs: 10,
        };

        let mut first =
            ExamSession::open(store.clone(), exam.id, student.clone(), config.clone())
                .await
                .unwrap();
        first.start().await.unwrap();
        first.set_answer(0, 1).await.unwrap();
        first.close().await;

        let saved = store.get_progress(exam.id, student.id).await.unwrap().unwrap();
        assert_eq!(saved.answers, BTreeMap::from([(0, 1)]));

        let mut second = ExamSession::open(store.clone(), exam.id, student.clone(), config)
            .await
            .unwrap();
        assert_eq!(second.view().await.answers, BTreeMap::from([(0, 1)]));
        second.start().await.unwrap();

        let finished =
            tokio::time::timeout(Duration::from_secs(10), second.wait_until_finished())
                .await
                .unwrap();
        assert_eq!(finished, SessionState::Submitted);

        let results = store.get_results_by_student(student.id).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1);
        assert_eq!(results[0].answers, vec![Some(1), None]);
        assert_eq!(results[0].time_spent_secs, 60);
        assert!(store.get_progress(exam.id, student.id).await.unwrap().is_none());
    }
}
