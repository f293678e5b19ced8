//! Core trait definitions for the persistence collaborators.
//!
//! These async traits are implemented by `SqliteStore` in `examkit-store`
//! and by [`MemoryStore`](crate::memory::MemoryStore) in this crate. The
//! session machine, the review assembler and the auth helpers only ever see
//! them as `Arc<dyn ExamStore>` / `&dyn UserStore`.

use async_trait::async_trait;

use crate::authoring::ExamDraft;
use crate::error::StoreError;
use crate::model::{
    Exam, ExamResult, ExamSummary, NewResult, NewUser, Question, QuizProgress, User,
};

// ---------------------------------------------------------------------------
// Exam store
// ---------------------------------------------------------------------------

/// Storage for exams, questions, in-flight progress and results.
///
/// Every operation is request/response. Implementations must keep at most
/// one progress row per (exam_id, user_id): `upsert_progress` replaces.
#[async_trait]
pub trait ExamStore: Send + Sync {
    /// Fetch an exam header.
    async fn get_exam(&self, id: i64) -> Result<Option<Exam>, StoreError>;

    /// Questions of an exam in their stable order (ascending id).
    async fn get_questions(&self, exam_id: i64) -> Result<Vec<Question>, StoreError>;

    /// All exams with their question counts.
    async fn list_exams(&self) -> Result<Vec<ExamSummary>, StoreError>;

    /// Persist an exam and its questions. The draft is assumed validated.
    async fn create_exam(&self, draft: &ExamDraft) -> Result<Exam, StoreError>;

    async fn get_progress(
        &self,
        exam_id: i64,
        user_id: i64,
    ) -> Result<Option<QuizProgress>, StoreError>;

    /// Insert or replace the progress row for (exam_id, user_id).
    async fn upsert_progress(&self, progress: &QuizProgress) -> Result<(), StoreError>;

    async fn delete_progress(&self, exam_id: i64, user_id: i64) -> Result<(), StoreError>;

    /// Remove every progress row belonging to `user_id`, returning how many.
    async fn delete_progress_for_user(&self, user_id: i64) -> Result<u64, StoreError>;

    async fn insert_result(&self, result: &NewResult) -> Result<ExamResult, StoreError>;

    async fn get_result(&self, id: i64) -> Result<Option<ExamResult>, StoreError>;

    async fn get_results_by_student(&self, user_id: i64) -> Result<Vec<ExamResult>, StoreError>;

    async fn get_results_by_exam(&self, exam_id: i64) -> Result<Vec<ExamResult>, StoreError>;
}

// ---------------------------------------------------------------------------
// User store
// ---------------------------------------------------------------------------

/// Storage for user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Insert a new account. Callers check username uniqueness first.
    async fn insert_user(&self, user: &NewUser) -> Result<User, StoreError>;
}
