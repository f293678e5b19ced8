//! In-process store.
//!
//! Backs tests and embedders that do not want SQLite. Writes can be made to
//! fail on demand so callers can exercise their persistence-error paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::authoring::ExamDraft;
use crate::error::StoreError;
use crate::model::{
    Exam, ExamResult, ExamSummary, NewResult, NewUser, Question, QuizProgress, User,
};
use crate::traits::{ExamStore, UserStore};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    exams: BTreeMap<i64, Exam>,
    questions: BTreeMap<i64, Question>,
    progress: HashMap<(i64, i64), QuizProgress>,
    results: BTreeMap<i64, ExamResult>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A [`ExamStore`] + [`UserStore`] held entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
    progress_writes: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`StoreError::Database`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make progress deletions fail while other writes still succeed.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `upsert_progress` calls so far.
    pub fn progress_writes(&self) -> u32 {
        self.progress_writes.load(Ordering::SeqCst)
    }

    /// Number of live progress rows.
    pub fn progress_rows(&self) -> usize {
        self.lock().map(|t| t.progress.len()).unwrap_or_default()
    }

    /// Replace a question in place, as an out-of-band edit would.
    pub fn replace_question(&self, question: Question) -> Result<(), StoreError> {
        self.write()?.questions.insert(question.id, question);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected write failure".into()));
        }
        self.lock()
    }

    fn delete(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected delete failure".into()));
        }
        self.write()
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn get_exam(&self, id: i64) -> Result<Option<Exam>, StoreError> {
        Ok(self.lock()?.exams.get(&id).cloned())
    }

    async fn get_questions(&self, exam_id: i64) -> Result<Vec<Question>, StoreError> {
        Ok(self
            .lock()?
            .questions
            .values()
            .filter(|q| q.exam_id == exam_id)
            .cloned()
            .collect())
    }

    async fn list_exams(&self) -> Result<Vec<ExamSummary>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .exams
            .values()
            .map(|e| ExamSummary {
                id: e.id,
                title: e.title.clone(),
                duration_minutes: e.duration_minutes,
                question_count: tables
                    .questions
                    .values()
                    .filter(|q| q.exam_id == e.id)
                    .count() as u32,
            })
            .collect())
    }

    async fn create_exam(&self, draft: &ExamDraft) -> Result<Exam, StoreError> {
        let mut tables = self.write()?;
        let exam = Exam {
            id: tables.next_id(),
            title: draft.title.clone(),
            duration_minutes: draft.duration_minutes,
        };
        for q in &draft.questions {
            let id = tables.next_id();
            tables.questions.insert(
                id,
                Question {
                    id,
                    exam_id: exam.id,
                    text: q.text.clone(),
                    options: q.options.clone(),
                    correct_option: q.correct_option,
                    explanation: q.explanation.clone(),
                },
            );
        }
        tables.exams.insert(exam.id, exam.clone());
        Ok(exam)
    }

    async fn get_progress(
        &self,
        exam_id: i64,
        user_id: i64,
    ) -> Result<Option<QuizProgress>, StoreError> {
        Ok(self.lock()?.progress.get(&(exam_id, user_id)).cloned())
    }

    async fn upsert_progress(&self, progress: &QuizProgress) -> Result<(), StoreError> {
        self.write()?
            .progress
            .insert((progress.exam_id, progress.user_id), progress.clone());
        self.progress_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_progress(&self, exam_id: i64, user_id: i64) -> Result<(), StoreError> {
        self.delete()?.progress.remove(&(exam_id, user_id));
        Ok(())
    }

    async fn delete_progress_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        let mut tables = self.delete()?;
        let before = tables.progress.len();
        tables.progress.retain(|(_, uid), _| *uid != user_id);
        Ok((before - tables.progress.len()) as u64)
    }

    async fn insert_result(&self, result: &NewResult) -> Result<ExamResult, StoreError> {
        let mut tables = self.write()?;
        let stored = ExamResult::from_new(tables.next_id(), result.clone());
        tables.results.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_result(&self, id: i64) -> Result<Option<ExamResult>, StoreError> {
        Ok(self.lock()?.results.get(&id).cloned())
    }

    async fn get_results_by_student(&self, user_id: i64) -> Result<Vec<ExamResult>, StoreError> {
        Ok(self
            .lock()?
            .results
            .values()
            .filter(|r| r.student_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_results_by_exam(&self, exam_id: i64) -> Result<Vec<ExamResult>, StoreError> {
        Ok(self
            .lock()?
            .results
            .values()
            .filter(|r| r.exam_id == exam_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn insert_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Database(format!(
                "UNIQUE constraint failed: users.username ({})",
                user.username
            )));
        }
        let stored = User {
            id: tables.next_id(),
            username: user.username.clone(),
            password: user.password.clone(),
            display_name: user.display_name.clone(),
            role: user.role,
        };
        tables.users.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn progress(answers: &[(u32, u32)], time_left_secs: u32) -> QuizProgress {
        QuizProgress {
            exam_id: 7,
            user_id: 3,
            answers: answers.iter().copied().collect(),
            last_updated: Utc::now(),
            time_left_secs,
        }
    }

    #[tokio::test]
    async fn upsert_keeps_one_row_per_pair() {
        let store = MemoryStore::new();
        let p = progress(&[(0, 2)], 300);
        store.upsert_progress(&p).await.unwrap();
        store.upsert_progress(&p).await.unwrap();
        assert_eq!(store.progress_rows(), 1);
        assert_eq!(store.progress_writes(), 2);
        assert_eq!(store.get_progress(7, 3).await.unwrap(), Some(p));
    }

    #[tokio::test]
    async fn purge_only_touches_one_user() {
        let store = MemoryStore::new();
        store.upsert_progress(&progress(&[], 10)).await.unwrap();
        let mut other = progress(&[], 10);
        other.user_id = 4;
        store.upsert_progress(&other).await.unwrap();

        assert_eq!(store.delete_progress_for_user(3).await.unwrap(), 1);
        assert_eq!(store.progress_rows(), 1);
    }

    #[tokio::test]
    async fn injected_failures_hit_writes_only() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        assert!(store.upsert_progress(&progress(&[], 1)).await.is_err());
        assert!(store.get_progress(7, 3).await.unwrap().is_none());
    }
}
