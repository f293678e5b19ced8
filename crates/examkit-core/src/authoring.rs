//! Exam authoring: drafts, validation and publishing.

use serde::{Deserialize, Serialize};

use crate::error::{ExamError, Result};
use crate::model::{Exam, Role, User};
use crate::traits::ExamStore;

/// An exam as written by an instructor, before it has ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamDraft {
    pub title: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub questions: Vec<QuestionDraft>,
}

/// A question inside an [`ExamDraft`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    pub options: Vec<String>,
    pub correct_option: u32,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl QuestionDraft {
    /// Validate one question. `number` is 1-based and only used in messages.
    pub fn validate(&self, number: usize) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(ExamError::validation(format!(
                "question {number} text is required"
            )));
        }
        if self.options.len() < 2 {
            return Err(ExamError::validation(format!(
                "question {number} needs at least two options"
            )));
        }
        if self.options.iter().any(|opt| opt.trim().is_empty()) {
            return Err(ExamError::validation(format!(
                "all options for question {number} must be filled"
            )));
        }
        if self.correct_option as usize >= self.options.len() {
            return Err(ExamError::validation(format!(
                "question {number} correct option {} is out of range (0..{})",
                self.correct_option,
                self.options.len()
            )));
        }
        Ok(())
    }
}

impl ExamDraft {
    /// Check the draft can be published. Stops at the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ExamError::validation("exam title is required"));
        }
        if self.duration_minutes == 0 {
            return Err(ExamError::validation("duration must be at least one minute"));
        }
        if self.questions.is_empty() {
            return Err(ExamError::validation("an exam needs at least one question"));
        }
        for (i, question) in self.questions.iter().enumerate() {
            question.validate(i + 1)?;
        }
        Ok(())
    }
}

/// Validate and persist a draft on behalf of `author`.
#[tracing::instrument(skip_all, fields(author = %author.username, title = %draft.title))]
pub async fn publish_exam(store: &dyn ExamStore, author: &User, draft: &ExamDraft) -> Result<Exam> {
    if author.role != Role::Instructor {
        return Err(ExamError::Unauthorized(format!(
            "{} is not an instructor",
            author.username
        )));
    }
    draft.validate()?;

    let exam = store.create_exam(draft).await?;
    tracing::info!(
        exam_id = exam.id,
        questions = draft.questions.len(),
        "exam published"
    );
    Ok(exam)
}
