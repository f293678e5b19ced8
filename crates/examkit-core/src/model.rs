//! Core data model types for examkit.
//!
//! These are the entities every other part of the system passes around:
//! users, exams and their questions, in-flight quiz progress, and
//! submitted results.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a user account. Fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Instructor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Instructor => write!(f, "instructor"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "instructor" => Ok(Role::Instructor),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A registered account.
///
/// The password is kept in plaintext; examkit has no real security model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub display_name: String,
    pub role: Role,
}

/// Registration payload for a new account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
}

/// An exam header. Questions are owned by the exam but loaded separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub title: String,
    /// Time allowed for one attempt, in minutes.
    pub duration_minutes: u32,
}

impl Exam {
    /// Time allowed for one attempt, in seconds.
    pub fn duration_secs(&self) -> u32 {
        self.duration_minutes.saturating_mul(60)
    }
}

/// Exam header plus its question count, as listed on dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamSummary {
    pub id: i64,
    pub title: String,
    pub duration_minutes: u32,
    pub question_count: u32,
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    /// Back-reference to the owning exam.
    pub exam_id: i64,
    pub text: String,
    /// Ordered answer options; at least two, none empty.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_option: u32,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Question {
    /// Whether `option` is a valid index into this question's options.
    pub fn has_option(&self, option: u32) -> bool {
        (option as usize) < self.options.len()
    }
}

/// Persisted snapshot of an in-flight attempt, keyed by (exam_id, user_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizProgress {
    pub exam_id: i64,
    pub user_id: i64,
    /// Question index -> selected option index.
    pub answers: BTreeMap<u32, u32>,
    pub last_updated: DateTime<Utc>,
    pub time_left_secs: u32,
}

/// A result about to be written; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewResult {
    pub exam_id: i64,
    pub student_id: i64,
    pub score: u32,
    /// Selected option per question, in question order. `None` = unanswered.
    pub answers: Vec<Option<u32>>,
    /// Correct option per question at submission time.
    pub correct_answers: Vec<u32>,
    pub time_spent_secs: u32,
    /// Exam title at submission time.
    pub exam_title: String,
    pub total_questions: u32,
    pub submitted_at: DateTime<Utc>,
}

/// A committed, immutable exam result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: i64,
    pub exam_id: i64,
    pub student_id: i64,
    pub score: u32,
    pub answers: Vec<Option<u32>>,
    pub correct_answers: Vec<u32>,
    pub time_spent_secs: u32,
    pub exam_title: String,
    pub total_questions: u32,
    pub submitted_at: DateTime<Utc>,
}

impl ExamResult {
    /// Attach a store-assigned id to a pending result.
    pub fn from_new(id: i64, new: NewResult) -> Self {
        Self {
            id,
            exam_id: new.exam_id,
            student_id: new.student_id,
            score: new.score,
            answers: new.answers,
            correct_answers: new.correct_answers,
            time_spent_secs: new.time_spent_secs,
            exam_title: new.exam_title,
            total_questions: new.total_questions,
            submitted_at: new.submitted_at,
        }
    }
}
