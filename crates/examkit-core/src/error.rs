//! Error taxonomy shared by every examkit crate.
//!
//! `StoreError` is defined here rather than in `examkit-store` so the store
//! traits, the in-memory store and the session machine can all name it.

use thiserror::Error;

/// Failures reported by a persistence store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database rejected or failed an operation.
    #[error("database error: {0}")]
    Database(String),

    /// A stored payload could not be decoded into its typed form.
    #[error("corrupt {what}: {reason}")]
    Corrupt { what: String, reason: String },

    /// The store has been closed.
    #[error("store is closed")]
    Closed,
}

/// Errors surfaced by the exam core.
#[derive(Debug, Error)]
pub enum ExamError {
    /// An exam, its questions, a result or a user is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Input rejected: incomplete submission, malformed authoring, bad index.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A percentage or mean was requested over zero items.
    #[error("division by zero: {0}")]
    DivisionByZero(String),

    /// Credentials or role do not permit the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A store operation failed.
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

impl ExamError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ExamError::NotFound(what.into())
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        ExamError::Validation(reason.into())
    }

    /// Returns `true` if retrying the same call could succeed.
    ///
    /// Only store failures are transient; everything else needs different
    /// input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExamError::Persistence(_))
    }
}

pub type Result<T, E = ExamError> = std::result::Result<T, E>;
