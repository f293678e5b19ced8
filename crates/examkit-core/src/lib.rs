//! examkit-core — Exam session state machine, scoring and review.
//!
//! This crate defines the data model, the store traits and the pure scoring
//! logic the rest of examkit builds on, plus the timed session that ties
//! them together.

pub mod auth;
pub mod authoring;
pub mod error;
pub mod memory;
pub mod model;
pub mod parser;
pub mod review;
pub mod scoring;
pub mod session;
pub mod statistics;
pub mod traits;

pub use error::{ExamError, Result, StoreError};
pub use session::{ExamSession, SessionConfig, SessionState, SessionView};
pub use traits::{ExamStore, UserStore};
