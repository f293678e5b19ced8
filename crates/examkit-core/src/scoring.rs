//! Per-submission grading.
//!
//! Everything here is pure: no store access, no clock.

use serde::{Deserialize, Serialize};

use crate::error::{ExamError, Result};

/// Count positions where the selected option equals the correct one.
///
/// Positions present in only one of the sequences contribute nothing, and an
/// unanswered position never matches. Mismatched lengths are not an error.
pub fn compute_score(answers: &[Option<u32>], correct_answers: &[u32]) -> u32 {
    answers
        .iter()
        .zip(correct_answers)
        .filter(|(answer, correct)| **answer == Some(**correct))
        .count() as u32
}

/// Unrounded percentage of `score` over `total`.
pub fn percentage_exact(score: u32, total: u32) -> Result<f64> {
    if total == 0 {
        return Err(ExamError::DivisionByZero(format!(
            "percentage of score {score} over zero questions"
        )));
    }
    Ok(score as f64 / total as f64 * 100.0)
}

/// `round(score / total * 100)`.
pub fn percentage(score: u32, total: u32) -> Result<u32> {
    percentage_exact(score, total).map(|p| p.round() as u32)
}

/// Coarse grade used to tint a score on review screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    /// 90% and above.
    High,
    /// 70% up to 90%.
    Medium,
    /// Below 70%.
    Low,
}

impl ScoreBand {
    pub fn from_percentage(percentage: u32) -> Self {
        if percentage >= 90 {
            ScoreBand::High
        } else if percentage >= 70 {
            ScoreBand::Medium
        } else {
            ScoreBand::Low
        }
    }
}
