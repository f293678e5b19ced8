//! Aggregate statistics over a set of exam results.
//!
//! "No results yet" is an expected state, so these functions return `None`
//! or an empty distribution instead of failing.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::ExamResult;
use crate::scoring::percentage_exact;

/// One of the five fixed percentage ranges used for distribution reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScoreBucket {
    Below60,
    From60,
    From70,
    From80,
    From90,
}

impl ScoreBucket {
    /// All buckets in ascending order.
    pub const ALL: [ScoreBucket; 5] = [
        ScoreBucket::Below60,
        ScoreBucket::From60,
        ScoreBucket::From70,
        ScoreBucket::From80,
        ScoreBucket::From90,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ScoreBucket::Below60 => "0-59",
            ScoreBucket::From60 => "60-69",
            ScoreBucket::From70 => "70-79",
            ScoreBucket::From80 => "80-89",
            ScoreBucket::From90 => "90-100",
        }
    }

    /// Place a percentage. Boundary values belong to the higher bucket.
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage < 60.0 {
            ScoreBucket::Below60
        } else if percentage < 70.0 {
            ScoreBucket::From60
        } else if percentage < 80.0 {
            ScoreBucket::From70
        } else if percentage < 90.0 {
            ScoreBucket::From80
        } else {
            ScoreBucket::From90
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Result counts per [`ScoreBucket`], serialized as `{"0-59": n, ...}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    #[serde(rename = "0-59")]
    pub below_60: u32,
    #[serde(rename = "60-69")]
    pub from_60: u32,
    #[serde(rename = "70-79")]
    pub from_70: u32,
    #[serde(rename = "80-89")]
    pub from_80: u32,
    #[serde(rename = "90-100")]
    pub from_90: u32,
}

impl ScoreDistribution {
    pub fn count(&self, bucket: ScoreBucket) -> u32 {
        self.as_array()[bucket.index()]
    }

    /// `(bucket, count)` pairs in ascending bucket order.
    pub fn buckets(&self) -> impl Iterator<Item = (ScoreBucket, u32)> + '_ {
        ScoreBucket::ALL.into_iter().map(|b| (b, self.count(b)))
    }

    pub fn total(&self) -> u32 {
        self.as_array().iter().sum()
    }

    fn as_array(&self) -> [u32; 5] {
        [
            self.below_60,
            self.from_60,
            self.from_70,
            self.from_80,
            self.from_90,
        ]
    }

    fn record(&mut self, bucket: ScoreBucket) {
        let slot = match bucket {
            ScoreBucket::Below60 => &mut self.below_60,
            ScoreBucket::From60 => &mut self.from_60,
            ScoreBucket::From70 => &mut self.from_70,
            ScoreBucket::From80 => &mut self.from_80,
            ScoreBucket::From90 => &mut self.from_90,
        };
        *slot += 1;
    }
}

/// Percentage of a single result. A result over zero questions counts as 0%.
pub fn result_percentage(result: &ExamResult) -> f64 {
    percentage_exact(result.score, result.total_questions).unwrap_or(0.0)
}

/// Bucket every result by its percentage. Counts always sum to `results.len()`.
pub fn score_distribution(results: &[ExamResult]) -> ScoreDistribution {
    let mut distribution = ScoreDistribution::default();
    for result in results {
        distribution.record(ScoreBucket::for_percentage(result_percentage(result)));
    }
    distribution
}

/// Exam-level statistics. Percentages are rounded once, here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamStatistics {
    pub average_score: u32,
    pub highest_score: u32,
    pub lowest_score: u32,
    pub total_students: usize,
    pub score_distribution: ScoreDistribution,
}

/// Compute [`ExamStatistics`], or `None` when there are no results.
pub fn exam_statistics(results: &[ExamResult]) -> Option<ExamStatistics> {
    if results.is_empty() {
        return None;
    }

    let percentages: Vec<f64> = results.iter().map(result_percentage).collect();
    let mean = percentages.iter().sum::<f64>() / percentages.len() as f64;
    let highest = percentages.iter().copied().fold(f64::MIN, f64::max);
    let lowest = percentages.iter().copied().fold(f64::MAX, f64::min);

    Some(ExamStatistics {
        average_score: mean.round() as u32,
        highest_score: highest.round() as u32,
        lowest_score: lowest.round() as u32,
        total_students: results.len(),
        score_distribution: score_distribution(results),
    })
}

/// One row of the instructor dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamOverview {
    /// Number of distinct students with at least one result.
    pub distinct_students: usize,
    /// Mean percentage rounded to one decimal, `None` without results.
    pub average_percentage: Option<f64>,
}

pub fn exam_overview(results: &[ExamResult]) -> ExamOverview {
    let distinct_students = results
        .iter()
        .map(|r| r.student_id)
        .collect::<HashSet<_>>()
        .len();

    let average_percentage = if results.is_empty() {
        None
    } else {
        let mean = results.iter().map(result_percentage).sum::<f64>() / results.len() as f64;
        Some((mean * 10.0).round() / 10.0)
    };

    ExamOverview {
        distinct_students,
        average_percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn result(student_id: i64, score: u32, total: u32) -> ExamResult {
        ExamResult {
            id: 0,
            exam_id: 1,
            student_id,
            score,
            answers: vec![],
            correct_answers: vec![],
            time_spent_secs: 0,
            exam_title: "Algebra".into(),
            total_questions: total,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn boundaries_go_to_higher_bucket() {
        assert_eq!(ScoreBucket::for_percentage(59.99), ScoreBucket::Below60);
        assert_eq!(ScoreBucket::for_percentage(60.0), ScoreBucket::From60);
        assert_eq!(ScoreBucket::for_percentage(70.0), ScoreBucket::From70);
        assert_eq!(ScoreBucket::for_percentage(80.0), ScoreBucket::From80);
        assert_eq!(ScoreBucket::for_percentage(90.0), ScoreBucket::From90);
        assert_eq!(ScoreBucket::for_percentage(100.0), ScoreBucket::From90);
    }

    #[test]
    fn distribution_partitions_all_results() {
        let results: Vec<ExamResult> = (0..=10).map(|s| result(s as i64, s, 10)).collect();
        let dist = score_distribution(&results);
        assert_eq!(dist.total() as usize, results.len());
        assert_eq!(dist.below_60, 6);
        assert_eq!(dist.from_60, 1);
        assert_eq!(dist.from_70, 1);
        assert_eq!(dist.from_80, 1);
        assert_eq!(dist.from_90, 2);
    }

    #[test]
    fn zero_question_result_still_counted() {
        let dist = score_distribution(&[result(1, 0, 0)]);
        assert_eq!(dist.total(), 1);
        assert_eq!(dist.count(ScoreBucket::Below60), 1);
    }

    #[test]
    fn distribution_serializes_with_labels_in_order() {
        let dist = score_distribution(&[result(1, 9, 10)]);
        let json = serde_json::to_string(&dist).unwrap();
        assert_eq!(
            json,
            r#"{"0-59":0,"60-69":0,"70-79":0,"80-89":0,"90-100":1}"#
        );
        let labels: Vec<&str> = dist.buckets().map(|(b, _)| b.label()).collect();
        assert_eq!(labels, ["0-59", "60-69", "70-79", "80-89", "90-100"]);
    }

    #[test]
    fn statistics_of_nothing_is_none() {
        assert!(exam_statistics(&[]).is_none());
    }

    #[test]
    fn statistics_of_single_result() {
        let stats = exam_statistics(&[result(1, 8, 10)]).unwrap();
        assert_eq!(stats.average_score, 80);
        assert_eq!(stats.highest_score, 80);
        assert_eq!(stats.lowest_score, 80);
        assert_eq!(stats.total_students, 1);
    }

    #[test]
    fn statistics_round_only_at_aggregation() {
        // 12.5% and 37.5%: rounding each first would average 13 and 38 to 26.
        let stats = exam_statistics(&[result(1, 1, 8), result(2, 3, 8)]).unwrap();
        assert_eq!(stats.average_score, 25);
        assert_eq!(stats.highest_score, 38);
        assert_eq!(stats.lowest_score, 13);

        let stats = exam_statistics(&[result(1, 1, 3), result(2, 1, 2), result(3, 1, 2)]).unwrap();
        // mean of 33.33, 50, 50 = 44.44
        assert_eq!(stats.average_score, 44);
        assert_eq!(stats.lowest_score, 33);
        assert_eq!(stats.highest_score, 50);
    }

    #[test]
    fn overview_counts_distinct_students() {
        let overview = exam_overview(&[result(1, 5, 10), result(1, 10, 10), result(2, 7, 10)]);
        assert_eq!(overview.distinct_students, 2);
        assert_eq!(overview.average_percentage, Some(73.3));
        assert_eq!(exam_overview(&[]).average_percentage, None);
    }
}
