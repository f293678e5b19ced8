//! Instructor statistics page.
//!
//! One standalone HTML document per exam: summary figures, the score
//! distribution as an inline SVG, a per-question breakdown and every
//! submission. The distribution is also embedded as JSON for scripting.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context as _, Result};

use examkit_core::model::ExamResult;
use examkit_core::review::ExamReport;
use examkit_core::scoring::ScoreBand;
use examkit_core::statistics::{result_percentage, ScoreDistribution};

use crate::text::format_duration;

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn band_class(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::High => "high",
        ScoreBand::Medium => "medium",
        ScoreBand::Low => "low",
    }
}

/// How one question fared across all submissions.
struct QuestionTally {
    answered: u32,
    correct: u32,
}

/// Tally by position against each result's recorded key.
fn tally_questions(results: &[ExamResult], question_count: usize) -> Vec<QuestionTally> {
    let width = results
        .iter()
        .map(|r| r.correct_answers.len())
        .max()
        .unwrap_or(0)
        .max(question_count);
    let mut tallies: Vec<QuestionTally> = (0..width)
        .map(|_| QuestionTally {
            answered: 0,
            correct: 0,
        })
        .collect();
    for result in results {
        for (i, answer) in result.answers.iter().enumerate() {
            let (Some(answer), Some(tally)) = (answer, tallies.get_mut(i)) else {
                continue;
            };
            tally.answered += 1;
            if result.correct_answers.get(i) == Some(answer) {
                tally.correct += 1;
            }
        }
    }
    tallies
}

/// Render the statistics page for one exam.
///
/// `students` maps student ids to display names; unknown ids render as `#id`.
pub fn generate_html(report: &ExamReport, students: &HashMap<i64, String>) -> String {
    let title = escape(&report.exam.title);
    let mut page = String::new();

    // fmt::Write into a String cannot fail.
    let _ = writeln!(
        page,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title} | examkit</title>\n<style>{STYLE}</style>\n</head>\n<body>"
    );
    let _ = writeln!(
        page,
        "<h1>{title}</h1>\n<p class=\"muted\">{} questions, {} min, {} submissions</p>",
        report.question_count,
        report.exam.duration_minutes,
        report.results.len()
    );

    let Some(stats) = &report.statistics else {
        page.push_str("<p class=\"muted\">No results yet.</p>\n</body>\n</html>\n");
        return page;
    };

    let _ = writeln!(
        page,
        "<div class=\"cards\">\
         <div><span>Average</span><strong>{}%</strong></div>\
         <div><span>Highest</span><strong>{}%</strong></div>\
         <div><span>Lowest</span><strong>{}%</strong></div>\
         <div><span>Students</span><strong>{}</strong></div></div>",
        stats.average_score, stats.highest_score, stats.lowest_score, stats.total_students
    );

    page.push_str("<h2>Score distribution</h2>\n");
    page.push_str(&distribution_svg(&stats.score_distribution));
    let _ = writeln!(
        page,
        "<script type=\"application/json\" id=\"distribution\">{}</script>",
        serde_json::to_string(&stats.score_distribution)
            .unwrap_or_default()
            .replace("</", "<\\/")
    );

    page.push_str("<h2>Questions</h2>\n<table>\n<tr><th>#</th><th>Answered</th><th>Correct</th><th>Rate</th></tr>\n");
    for (i, tally) in tally_questions(&report.results, report.question_count)
        .iter()
        .enumerate()
    {
        let rate = if tally.answered == 0 {
            0
        } else {
            (tally.correct * 100 + tally.answered / 2) / tally.answered
        };
        let _ = writeln!(
            page,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"{}\">{rate}%</td></tr>",
            i + 1,
            tally.answered,
            tally.correct,
            band_class(ScoreBand::from_percentage(rate)),
        );
    }
    page.push_str("</table>\n");

    page.push_str("<h2>Submissions</h2>\n<table>\n<tr><th>Student</th><th>Score</th><th>Percent</th><th>Time</th><th>Submitted (UTC)</th></tr>\n");
    for result in &report.results {
        let pct = result_percentage(result).round() as u32;
        let student = match students.get(&result.student_id) {
            Some(name) => escape(name),
            None => format!("#{}", result.student_id),
        };
        let _ = writeln!(
            page,
            "<tr><td>{student}</td><td>{}/{}</td><td class=\"{}\">{pct}%</td><td>{}</td><td>{}</td></tr>",
            result.score,
            result.total_questions,
            band_class(ScoreBand::from_percentage(pct)),
            format_duration(result.time_spent_secs),
            result.submitted_at.format("%Y-%m-%d %H:%M"),
        );
    }
    page.push_str("</table>\n</body>\n</html>\n");
    page
}

/// Render and save the statistics page, creating parent directories.
pub fn write_html_report(
    report: &ExamReport,
    students: &HashMap<i64, String>,
    path: &Path,
) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    std::fs::write(path, generate_html(report, students))
        .with_context(|| format!("failed to write {}", path.display()))
}

/// Horizontal bars, one per bucket, scaled to the fullest bucket.
fn distribution_svg(distribution: &ScoreDistribution) -> String {
    const ROW: usize = 28;
    const GAP: usize = 8;
    const LABEL: usize = 70;
    const SPAN: usize = 360;

    let buckets: Vec<_> = distribution.buckets().collect();
    let peak = buckets.iter().map(|(_, n)| *n as usize).max().unwrap_or(0).max(1);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg class=\"chart\" viewBox=\"0 0 {} {}\" role=\"img\">",
        LABEL + SPAN + 50,
        buckets.len() * (ROW + GAP)
    );
    for (row, (bucket, count)) in buckets.iter().enumerate() {
        let top = row * (ROW + GAP);
        let mid = top + ROW / 2;
        let len = *count as usize * SPAN / peak;
        let _ = writeln!(
            svg,
            "<text x=\"{}\" y=\"{mid}\" text-anchor=\"end\">{}</text>\
             <rect x=\"{LABEL}\" y=\"{top}\" width=\"{len}\" height=\"{ROW}\"/>\
             <text x=\"{}\" y=\"{mid}\">{count}</text>",
            LABEL - 8,
            bucket.label(),
            LABEL + len + 6,
        );
    }
    svg.push_str("</svg>\n");
    svg
}

const STYLE: &str = "
body { font-family: system-ui, sans-serif; max-width: 56rem; margin: 2rem auto; padding: 0 1rem; }
.muted { color: #6b7280; }
.cards { display: flex; gap: 1rem; }
.cards div { flex: 1; border: 1px solid #d1d5db; border-radius: 6px; padding: 0.75rem; }
.cards span { display: block; font-size: 0.8rem; color: #6b7280; }
.cards strong { font-size: 1.5rem; }
table { border-collapse: collapse; width: 100%; }
th, td { border-bottom: 1px solid #e5e7eb; padding: 0.4rem 0.75rem; text-align: left; }
.chart { width: 100%; max-width: 30rem; }
.chart text { font-size: 12px; dominant-baseline: middle; }
.chart rect { fill: #2563eb; }
.high { color: #15803d; }
.medium { color: #a16207; }
.low { color: #b91c1c; }
";
