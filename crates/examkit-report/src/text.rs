//! Plain-text review sheets.

use std::fmt::Write;

use examkit_core::review::{Outcome, ReviewView};
use examkit_core::scoring::ScoreBand;

/// `95` → `"1m 35s"`, `45` → `"45s"`.
pub fn format_duration(secs: u32) -> String {
    match (secs / 60, secs % 60) {
        (0, s) => format!("{s}s"),
        (m, s) => format!("{m}m {s:02}s"),
    }
}

/// Letter shown next to an option: 0 → A, 1 → B, ...
fn option_letter(index: u32) -> char {
    char::from_u32('A' as u32 + index).filter(char::is_ascii_uppercase).unwrap_or('?')
}

fn band_label(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::High => "excellent",
        ScoreBand::Medium => "good",
        ScoreBand::Low => "needs work",
    }
}

/// Render a review as a printable sheet, one block per question.
pub fn render_review(view: &ReviewView) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{}", view.exam.title);
    let _ = writeln!(
        out,
        "Score: {}/{} ({}%, {}) | time {} | submitted {}",
        view.score,
        view.total,
        view.percentage,
        band_label(view.band),
        format_duration(view.time_spent_secs),
        view.submitted_at.format("%Y-%m-%d %H:%M")
    );
    if view.desynced {
        let _ = writeln!(
            out,
            "Note: this exam changed after submission; answers are marked against the original key."
        );
    }

    for item in &view.items {
        let mark = match item.outcome {
            Outcome::Correct => "correct",
            Outcome::Incorrect => "incorrect",
            Outcome::Unanswered => "unanswered",
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "{}. {} [{}]", item.number, item.question.text, mark);

        for (i, option) in item.question.options.iter().enumerate() {
            let i = i as u32;
            let mut tags = Vec::new();
            if item.user_answer == Some(i) {
                tags.push("your answer");
            }
            if item.correct_answer == Some(i) {
                tags.push("correct");
            }
            let suffix = if tags.is_empty() {
                String::new()
            } else {
                format!("  <- {}", tags.join(", "))
            };
            let _ = writeln!(out, "   {}) {}{}", option_letter(i), option, suffix);
        }

        if let Some(explanation) = &item.question.explanation {
            let _ = writeln!(out, "   Explanation: {explanation}");
        }
        if item.key_changed {
            let _ = writeln!(out, "   (answer key changed since submission)");
        }
    }

    out
}
