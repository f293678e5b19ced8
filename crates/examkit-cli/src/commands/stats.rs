//! The `examkit stats` command.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examkit_core::model::Role;
use examkit_core::review::exam_report;
use examkit_core::statistics::{exam_overview, result_percentage};
use examkit_core::traits::UserStore;
use examkit_report::{format_duration, write_html_report};

use super::{local_time, login, Context};

pub async fn execute(
    ctx: &Context,
    exam_id: i64,
    user: String,
    password: String,
    html: Option<PathBuf>,
) -> Result<()> {
    let store = ctx.open_store().await?;
    let viewer = login(&store, &user, &password).await?;
    if viewer.role != Role::Instructor {
        anyhow::bail!("only instructors can view exam statistics");
    }

    let report = exam_report(store.as_ref(), exam_id).await?;

    let mut students: HashMap<i64, String> = HashMap::new();
    for result in &report.results {
        if students.contains_key(&result.student_id) {
            continue;
        }
        if let Some(student) = store.get_user(result.student_id).await? {
            students.insert(student.id, student.display_name);
        }
    }
    store.close().await;

    println!(
        "{} | {} questions | {} minutes",
        report.exam.title, report.question_count, report.exam.duration_minutes
    );

    let Some(stats) = &report.statistics else {
        println!("No results yet.");
        return Ok(());
    };

    let overview = exam_overview(&report.results);
    println!(
        "Submissions: {} from {} student(s) | average {}% | highest {}% | lowest {}%",
        stats.total_students,
        overview.distinct_students,
        stats.average_score,
        stats.highest_score,
        stats.lowest_score
    );

    let mut distribution = Table::new();
    distribution.set_header(vec!["Range", "Results"]);
    for (bucket, count) in stats.score_distribution.buckets() {
        distribution.add_row(vec![Cell::new(bucket.label()), Cell::new(count)]);
    }
    println!("{distribution}");

    let mut table = Table::new();
    table.set_header(vec!["Student", "Score", "%", "Time", "Submitted"]);
    for result in &report.results {
        let name = students
            .get(&result.student_id)
            .cloned()
            .unwrap_or_else(|| format!("#{}", result.student_id));
        table.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{}/{}", result.score, result.total_questions)),
            Cell::new(format!("{:.0}%", result_percentage(result))),
            Cell::new(format_duration(result.time_spent_secs)),
            Cell::new(local_time(result.submitted_at)),
        ]);
    }
    println!("{table}");

    if let Some(path) = html {
        write_html_report(&report, &students, &path)?;
        println!("Wrote HTML report to {}", path.display());
    }

    Ok(())
}
