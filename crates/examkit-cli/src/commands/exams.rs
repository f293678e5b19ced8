//! The `examkit exams` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use examkit_core::statistics::exam_overview;
use examkit_core::traits::ExamStore;

use super::Context;

pub async fn execute(ctx: &Context) -> Result<()> {
    let store = ctx.open_store().await?;
    let exams = store.list_exams().await?;

    if exams.is_empty() {
        println!("No exams yet. Import one with `examkit import --exams <path>`.");
        store.close().await;
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Minutes", "Questions", "Students", "Avg %"]);

    for exam in &exams {
        let overview = exam_overview(&store.get_results_by_exam(exam.id).await?);
        table.add_row(vec![
            Cell::new(exam.id),
            Cell::new(&exam.title),
            Cell::new(exam.duration_minutes),
            Cell::new(exam.question_count),
            Cell::new(overview.distinct_students),
            Cell::new(
                overview
                    .average_percentage
                    .map(|p| format!("{p:.1}%"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }

    println!("{table}");
    store.close().await;
    Ok(())
}
