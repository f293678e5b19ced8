//! The `examkit results` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use examkit_core::review::list_results_for_student;
use examkit_report::format_duration;

use super::{local_time, login, Context};

pub async fn execute(ctx: &Context, user: String, password: String, json: bool) -> Result<()> {
    let store = ctx.open_store().await?;
    let student = login(&store, &user, &password).await?;
    let rows = list_results_for_student(store.as_ref(), student.id).await?;
    store.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No results yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Result", "Exam", "Score", "%", "Time", "Submitted"]);
    for row in &rows {
        let title = if row.exam_available {
            row.exam_title.clone()
        } else {
            format!("{} (removed)", row.exam_title)
        };
        table.add_row(vec![
            Cell::new(row.result_id),
            Cell::new(title),
            Cell::new(format!("{}/{}", row.score, row.question_count)),
            Cell::new(format!("{}%", row.percentage)),
            Cell::new(format_duration(row.time_spent_secs)),
            Cell::new(local_time(row.submitted_at)),
        ]);
    }
    println!("{table}");
    Ok(())
}
