//! The `examkit review` command.

use anyhow::Result;

use examkit_core::model::Role;
use examkit_core::review::load_review;
use examkit_core::traits::ExamStore;
use examkit_report::render_review;

use super::{login, Context};

pub async fn execute(ctx: &Context, result_id: i64, user: String, password: String) -> Result<()> {
    let store = ctx.open_store().await?;
    let viewer = login(&store, &user, &password).await?;

    let result = store
        .get_result(result_id)
        .await?
        .filter(|r| viewer.role == Role::Instructor || r.student_id == viewer.id)
        .ok_or_else(|| anyhow::anyhow!("result {result_id} not found"))?;

    let review = load_review(store.as_ref(), result.exam_id, &result).await?;
    store.close().await;

    print!("{}", render_review(&review));
    Ok(())
}
