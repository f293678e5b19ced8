//! The `examkit import` command.

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use examkit_core::authoring::publish_exam;
use examkit_core::parser::load_exams;

use super::{login, Context};

pub async fn execute(ctx: &Context, exams: PathBuf, user: String, password: String) -> Result<()> {
    let drafts = load_exams(&exams)?;
    if drafts.is_empty() {
        anyhow::bail!("no exam files found in {}", exams.display());
    }

    tracing::info!(count = drafts.len(), path = %exams.display(), "importing exams");
    let store = ctx.open_store().await?;
    let author = login(&store, &user, &password).await?;

    for draft in &drafts {
        let exam = publish_exam(store.as_ref(), &author, draft)
            .await
            .with_context(|| format!("failed to publish \"{}\"", draft.title))?;
        println!(
            "Published exam {}: {} ({} questions)",
            exam.id,
            exam.title,
            draft.questions.len()
        );
    }

    store.close().await;
    Ok(())
}
