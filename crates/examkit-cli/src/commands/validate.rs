//! The `examkit validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(exams_path: PathBuf) -> Result<()> {
    let drafts = examkit_core::parser::load_exams(&exams_path)?;

    let mut invalid = 0;

    for draft in &drafts {
        println!(
            "Exam: {} ({} questions, {} minutes)",
            draft.title,
            draft.questions.len(),
            draft.duration_minutes
        );

        if let Err(e) = draft.validate() {
            println!("  ERROR: {e}");
            invalid += 1;
        }
    }

    if drafts.is_empty() {
        anyhow::bail!("no exam files found in {}", exams_path.display());
    }
    if invalid > 0 {
        anyhow::bail!("{invalid} invalid exam(s)");
    }
    println!("All exams valid.");

    Ok(())
}
