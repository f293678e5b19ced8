//! TOML exam file parser.
//!
//! Loads exam drafts from TOML files and directories so instructors can
//! author exams as text and import them.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::authoring::{ExamDraft, QuestionDraft};

/// Intermediate TOML structure for parsing exam files.
#[derive(Debug, Deserialize)]
struct TomlExamFile {
    exam: TomlExamHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlExamHeader {
    title: String,
    #[serde(default = "default_duration")]
    duration_minutes: u32,
}

fn default_duration() -> u32 {
    30
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    text: String,
    options: Vec<String>,
    /// Zero-based index of the correct option.
    correct: u32,
    #[serde(default)]
    explanation: Option<String>,
}

/// Parse a single TOML file into an [`ExamDraft`].
pub fn parse_exam_file(path: &Path) -> Result<ExamDraft> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exam file: {}", path.display()))?;

    parse_exam_str(&content, path)
}

/// Parse a TOML string into an [`ExamDraft`]. The draft is not validated.
pub fn parse_exam_str(content: &str, source_path: &Path) -> Result<ExamDraft> {
    let parsed: TomlExamFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| QuestionDraft {
            text: q.text,
            options: q.options,
            correct_option: q.correct,
            explanation: q.explanation.filter(|e| !e.trim().is_empty()),
        })
        .collect();

    Ok(ExamDraft {
        title: parsed.exam.title,
        duration_minutes: parsed.exam.duration_minutes,
        questions,
    })
}

/// Recursively load all `.toml` exam files from a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_exam_directory(dir: &Path) -> Result<Vec<ExamDraft>> {
    let mut drafts = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            drafts.extend(load_exam_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_exam_file(&path) {
                Ok(draft) => drafts.push(draft),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(drafts)
}

/// Load a single file or every exam file under a directory.
pub fn load_exams(path: &Path) -> Result<Vec<ExamDraft>> {
    if path.is_dir() {
        load_exam_directory(path)
    } else {
        Ok(vec![parse_exam_file(path)?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALGEBRA: &str = r#"
[exam]
title = "Algebra"
duration_minutes = 1

[[questions]]
text = "x + 1 = 2, x = ?"
options = ["0", "1", "2"]
correct = 1
explanation = "Subtract one from both sides."

[[questions]]
text = "2x = 0, x = ?"
options = ["0", "2"]
correct = 0
"#;

    #[test]
    fn parses_header_and_questions() {
        let draft = parse_exam_str(ALGEBRA, Path::new("algebra.toml")).unwrap();
        assert_eq!(draft.title, "Algebra");
        assert_eq!(draft.duration_minutes, 1);
        assert_eq!(draft.questions.len(), 2);
        assert_eq!(draft.questions[0].correct_option, 1);
        assert!(draft.questions[0].explanation.is_some());
        assert!(draft.questions[1].explanation.is_none());
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn duration_defaults_when_missing() {
        let draft = parse_exam_str("[exam]\ntitle = \"Quick\"\n", Path::new("q.toml")).unwrap();
        assert_eq!(draft.duration_minutes, 30);
        assert!(draft.questions.is_empty());
    }

    #[test]
    fn malformed_toml_names_the_file() {
        let err = parse_exam_str("[exam\ntitle=", Path::new("broken.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }

    #[test]
    fn directory_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.toml"), ALGEBRA).unwrap();
        std::fs::write(dir.path().join("b.toml"), "not = [valid").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let drafts = load_exam_directory(dir.path()).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Algebra");
    }

    #[test]
    fn load_exams_rejects_missing_file() {
        assert!(load_exams(Path::new("does-not-exist.toml")).is_err());
    }
}
