//! The `examkit take` command: an interactive, timed exam in the terminal.

use std::io::BufRead;

use anyhow::{Context as _, Result};
use tokio::sync::mpsc;

use examkit_core::error::ExamError;
use examkit_core::model::ExamResult;
use examkit_core::session::{ExamSession, SessionState, SessionView};
use examkit_core::statistics::result_percentage;
use examkit_report::format_duration;

use super::{login, Context};

const HELP: &str = "Answer with a letter (A-G) or number (1, 2, ...). \
                    n = next, p = previous, t = time left, s = submit, q = save and quit";

/// Letters past G would shadow the command keys, so later options take numbers.
const LETTER_OPTIONS: u32 = 7;

enum Flow {
    Continue,
    Quit,
}

pub async fn execute(ctx: &Context, exam_id: i64, user: String, password: String) -> Result<()> {
    let store = ctx.open_store().await?;
    let user = login(&store, &user, &password).await?;

    let mut session = ExamSession::new(store.clone(), exam_id, user, ctx.config.session.clone());
    session
        .load()
        .await
        .with_context(|| format!("failed to load exam {exam_id}"))?;

    let view = session.view().await;
    let resumed = !view.answers.is_empty()
        || view
            .exam
            .as_ref()
            .is_some_and(|e| view.time_left_secs < e.duration_secs());
    if let Some(exam) = &view.exam {
        println!(
            "{} | {} questions | {} left{}",
            exam.title,
            view.question_count,
            format_clock(view.time_left_secs),
            if resumed { " | resuming saved progress" } else { "" }
        );
    }
    println!("{HELP}");

    session.start().await?;
    let mut state_rx = session.subscribe();
    let mut input = spawn_stdin_reader();

    match session.state() {
        SessionState::Failed(msg) => print_submit_failure(&msg),
        state if !state.is_terminal() => print_question(&session.view().await),
        _ => {}
    }

    // A failed submission stays open for another attempt until the user quits.
    while *state_rx.borrow() != SessionState::Submitted {
        tokio::select! {
            biased;
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                match &*state_rx.borrow_and_update() {
                    SessionState::Expired => println!("\nTime is up! Submitting your answers..."),
                    SessionState::Failed(msg) => print_submit_failure(msg),
                    _ => {}
                }
            }
            line = input.recv() => {
                let Some(line) = line else {
                    break;
                };
                if let Flow::Quit = handle_command(&session, line.trim()).await {
                    break;
                }
            }
        }
    }

    let view = session.view().await;
    let outcome = match (&view.state, &view.result) {
        (SessionState::Submitted, Some(result)) => {
            print_result(result);
            Ok(())
        }
        // Only clearing the resume row failed; `close` retries that.
        (SessionState::Failed(_), Some(result)) => {
            print_result(result);
            Ok(())
        }
        (SessionState::Failed(msg), None) => Err(anyhow::anyhow!(
            "submission failed: {msg}; your answers were saved, run `take` again to retry"
        )),
        _ => {
            println!(
                "\nProgress saved ({} answered, {} left). Resume with `examkit take {exam_id}`.",
                view.answers.len(),
                format_clock(view.time_left_secs)
            );
            Ok(())
        }
    };

    session.close().await;
    store.close().await;
    outcome
}

/// Read stdin on a plain thread so an unfinished read never holds the
/// runtime open at exit.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn handle_command(session: &ExamSession, command: &str) -> Flow {
    match command.to_ascii_lowercase().as_str() {
        "" => {}
        "q" | "quit" => return Flow::Quit,
        "h" | "help" | "?" => println!("{HELP}"),
        "t" => println!("{} left", format_clock(session.time_left().await)),
        "n" | "next" => match session.next().await {
            Ok(_) => print_question(&session.view().await),
            Err(e) => println!("{}", user_message(&e)),
        },
        "p" | "prev" | "previous" => match session.previous().await {
            Ok(_) => print_question(&session.view().await),
            Err(e) => println!("{}", user_message(&e)),
        },
        "s" | "submit" => match session.submit().await {
            Ok(_) => return Flow::Quit,
            // Reported through the state change.
            Err(e) if e.is_retryable() => {}
            Err(e) => println!("Cannot submit yet: {}", user_message(&e)),
        },
        other => match parse_option(other) {
            Some(option) => match session.answer_current(option).await {
                Ok(()) => {
                    let view = session.view().await;
                    println!(
                        "Answered {} for question {}. ({}/{} answered)",
                        option_label(option),
                        view.cursor + 1,
                        view.answers.len(),
                        view.question_count
                    );
                }
                Err(e) => println!("{}", user_message(&e)),
            },
            None => println!("Unknown command {other:?}. {HELP}"),
        },
    }
    Flow::Continue
}

fn user_message(e: &ExamError) -> String {
    match e {
        ExamError::Validation(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn print_submit_failure(msg: &str) {
    println!("Submission failed: {msg}. Type s to try again, or q to save and quit.");
}

/// `"b"` → 1, `"2"` → 1. Only `A`-`G` are letters.
fn parse_option(input: &str) -> Option<u32> {
    if let Ok(n) = input.parse::<u32>() {
        return n.checked_sub(1);
    }
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            let index = c.to_ascii_uppercase() as u32 - 'A' as u32;
            (index < LETTER_OPTIONS).then_some(index)
        }
        _ => None,
    }
}

/// `A`-`G`, then 1-based numbers.
fn option_label(index: u32) -> String {
    match char::from_u32('A' as u32 + index) {
        Some(c) if index < LETTER_OPTIONS => c.to_string(),
        _ => (index + 1).to_string(),
    }
}

fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn print_question(view: &SessionView) {
    let Some(question) = &view.current_question else {
        return;
    };
    println!(
        "\nQuestion {}/{}  [{} left]",
        view.cursor + 1,
        view.question_count,
        format_clock(view.time_left_secs)
    );
    println!("{}", question.text);
    let selected = view.current_answer();
    for (i, option) in question.options.iter().enumerate() {
        let marker = if selected == Some(i as u32) { " *" } else { "" };
        println!("  {}) {}{}", option_label(i as u32), option, marker);
    }
    if view.is_last_question() {
        println!("(last question, type s to submit)");
    }
}

fn print_result(result: &ExamResult) {
    println!(
        "\nSubmitted! Score: {}/{} ({:.0}%) in {}",
        result.score,
        result.total_questions,
        result_percentage(result),
        format_duration(result.time_spent_secs)
    );
    println!("Review it with `examkit review {}`.", result.id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_parse_from_letters_and_numbers() {
        assert_eq!(parse_option("a"), Some(0));
        assert_eq!(parse_option("C"), Some(2));
        assert_eq!(parse_option("1"), Some(0));
        assert_eq!(parse_option("0"), None);
        assert_eq!(parse_option("ab"), None);
        assert_eq!(parse_option("-"), None);
    }

    #[test]
    fn letters_stop_before_command_keys() {
        assert_eq!(parse_option("g"), Some(6));
        assert_eq!(parse_option("i"), None);
        assert_eq!(parse_option("8"), Some(7));
        assert_eq!(option_label(6), "G");
        assert_eq!(option_label(7), "8");
        assert_eq!(option_label(9), "10");
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(300), "5:00");
        assert_eq!(format_clock(59), "0:59");
    }
}
