//! The `ielts session` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;

use ielts_core::config::PracticeConfig;
use ielts_core::model::Response;
use ielts_core::parser::parse_test_definition;
use ielts_core::session::{format_clock, session_storage_key, ExamSession, SessionPhase};
use ielts_core::store::FileStore;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Show position, progress, flags and time left
    Status,

    /// Record an answer (several values store a list)
    Answer {
        /// Question key
        #[arg(long)]
        key: String,

        /// Answer value(s)
        #[arg(long, num_args = 1.., required = true)]
        value: Vec<String>,
    },

    /// Jump to a question by flat index (clamped)
    Goto {
        #[arg(long, allow_negative_numbers = true)]
        index: isize,
    },

    /// Move to the next question
    Next,

    /// Move to the previous question
    Prev,

    /// Toggle the review flag on a question
    Flag {
        #[arg(long)]
        key: String,
    },

    /// Mark the session submitted and print the score
    Submit,

    /// Clear all answers, flags and timing
    Reset,
}

pub fn execute(
    action: SessionAction,
    test_path: Option<PathBuf>,
    module: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = ielts_core::config::load_config_from(config_path.as_deref())?;
    let test_path = test_path.context("--test is required for session commands")?;
    let test = parse_test_definition(&test_path)?;
    let module = module.unwrap_or_else(|| config.default_module.clone());

    // Id-less tests are keyed by where they were loaded from.
    let source = std::fs::canonicalize(&test_path).unwrap_or(test_path);
    let key = session_storage_key(&config.storage_prefix, &module, &test, Some(&source));
    let store = Arc::new(FileStore::new(&config.storage_dir));
    tracing::debug!(key = %key, dir = %config.storage_dir.display(), "opening session");
    let mut session = ExamSession::open_with_key(test, &module, key, store);

    if !matches!(action, SessionAction::Reset) && session.submit_if_expired(Utc::now()) {
        println!("Time is up. The session has been submitted.");
        return report_submission(&session, &config);
    }

    match action {
        SessionAction::Status => print_status(&session),
        SessionAction::Answer { key, mut value } => {
            if !session.questions().iter().any(|q| q.question.key == key) {
                tracing::warn!("question {key} is not in this test");
            }
            let response = if value.len() == 1 {
                Response::Text(value.remove(0))
            } else {
                Response::Many(value)
            };
            session.mark_started();
            println!("{key}: {response}");
            session.set_response(key, response);
        }
        SessionAction::Goto { index } => {
            session.mark_started();
            session.go_to_index(index);
            print_position(&session);
        }
        SessionAction::Next => {
            session.mark_started();
            session.next();
            print_position(&session);
        }
        SessionAction::Prev => {
            session.mark_started();
            session.prev();
            print_position(&session);
        }
        SessionAction::Flag { key } => {
            if session.toggle_flag(&key) {
                println!("Flagged {key}");
            } else {
                println!("Unflagged {key}");
            }
        }
        SessionAction::Submit => {
            session.submit();
            report_submission(&session, &config)?;
        }
        SessionAction::Reset => {
            session.reset_all();
            println!("Session reset.");
        }
    }

    Ok(())
}

/// Grade a submitted session, print it and save the attempt.
fn report_submission(session: &ExamSession, config: &PracticeConfig) -> Result<()> {
    let attempt = session.grade();
    super::grade::print_text(&attempt);

    let path = config.results_dir.join(format!(
        "attempt-{}-{}.json",
        attempt.module,
        attempt.created_at.format("%Y%m%d-%H%M%S")
    ));
    attempt.save_json(&path)?;
    eprintln!("Attempt saved: {}", path.display());
    Ok(())
}

fn print_position(session: &ExamSession) {
    match session.current() {
        Some(q) => println!(
            "Question {} of {} (key {}, section {})",
            session.current_index() + 1,
            session.total_questions(),
            q.question.key,
            q.section_id
        ),
        None => println!("This test has no questions."),
    }
}

fn print_status(session: &ExamSession) {
    let test = session.test();
    println!(
        "Test: {} [{}]",
        test.title.as_deref().unwrap_or("untitled"),
        test.storage_id()
    );
    println!("Module: {}", session.module());

    let phase = match session.phase() {
        SessionPhase::Created => "not started",
        SessionPhase::InProgress => "in progress",
        SessionPhase::Submitted => "submitted",
    };
    println!("Status: {phase}");
    print_position(session);
    println!(
        "Answered: {}/{}",
        session.answered_count(),
        session.total_questions()
    );

    let flagged = session.flagged();
    if !flagged.is_empty() {
        println!("Flagged: {}", flagged.join(", "));
    }

    let now = Utc::now();
    if let Some(remaining) = session.remaining_seconds(now) {
        if session.is_time_up(now) {
            println!("Time is up.");
        } else {
            println!("Time left: {}", format_clock(remaining));
        }
    }
}
