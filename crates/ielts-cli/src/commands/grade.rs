//! The `ielts grade` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use ielts_core::parser::{parse_responses, parse_test_definition};
use ielts_core::report::GradedAttempt;

pub fn execute(
    test_path: PathBuf,
    responses_path: PathBuf,
    module: Option<String>,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let test = parse_test_definition(&test_path)?;
    let responses = parse_responses(&responses_path)?;
    let module = match module {
        Some(m) => m,
        None => ielts_core::config::load_config()?.default_module,
    };

    let score = ielts_core::grader::grade(&test, &responses);
    let attempt = GradedAttempt::new(test.storage_id(), module, score);

    tracing::debug!(
        test = %attempt.test_id,
        raw = attempt.score.raw,
        max = attempt.score.max,
        "graded"
    );

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", attempt.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&attempt)?);
        }
        _ => print_text(&attempt),
    }

    if let Some(dir) = output {
        let path = dir.join(format!(
            "attempt-{}-{}.json",
            attempt.module,
            attempt.created_at.format("%Y%m%d-%H%M%S")
        ));
        attempt.save_json(&path)?;
        eprintln!("Attempt saved: {}", path.display());
    }

    Ok(())
}

pub(crate) fn print_text(attempt: &GradedAttempt) {
    let mut table = Table::new();
    table.set_header(vec!["Question", "Type", "Answer", "Accepted", "Score"]);

    for d in &attempt.score.details {
        let answer = d.user.as_ref().map(|u| u.to_string()).unwrap_or_default();
        table.add_row(vec![
            Cell::new(&d.key),
            Cell::new(&d.kind),
            Cell::new(answer),
            Cell::new(d.accepted.join(" / ")),
            Cell::new(format!("{}/{}", d.gained, d.max)),
        ]);
    }

    println!("{table}");
    println!(
        "Score: {}/{} ({:.1}%)",
        attempt.score.raw,
        attempt.score.max,
        attempt.score.percentage() * 100.0
    );
    println!("Estimated {} band: {:.1}", attempt.module, attempt.band);
}
