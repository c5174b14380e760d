//! The `ielts validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(tests_path: PathBuf) -> Result<()> {
    let tests = if tests_path.is_dir() {
        ielts_core::parser::load_test_directory(&tests_path)?
    } else {
        vec![ielts_core::parser::parse_test_definition(&tests_path)?]
    };

    let mut total_warnings = 0;

    for test in &tests {
        let title = test.title.as_deref().unwrap_or("untitled");
        println!(
            "Test: {} [{}] ({} questions, {} sections)",
            title,
            test.storage_id(),
            test.question_count(),
            test.sections.len()
        );

        let warnings = ielts_core::parser::validate_test(test);
        for w in &warnings {
            let prefix = w
                .key
                .as_ref()
                .map(|key| format!("  [{key}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All tests valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
