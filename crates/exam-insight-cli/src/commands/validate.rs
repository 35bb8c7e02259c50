//! The `exam-insight validate` command.

use std::path::PathBuf;

use anyhow::Result;

use exam_insight_core::input::{load_requests, validate_request};

pub fn execute(request_path: PathBuf) -> Result<()> {
    let loaded = load_requests(&request_path)?;

    let mut total_errors = 0;
    let mut total_warnings = 0;

    for (path, request) in &loaded {
        println!(
            "{}: {} ({} questions)",
            path.display(),
            request.subject,
            request.total_questions
        );

        for issue in validate_request(request) {
            if issue.is_error() {
                total_errors += 1;
                println!("  [{}] ERROR: {}", issue.field, issue.message);
            } else {
                total_warnings += 1;
                println!("  [{}] WARNING: {}", issue.field, issue.message);
            }
        }
    }

    if total_errors == 0 && total_warnings == 0 {
        println!("All requests valid.");
    } else {
        println!("\n{total_errors} error(s), {total_warnings} warning(s) found.");
    }

    anyhow::ensure!(total_errors == 0, "{total_errors} validation error(s)");
    Ok(())
}
