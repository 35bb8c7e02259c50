//! The `exam-insight history` command.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use comfy_table::{Cell, Table};

use exam_insight_core::store::JsonlStore;
use exam_insight_providers::load_config_from;

pub fn execute(store_path: Option<PathBuf>, limit: usize, config_path: Option<PathBuf>) -> Result<()> {
    let path = match store_path {
        Some(path) => path,
        None => load_config_from(config_path.as_deref())?.store_path,
    };
    let store = JsonlStore::new(path);
    let records = store.load_all()?;

    if records.is_empty() {
        println!("No analyses stored in {}", store.path().display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Created", "Id", "Subject", "Rating", "Score", "Correct", "Weaknesses",
    ]);

    let skip = records.len().saturating_sub(limit);
    for record in records.iter().skip(skip) {
        let id = record.id.to_string();
        table.add_row(vec![
            Cell::new(
                record
                    .created_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M"),
            ),
            Cell::new(&id[..8]),
            Cell::new(&record.subject),
            Cell::new(record.rating),
            Cell::new(format!("{:.1}", record.analysis_result.summary.score)),
            Cell::new(format!(
                "{}/{}",
                record.correct_answers, record.total_questions
            )),
            Cell::new(if record.analysis_result.weaknesses.is_empty() {
                "-".to_string()
            } else {
                record.analysis_result.weaknesses.join(", ")
            }),
        ]);
    }

    println!("{table}");
    println!(
        "Showing {} of {} stored analyses.",
        records.len() - skip,
        records.len()
    );
    Ok(())
}
