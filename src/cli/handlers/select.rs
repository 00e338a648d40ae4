//! Evidence selection handler.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::cli::output::{output_json, print_header, print_hint, print_table, truncate, OutputMode};
use crate::init::AppContext;
use crate::models::EvidenceRecord;
use crate::services::{
    build_id_index, build_timeline_text, render_raw_source, select_relevant, Selection,
    TimelineOptions,
};

/// How the selected records are printed in human mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectView {
    Table,
    Timeline,
    Raw,
}

/// Read an evidence file: a JSON array of records.
pub fn read_records(path: &Path) -> Result<Vec<EvidenceRecord>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let records: Vec<EvidenceRecord> = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array of evidence records", path.display()))?;
    Ok(records)
}

#[derive(Serialize)]
struct SelectionView<'a> {
    #[serde(flatten)]
    selection: &'a Selection,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

pub fn handle_select(
    ctx: &AppContext,
    records_path: &Path,
    query: &str,
    ids: &[i64],
    view: SelectView,
    mode: OutputMode,
) -> Result<()> {
    let records = read_records(records_path)?;
    let index = build_id_index(&records);
    let selection = select_relevant(query, &records, ids, &index, &ctx.config.selection);

    let text = match view {
        SelectView::Table => None,
        SelectView::Timeline => Some(build_timeline_text(
            &selection.records,
            TimelineOptions::default(),
        )),
        SelectView::Raw => Some(render_raw_source(
            &selection.records,
            ctx.config.selection.max_records,
            None,
        )),
    };

    if mode == OutputMode::Json {
        output_json(&SelectionView {
            selection: &selection,
            text,
        });
        return Ok(());
    }

    print_header(&format!(
        "Selected {} of {} records ({:?})",
        selection.records.len(),
        records.len(),
        selection.strategy
    ));

    if let Some(text) = text {
        if text.is_empty() {
            print_hint("Selected records have no text.");
        } else {
            println!("{}", text);
        }
        return Ok(());
    }

    let rows = selection
        .records
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.timestamp.clone(),
                truncate(&r.searchable_text(), 80),
            ]
        })
        .collect();
    print_table(&["ID", "Timestamp", "Text"], rows);
    Ok(())
}
