//! Knowledge graph handlers: ingest, stats, export.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::cli::output::{output_json, print_header, print_kv, print_success, print_table, OutputMode};
use crate::init::AppContext;
use crate::models::GraphUpdate;
use crate::services::{write_document, GraphFormat};
use crate::workers::{parse_facts, parse_insights};

#[derive(Serialize)]
struct IngestReport {
    subject_id: String,
    facts: usize,
    insights: usize,
    updates: Vec<GraphUpdate>,
}

pub fn handle_ingest(
    ctx: &AppContext,
    facts_path: &Path,
    subject: &str,
    insights_path: Option<&Path>,
    mode: OutputMode,
) -> Result<()> {
    let raw_facts = std::fs::read_to_string(facts_path)
        .with_context(|| format!("Failed to read {}", facts_path.display()))?;
    let facts = parse_facts(&raw_facts);

    let insights = match insights_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse_insights(&raw)
        }
        None => Vec::new(),
    };

    let updates = ctx.graph.update(&facts, &insights, subject)?;
    ctx.save_graph()?;

    let report = IngestReport {
        subject_id: subject.trim().to_string(),
        facts: facts.len(),
        insights: insights.len(),
        updates,
    };

    if mode == OutputMode::Json {
        output_json(&report);
        return Ok(());
    }

    print_success(&format!(
        "Ingested {} facts and {} insights for '{}' ({} graph updates)",
        report.facts,
        report.insights,
        report.subject_id,
        report.updates.len()
    ));
    print_kv("saved to", &ctx.graph_path().display().to_string());
    Ok(())
}

#[derive(Serialize)]
struct SubjectStats {
    subject_id: String,
    nodes: usize,
    edges: usize,
}

pub fn handle_stats(ctx: &AppContext, subject: Option<&str>, mode: OutputMode) -> Result<()> {
    let subjects: Vec<String> = match subject {
        Some(s) => vec![s.trim().to_string()],
        None => ctx.graph.subjects(),
    };
    let stats: Vec<SubjectStats> = subjects
        .into_iter()
        .map(|subject_id| SubjectStats {
            nodes: ctx.graph.node_count(Some(&subject_id)),
            edges: ctx.graph.edge_count(Some(&subject_id)),
            subject_id,
        })
        .collect();

    if mode == OutputMode::Json {
        output_json(&stats);
        return Ok(());
    }

    print_header("Knowledge graph");
    print_kv("nodes", &ctx.graph.node_count(None).to_string());
    print_kv("edges", &ctx.graph.edge_count(None).to_string());
    println!();
    let rows = stats
        .iter()
        .map(|s| vec![s.subject_id.clone(), s.nodes.to_string(), s.edges.to_string()])
        .collect();
    print_table(&["Subject", "Nodes", "Edges"], rows);
    Ok(())
}

pub fn handle_export(
    ctx: &AppContext,
    out: &Path,
    format: Option<GraphFormat>,
    mode: OutputMode,
) -> Result<()> {
    let format = format.unwrap_or_else(|| GraphFormat::from_path(out));
    let document = ctx.graph.to_document();
    write_document(&document, out, format)?;

    if mode == OutputMode::Json {
        output_json(&serde_json::json!({
            "status": "ok",
            "path": out.display().to_string(),
            "format": format,
            "nodes": document.nodes.len(),
            "edges": document.links.len(),
        }));
    } else {
        print_success(&format!(
            "Exported {} nodes and {} edges to {} ({})",
            document.nodes.len(),
            document.links.len(),
            out.display(),
            format
        ));
    }
    Ok(())
}
