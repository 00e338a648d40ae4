//! CLI interface for Mnemos.

pub mod handlers;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::services::GraphFormat;
use output::OutputMode;

/// Mnemos - per-turn memory orchestration toolkit
#[derive(Parser)]
#[command(name = "mnemos", version, about, long_about = None)]
pub struct Cli {
    /// Override data directory (default: ~/.mnemos)
    #[arg(long, env = "MNEMOS_DATA_PATH", global = true)]
    pub data_path: Option<PathBuf>,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show how a query would be routed
    Route {
        /// The query text
        query: String,
        /// Explicit task-type label (takes priority when recognized)
        #[arg(long)]
        label: Option<String>,
    },

    /// Extract date tokens from a query
    Dates {
        /// The query text
        query: String,
    },

    /// Select evidence records relevant to a query
    Select {
        /// JSON file holding an array of evidence records
        records: PathBuf,
        /// The query text
        #[arg(long)]
        query: String,
        /// Explicit record ids (comma-separated)
        #[arg(long, value_delimiter = ',')]
        ids: Vec<i64>,
        /// Print the selection as time-ordered timeline text
        #[arg(long, conflicts_with = "raw")]
        timeline: bool,
        /// Print the selection as untruncated raw-source blocks
        #[arg(long)]
        raw: bool,
    },

    /// Knowledge graph operations
    #[command(subcommand)]
    Graph(GraphCommands),

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
pub enum GraphCommands {
    /// Feed extraction output into the graph and save it
    Ingest {
        /// File with fact-extraction output (JSON, possibly fenced or truncated)
        facts: PathBuf,
        /// Subject the facts belong to
        #[arg(long)]
        subject: String,
        /// File with reflection output to attach as insights
        #[arg(long)]
        insights: Option<PathBuf>,
    },

    /// Node and edge counts
    Stats {
        /// Restrict counts to one subject
        #[arg(long)]
        subject: Option<String>,
    },

    /// Write the graph to a file
    Export {
        /// Output path
        out: PathBuf,
        /// json or yaml (default: from the file extension)
        #[arg(long)]
        format: Option<GraphFormat>,
    },
}

/// Dispatch a parsed command.
pub async fn execute(
    command: &Commands,
    ctx: &crate::init::AppContext,
    mode: OutputMode,
) -> anyhow::Result<()> {
    match command {
        Commands::Route { query, label } => {
            handlers::route::handle_route(query, label.as_deref(), mode)?
        }

        Commands::Dates { query } => handlers::route::handle_dates(query, mode)?,

        Commands::Select {
            records,
            query,
            ids,
            timeline,
            raw,
        } => {
            let view = if *timeline {
                handlers::select::SelectView::Timeline
            } else if *raw {
                handlers::select::SelectView::Raw
            } else {
                handlers::select::SelectView::Table
            };
            handlers::select::handle_select(ctx, records, query, ids, view, mode)?
        }

        Commands::Graph(cmd) => match cmd {
            GraphCommands::Ingest {
                facts,
                subject,
                insights,
            } => handlers::graph::handle_ingest(ctx, facts, subject, insights.as_deref(), mode)?,
            GraphCommands::Stats { subject } => {
                handlers::graph::handle_stats(ctx, subject.as_deref(), mode)?
            }
            GraphCommands::Export { out, format } => {
                handlers::graph::handle_export(ctx, out, *format, mode)?
            }
        },

        Commands::Config => handlers::config::handle_config(ctx, mode)?,
    }

    Ok(())
}
