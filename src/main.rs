//! Mnemos - per-turn memory orchestration toolkit
//!
//! Usage:
//!   mnemos route "When did she move?"      Show the routing decision for a query
//!   mnemos dates "from March 1975 to May 1975"
//!   mnemos select records.json --query Q   Pick relevant evidence records
//!   mnemos graph stats                     Knowledge graph counts
//!   mnemos --help                          Show all commands

use anyhow::Result;
use clap::Parser;

use mnemos::cli::output::OutputMode;
use mnemos::cli::{Cli, Commands};
use mnemos::init::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("mnemos=info".parse()?),
        )
        .init();

    let mode = OutputMode::from_json_flag(cli.json);

    match &cli.command {
        Commands::Route { query, label } => {
            mnemos::cli::handlers::route::handle_route(query, label.as_deref(), mode)?
        }
        Commands::Dates { query } => mnemos::cli::handlers::route::handle_dates(query, mode)?,
        cmd => {
            let ctx = AppContext::new(cli.data_path.clone()).await?;
            mnemos::cli::execute(cmd, &ctx, mode).await?;
        }
    }

    Ok(())
}
