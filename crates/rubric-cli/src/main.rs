//! `rubric` — CLI binary for the rubric classification engine.
//!
//! Provides the following subcommands:
//!
//! - `rubric classify` — Classify a single item name against a taxonomy.
//! - `rubric bulk` — Run the pipeline over a catalog file with bounded
//!   concurrency.
//! - `rubric status` — Show resolved configuration and gateway
//!   diagnostics.

use clap::{Parser, Subcommand};

mod commands;

/// rubric classification CLI.
#[derive(Parser)]
#[command(
    name = "rubric",
    about = "AI-assisted catalog classification",
    version,
    disable_help_subcommand = true
)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Classify a single item name.
    Classify(commands::classify::ClassifyArgs),

    /// Classify a whole catalog file.
    Bulk(commands::bulk::BulkArgs),

    /// Show resolved configuration and gateway diagnostics.
    Status(commands::status::StatusArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    match cli.command {
        Commands::Classify(args) => commands::classify::run(args).await?,
        Commands::Bulk(args) => commands::bulk::run(args).await?,
        Commands::Status(args) => commands::status::run(args).await?,
    }
    Ok(())
}
