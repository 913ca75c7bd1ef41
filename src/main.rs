mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quarry::config::QuarryConfig;
use quarry::desk::ResearchDesk;
use quarry::memory::gaps::GapMode;

#[derive(Parser)]
#[command(name = "quarry", version, about = "Personal research assistant with annotated memory")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk and store a document (pdf, txt, md)
    Ingest { path: PathBuf },
    /// Answer a question from stored documents and log it to memory
    Ask { question: String },
    /// Show the stored chunks most relevant to a query
    Search {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Surface under-covered or stale topics in the memory log
    Gaps {
        #[arg(long, default_value = "all")]
        mode: GapMode,
    },
    /// Write the analytics report (per-topic impact, top questions)
    Report {
        #[arg(long)]
        top_n: Option<usize>,
    },
    /// Summarize what has been learned per topic
    Reflect {
        /// Show the top 3 questions per topic by impact score
        #[arg(long)]
        show_top: bool,
        /// Minimum impact score required to include an entry
        #[arg(long, default_value_t = 0)]
        score_threshold: i64,
    },
    /// Convert the memory log into retrievable chunks
    Rechunk,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.quarry/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = QuarryConfig::load()?;

    // stdout carries command output; logs go to stderr.
    let filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let desk = Arc::new(ResearchDesk::from_config(&config));

    match cli.command {
        Command::Ingest { path } => cli::ingest::ingest(&config, &desk, &path)?,
        Command::Ask { question } => cli::ask::ask(&config, &desk, &question).await?,
        Command::Search { query, top_k } => {
            let top_k = top_k.unwrap_or(desk.top_k());
            cli::search::search(Arc::clone(&desk), &query, top_k).await?
        }
        Command::Gaps { mode } => cli::gaps::gaps(&desk, mode)?,
        Command::Report { top_n } => cli::report::report(&config, &desk, top_n)?,
        Command::Reflect {
            show_top,
            score_threshold,
        } => cli::reflect::reflect(&desk, show_top, score_threshold)?,
        Command::Rechunk => cli::rechunk::rechunk(&desk)?,
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
