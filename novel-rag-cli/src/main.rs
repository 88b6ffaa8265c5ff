//! Command-line launcher for the novel RAG system.
//!
//! ```text
//! novel-rag ingest --data-dir ./novels
//! novel-rag ask "Who wrote the letters?" --json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use novel_rag::{QaResponse, RagConfig, RagSystem};
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "novel-rag", version, about = "Ask questions about your own library of novels")]
struct Cli {
    /// Directory holding the persisted vector index.
    #[arg(long, global = true, env = "NOVEL_RAG_INDEX_DIR")]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split, embed and index every text file under the corpus directory.
    Ingest {
        /// Corpus directory (defaults to the configured data directory).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Answer a question from the indexed corpus.
    Ask {
        /// The question to answer.
        question: String,
        /// Print the response as JSON.
        #[arg(long)]
        json: bool,
        /// Skip relevance reranking.
        #[arg(long)]
        no_rerank: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<RagConfig> {
    let mut config = RagConfig::from_env().context("failed to load configuration")?;
    if let Some(dir) = &cli.index_dir {
        config.paths.index_dir = dir.clone();
    }
    if let Command::Ask { no_rerank: true, .. } = cli.command {
        config.rerank.enabled = false;
    }
    if !config.is_configured() {
        warn!("no API key found in GOOGLE_API_KEY or GEMINI_API_KEY");
    }
    Ok(config)
}

fn print_response(response: &QaResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    println!("{}", response.answer);
    if !response.sources.is_empty() {
        println!("\nSources:");
        for (i, source) in response.sources.iter().enumerate() {
            let preview: String = source.content.chars().take(80).collect();
            println!("  [{}] {} | {}", i + 1, source.source, preview.replace('\n', " "));
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let system = RagSystem::gemini(config);

    match cli.command {
        Command::Ingest { data_dir: Some(corpus) } => {
            let count = system.ingest(&corpus).await?;
            println!("Indexed {count} chunks from {}", corpus.display());
        }
        Command::Ingest { data_dir: None } => {
            let count = system.ingest_default().await?;
            println!("Indexed {count} chunks from {}", system.config().paths.data_dir.display());
        }
        Command::Ask { question, json, .. } => {
            let response = system.ask(&question).await?;
            print_response(&response, json)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
