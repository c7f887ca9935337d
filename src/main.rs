use clap::{Parser, Subcommand};
use std::path::PathBuf;
use transcript_search::commands::{build_collection, search, show_status};
use transcript_search::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "transcript-search")]
#[command(about = "Semantic search over a corpus of video transcripts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection, search defaults and corpus columns
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Embed a CSV corpus into a collection. Does nothing if the collection exists.
    Build {
        /// CSV file with title, channel and transcript columns
        #[arg(long)]
        corpus: Option<PathBuf>,
        /// Collection to build, defaults to the configured one
        #[arg(long)]
        collection: Option<String>,
    },
    /// Search a collection. Starts an interactive session when no query is given.
    Search {
        /// Query text
        query: Option<String>,
        /// Collection to search, defaults to the configured one
        #[arg(long)]
        collection: Option<String>,
        /// Number of results to return
        #[arg(long, short = 'k')]
        top_k: Option<usize>,
        /// Build the collection from this CSV first if it does not exist
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Show configuration, Ollama health and collections
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Build { corpus, collection } => {
            build_collection(corpus, collection).await?;
        }
        Commands::Search {
            query,
            collection,
            top_k,
            corpus,
        } => {
            search(query, collection, top_k, corpus).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
