//! # pdfchat CLI
//!
//! Drives the ingestion and retrieval pipeline from the command line.
//!
//! ## Usage
//!
//! ```bash
//! pdfchat --config ./config/pdfchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfchat ingest <KEY>` | Fetch, chunk, embed and upsert one document |
//! | `pdfchat context <KEY> <QUERY>` | Print the retrieval context for a question |
//! | `pdfchat namespace <KEY>` | Print the vector namespace a key maps to |
//!
//! Logs go to stderr and are filtered with `RUST_LOG`
//! (e.g. `RUST_LOG=pdfchat=debug`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use pdfchat::config;
use pdfchat::Pipeline;
use pdfchat_core::namespace::sanitize_key;

/// pdfchat: chat-with-your-PDF ingestion and retrieval.
#[derive(Parser)]
#[command(
    name = "pdfchat",
    about = "Ingest PDF documents into a vector index and retrieve chat context",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/pdfchat.toml`. See
    /// `config/pdfchat.example.toml` for every option.
    #[arg(long, global = true, default_value = "./config/pdfchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one document.
    ///
    /// Fetches the object stored under KEY, splits its pages into chunks,
    /// embeds them and upserts the vectors into the namespace derived from
    /// KEY. Re-running on an unchanged document overwrites the same records.
    Ingest {
        /// Object key of the document (e.g. `uploads/1700000000-report.pdf`).
        key: String,
    },

    /// Print the context retrieved for a question about one document.
    ///
    /// Prints `No relevant context found.` when nothing in the document is
    /// similar enough to the question.
    Context {
        /// Object key the document was ingested under.
        key: String,
        /// The question.
        query: String,
    },

    /// Print the namespace a document key maps to. Does not read config.
    Namespace { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pdfchat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Namespace { key } = &cli.command {
        println!("{}", sanitize_key(key));
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;
    let pipeline = Pipeline::from_config(&cfg)?;

    match cli.command {
        Commands::Ingest { key } => {
            let report = pipeline.ingest(&key).await?;
            println!("ingest {}", key);
            println!("  namespace: {}", report.namespace);
            println!("  pages: {}", report.pages);
            println!("  chunks: {}", report.chunks);
            println!("  records upserted: {}", report.record_ids.len());
            println!("ok");
        }
        Commands::Context { key, query } => {
            let context = pipeline.retrieve(&query, &key).await?;
            println!("{}", context);
        }
        Commands::Namespace { .. } => {}
    }

    Ok(())
}
