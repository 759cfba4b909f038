//! HearLearn CLI - manage the document library from the terminal

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hearlearn_core::{Config, DocumentId, DocumentStatus};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse a document id, rejecting anything that could escape the data directory
fn parse_id(s: &str) -> Result<DocumentId, String> {
    DocumentId::parse(s).map_err(|e| e.to_string())
}

/// Parse a page number as shown to users (must be at least 1)
fn parse_page(s: &str) -> Result<u32, String> {
    let n: u32 = s.parse().map_err(|_| format!("'{}' is not a valid page number", s))?;
    if n < 1 {
        Err("page numbers start at 1".to_string())
    } else {
        Ok(n)
    }
}

fn parse_status(s: &str) -> Result<DocumentStatus, String> {
    match s {
        "processing" => Ok(DocumentStatus::Processing),
        "ready" => Ok(DocumentStatus::Ready),
        "failed" => Ok(DocumentStatus::Failed),
        other => Err(format!(
            "unknown status '{}' (expected processing, ready or failed)",
            other
        )),
    }
}

#[derive(Parser)]
#[command(name = "hearlearn")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Library directory (overrides HEARLEARN_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Extraction service URL (overrides HEARLEARN_EXTRACTION_URL)
    #[arg(long, global = true)]
    extraction_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List documents in the library
    List {
        /// Only show documents with this status (processing, ready, failed)
        #[arg(short, long, value_parser = parse_status)]
        status: Option<DocumentStatus>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display information about a document
    Info {
        /// Document id
        #[arg(value_parser = parse_id)]
        id: DocumentId,

        /// Print the extracted text of every page
        #[arg(long)]
        text: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload a file for extraction and ingest its pages
    Ingest {
        /// Input file path
        input: PathBuf,

        /// Queue the document without fetching pages now
        #[arg(long)]
        no_wait: bool,
    },

    /// Queue a failed document for another ingestion attempt
    Retry {
        /// Document id
        #[arg(value_parser = parse_id)]
        id: DocumentId,

        /// Queue the document without fetching pages now
        #[arg(long)]
        no_wait: bool,
    },

    /// Remove a document and its stored content
    Remove {
        /// Document id
        #[arg(value_parser = parse_id)]
        id: DocumentId,
    },

    /// Toggle the bookmark on a page
    Bookmark {
        /// Document id
        #[arg(value_parser = parse_id)]
        id: DocumentId,

        /// Page number, starting at 1
        #[arg(value_parser = parse_page)]
        page: u32,
    },

    /// Attach a note to a page; omit the text to delete the note
    Annotate {
        /// Document id
        #[arg(value_parser = parse_id)]
        id: DocumentId,

        /// Page number, starting at 1
        #[arg(value_parser = parse_page)]
        page: u32,

        /// Note text
        text: Option<String>,
    },

    /// Show listening statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "hearlearn_cli=debug,hearlearn_core=debug"
    } else {
        "hearlearn_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(url) = cli.extraction_url {
        config.extraction_url = url.trim_end_matches('/').to_string();
    }

    let app = commands::App::open(config).await?;

    match cli.command {
        Commands::List { status, json } => commands::list(&app, status, json).await,

        Commands::Info { id, text, json } => commands::info(&app, &id, text, json).await,

        Commands::Ingest { input, no_wait } => commands::ingest(&app, &input, !no_wait).await,

        Commands::Retry { id, no_wait } => commands::retry(&app, &id, !no_wait).await,

        Commands::Remove { id } => commands::remove(&app, &id).await,

        Commands::Bookmark { id, page } => commands::bookmark(&app, &id, page - 1).await,

        Commands::Annotate { id, page, text } => {
            commands::annotate(&app, &id, page - 1, text).await
        }

        Commands::Stats { json } => commands::stats(&app, json).await,
    }
}
