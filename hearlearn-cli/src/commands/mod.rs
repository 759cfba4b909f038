//! CLI command implementations

mod ingest;
mod library;
mod marks;
mod stats;

pub use ingest::{ingest, retry};
pub use library::{info, list, remove};
pub use marks::{annotate, bookmark};
pub use stats::stats;

use anyhow::{Context, Result};
use hearlearn_core::{Config, HttpExtractor, IngestPipeline, Library, LocalStorage};
use std::sync::Arc;

/// The library opened over the configured data directory
pub struct App {
    config: Config,
    library: Arc<Library>,
}

impl App {
    pub async fn open(config: Config) -> Result<Self> {
        tracing::debug!(data_dir = %config.data_dir.display(), "Opening library");

        let storage = Arc::new(LocalStorage::new(&config.data_dir));
        let library = Library::open(storage)
            .await
            .with_context(|| format!("Failed to open library at {}", config.data_dir.display()))?;

        Ok(Self {
            config,
            library: Arc::new(library),
        })
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Pipeline talking to the configured extraction service
    pub fn pipeline(&self) -> IngestPipeline {
        IngestPipeline::new(
            self.library.clone(),
            Arc::new(HttpExtractor::new(self.config.extraction_url.clone())),
            self.config.pipeline(),
        )
    }
}
