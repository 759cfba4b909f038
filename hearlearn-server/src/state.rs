//! Application state

use anyhow::{Context, Result};
use hearlearn_core::ingest::{Extractor, HttpExtractor, IngestEvent, IngestPipeline, PipelineConfig};
use hearlearn_core::storage::{LocalStorage, StorageProvider};
use hearlearn_core::{Config, Library, SettingsStore};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Catalog and page content
    pub library: Arc<Library>,

    /// Background ingestion; also the source of SSE events
    pub pipeline: Arc<IngestPipeline>,

    /// User preferences
    pub settings: Arc<SettingsStore>,

    /// Allowed CORS origins; `None` allows the local dev origins
    pub cors_origins: Option<String>,
}

impl AppState {
    /// Build state over local storage and the HTTP extraction service
    pub async fn new(config: &Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            extraction_url = %config.extraction_url,
            "Opening library"
        );

        let storage = Arc::new(LocalStorage::new(&config.data_dir));
        let extractor = Arc::new(HttpExtractor::new(config.extraction_url.clone()));
        let mut state = Self::from_parts(storage, extractor, config.pipeline()).await?;
        state.cors_origins = config.cors_origins.clone();
        Ok(state)
    }

    /// Build state from explicit collaborators
    pub async fn from_parts(
        storage: Arc<dyn StorageProvider>,
        extractor: Arc<dyn Extractor>,
        pipeline_config: PipelineConfig,
    ) -> Result<Self> {
        let library = Arc::new(
            Library::open(storage.clone())
                .await
                .context("Failed to open library")?,
        );
        let settings = Arc::new(
            SettingsStore::init(storage)
                .await
                .context("Failed to load settings")?,
        );
        let pipeline = Arc::new(IngestPipeline::new(
            library.clone(),
            extractor,
            pipeline_config,
        ));

        Ok(Self {
            library,
            pipeline,
            settings,
            cors_origins: None,
        })
    }

    /// Start the ingestion worker
    pub fn start_worker(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        self.pipeline.spawn(shutdown)
    }

    /// Subscribe to ingestion events
    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.pipeline.subscribe()
    }
}
