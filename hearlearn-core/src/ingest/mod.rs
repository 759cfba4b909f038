//! Background document ingestion
//!
//! A submitted document enters the catalog as `processing`. The worker picks
//! the first such document, fetches its pages one by one from an
//! [`Extractor`], and commits either every page plus `ready`, or `failed`
//! with no pages. Only one document is ever being fetched at a time.

mod http;

pub use http::HttpExtractor;

use crate::error::{HearLearnError, IngestError, Result, ValidationError};
use crate::library::{binary_key, Library};
use crate::types::{Document, DocumentId, DocumentRecord, DocumentStatus, Page};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What the extraction service reports for a newly uploaded file
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: DocumentId,
    pub total_pages: u32,
    pub original_name: String,
}

/// Remote text extraction service
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Upload a file and learn its id and page count
    async fn initiate(&self, file_name: &str, bytes: Vec<u8>)
        -> std::result::Result<Submission, IngestError>;

    /// Content of one page; `page_number` starts at 1
    async fn fetch_page(
        &self,
        id: &DocumentId,
        page_number: u32,
    ) -> std::result::Result<Page, IngestError>;
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Bounded wait for a single page
    pub page_timeout: Duration,

    /// Rescan period when no catalog change wakes the worker
    pub scan_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(60),
            scan_interval: Duration::from_secs(5),
        }
    }
}

/// Progress notifications published while documents are ingested
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestEvent {
    Started { id: DocumentId, total_pages: u32 },
    PageFetched { id: DocumentId, page: u32, total_pages: u32 },
    Ready { id: DocumentId },
    Failed { id: DocumentId, error: String },
}

impl IngestEvent {
    /// Wire name, matching the serialized `type` tag
    pub fn name(&self) -> &'static str {
        match self {
            IngestEvent::Started { .. } => "started",
            IngestEvent::PageFetched { .. } => "page_fetched",
            IngestEvent::Ready { .. } => "ready",
            IngestEvent::Failed { .. } => "failed",
        }
    }

    pub fn id(&self) -> &DocumentId {
        match self {
            IngestEvent::Started { id, .. }
            | IngestEvent::PageFetched { id, .. }
            | IngestEvent::Ready { id }
            | IngestEvent::Failed { id, .. } => id,
        }
    }
}

/// Result of a single scan of the catalog
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Nothing is waiting
    Idle,
    /// Another fetch loop holds the slot
    Busy,
    Ready(DocumentId),
    Failed(DocumentId),
    /// The document was removed while its pages were being fetched
    Removed(DocumentId),
}

const EVENT_CAPACITY: usize = 64;

pub struct IngestPipeline {
    library: Arc<Library>,
    extractor: Arc<dyn Extractor>,
    config: PipelineConfig,
    active: AtomicBool,
    events: broadcast::Sender<IngestEvent>,
}

/// Releases the fetch slot when the loop ends, however it ends
struct ActiveSlot<'a>(&'a AtomicBool);

impl Drop for ActiveSlot<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl IngestPipeline {
    pub fn new(
        library: Arc<Library>,
        extractor: Arc<dyn Extractor>,
        config: PipelineConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            library,
            extractor,
            config,
            active: AtomicBool::new(false),
            events,
        }
    }

    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.events.subscribe()
    }

    /// Whether a fetch loop is running right now
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Upload a file and queue it for ingestion
    pub async fn submit(&self, file_name: &str, bytes: Vec<u8>) -> Result<Document> {
        let submission = self.extractor.initiate(file_name, bytes.clone()).await?;
        let name = decode_name(&submission.original_name);

        let key = binary_key(&submission.id);
        self.library.storage().write(&key, bytes).await?;

        let record = DocumentRecord::processing(submission.id, name, submission.total_pages)
            .with_local_resource(key);
        let doc = self.library.upsert(record).await?;

        tracing::info!(
            doc_id = %doc.id,
            total_pages = doc.total_pages,
            "Document submitted"
        );
        Ok(doc)
    }

    /// Put a failed document back in the queue
    pub async fn retry(&self, id: &DocumentId) -> Result<Document> {
        let doc = self.library.require(id).await?;
        if doc.status != DocumentStatus::Failed {
            return Err(IngestError::NotRetryable {
                id: id.clone(),
                status: doc.status,
            }
            .into());
        }

        let doc = self
            .library
            .upsert(DocumentRecord::from(&doc).into_processing())
            .await?;
        tracing::info!(doc_id = %id, "Document queued for retry");
        Ok(doc)
    }

    /// Ingest the first waiting document, unless a fetch loop is already active
    pub async fn scan_once(&self) -> Result<ScanOutcome> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(ScanOutcome::Busy);
        }
        let _slot = ActiveSlot(&self.active);

        match self.library.next_processing().await {
            Some(doc) => self.ingest(DocumentRecord::from(&doc)).await,
            None => Ok(ScanOutcome::Idle),
        }
    }

    async fn ingest(&self, record: DocumentRecord) -> Result<ScanOutcome> {
        let id = record.id.clone();
        tracing::info!(doc_id = %id, total_pages = record.total_pages, "Ingestion started");
        self.emit(IngestEvent::Started {
            id: id.clone(),
            total_pages: record.total_pages,
        });

        match self.fetch_pages(&record).await {
            Ok(pages) => {
                if !self.commit(record.into_ready(pages)).await? {
                    return Ok(ScanOutcome::Removed(id));
                }
                tracing::info!(doc_id = %id, "Document ready");
                self.emit(IngestEvent::Ready { id: id.clone() });
                Ok(ScanOutcome::Ready(id))
            }
            Err(e) => {
                tracing::warn!(doc_id = %id, error = %e, "Ingestion failed");
                if !self.commit(record.into_failed()).await? {
                    return Ok(ScanOutcome::Removed(id));
                }
                self.emit(IngestEvent::Failed {
                    id: id.clone(),
                    error: e.to_string(),
                });
                Ok(ScanOutcome::Failed(id))
            }
        }
    }

    /// Commit onto the catalog entry; false if it was removed meanwhile
    async fn commit(&self, record: DocumentRecord) -> Result<bool> {
        let id = record.id.clone();
        match self.library.commit(record).await {
            Ok(_) => Ok(true),
            Err(HearLearnError::Validation(ValidationError::DocumentNotFound(_))) => {
                tracing::info!(doc_id = %id, "Document removed during ingestion, discarding pages");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_pages(&self, record: &DocumentRecord) -> std::result::Result<Vec<Page>, IngestError> {
        if record.total_pages == 0 {
            return Err(IngestError::EmptyDocument);
        }

        let mut pages = Vec::with_capacity(record.total_pages as usize);
        for page in 1..=record.total_pages {
            let fetch = self.extractor.fetch_page(&record.id, page);
            let content = match tokio::time::timeout(self.config.page_timeout, fetch).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(IngestError::Timeout {
                        page,
                        seconds: self.config.page_timeout.as_secs(),
                    })
                }
            };

            tracing::debug!(doc_id = %record.id, page, "Page fetched");
            self.emit(IngestEvent::PageFetched {
                id: record.id.clone(),
                page,
                total_pages: record.total_pages,
            });
            pages.push(content);
        }

        Ok(pages)
    }

    /// Ingest documents until cancelled
    ///
    /// Wakes on catalog changes and on the scan interval, so a document left
    /// in `processing` by an earlier run is still picked up.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!("Ingestion worker started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                _ = self.drain() => {}
            }

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                _ = self.library.changed() => {}

                _ = tokio::time::sleep(self.config.scan_interval) => {}
            }
        }

        tracing::info!("Ingestion worker stopped");
    }

    /// Scan until nothing is left to ingest
    async fn drain(&self) {
        loop {
            match self.scan_once().await {
                Ok(ScanOutcome::Ready(_) | ScanOutcome::Failed(_) | ScanOutcome::Removed(_)) => continue,
                Ok(ScanOutcome::Idle) | Ok(ScanOutcome::Busy) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Ingestion scan failed");
                    break;
                }
            }
        }
    }

    /// Run the worker as a background task
    pub fn spawn(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.run(shutdown).await })
    }

    fn emit(&self, event: IngestEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Names may arrive percent-encoded; keep the raw name if decoding fails
fn decode_name(name: &str) -> String {
    match urlencoding::decode(name) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Extractor that answers from a script and records every page request
    #[derive(Default)]
    struct ScriptedExtractor {
        calls: Mutex<Vec<(String, u32)>>,
        /// Page numbers that never answer, per document
        stalls: Mutex<HashMap<String, u32>>,
        /// Page numbers that answer with an error, per document
        failures: Mutex<HashMap<String, u32>>,
        /// Page numbers that wait for a release, per document
        holds: Mutex<HashMap<String, (u32, Arc<tokio::sync::Notify>)>>,
    }

    impl ScriptedExtractor {
        fn stall(&self, id: &str, page: u32) {
            self.stalls.lock().unwrap().insert(id.to_string(), page);
        }

        fn fail(&self, id: &str, page: u32) {
            self.failures.lock().unwrap().insert(id.to_string(), page);
        }

        /// Hold a page until the returned handle is notified
        fn hold(&self, id: &str, page: u32) -> Arc<tokio::sync::Notify> {
            let release = Arc::new(tokio::sync::Notify::new());
            self.holds
                .lock()
                .unwrap()
                .insert(id.to_string(), (page, release.clone()));
            release
        }

        fn clear(&self) {
            self.stalls.lock().unwrap().clear();
            self.failures.lock().unwrap().clear();
        }

        fn calls(&self) -> Vec<(String, u32)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Extractor for ScriptedExtractor {
        async fn initiate(
            &self,
            file_name: &str,
            _bytes: Vec<u8>,
        ) -> std::result::Result<Submission, IngestError> {
            Ok(Submission {
                id: DocumentId::parse("3f2a.pdf").unwrap(),
                total_pages: 2,
                original_name: urlencoding::encode(file_name).into_owned(),
            })
        }

        async fn fetch_page(
            &self,
            id: &DocumentId,
            page_number: u32,
        ) -> std::result::Result<Page, IngestError> {
            self.calls
                .lock()
                .unwrap()
                .push((id.to_string(), page_number));
            tokio::task::yield_now().await;

            let stall = self.stalls.lock().unwrap().get(id.as_str()).copied();
            if stall == Some(page_number) {
                std::future::pending::<()>().await;
            }
            let hold = self
                .holds
                .lock()
                .unwrap()
                .get(id.as_str())
                .filter(|(page, _)| *page == page_number)
                .map(|(_, release)| release.clone());
            if let Some(release) = hold {
                release.notified().await;
            }
            let failure = self.failures.lock().unwrap().get(id.as_str()).copied();
            if failure == Some(page_number) {
                return Err(IngestError::Request("HTTP 500".to_string()));
            }

            Ok(Page::from_text(format!("{} page {}", id, page_number)))
        }
    }

    fn id(s: &str) -> DocumentId {
        DocumentId::parse(s).unwrap()
    }

    async fn pipeline() -> (Arc<IngestPipeline>, Arc<ScriptedExtractor>) {
        let library = Arc::new(Library::open(Arc::new(MemoryStorage::new())).await.unwrap());
        let extractor = Arc::new(ScriptedExtractor::default());
        let pipeline = Arc::new(IngestPipeline::new(
            library,
            extractor.clone(),
            PipelineConfig::default(),
        ));
        (pipeline, extractor)
    }

    async fn queue(pipeline: &IngestPipeline, doc: &str, pages: u32) {
        pipeline
            .library()
            .upsert(DocumentRecord::processing(id(doc), doc, pages))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_all_pages_commit_ready() {
        let (pipeline, extractor) = pipeline().await;
        queue(&pipeline, "a.pdf", 3).await;

        let outcome = pipeline.scan_once().await.unwrap();
        assert_eq!(outcome, ScanOutcome::Ready(id("a.pdf")));

        let pages = pipeline.library().get_pages(&id("a.pdf")).await.unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2].text, "a.pdf page 3");
        assert_eq!(
            extractor.calls(),
            vec![
                ("a.pdf".to_string(), 1),
                ("a.pdf".to_string(), 2),
                ("a.pdf".to_string(), 3)
            ]
        );
        assert!(!pipeline.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_on_last_page_fails_then_retry_restarts() {
        let (pipeline, extractor) = pipeline().await;
        queue(&pipeline, "a.pdf", 3).await;
        extractor.stall("a.pdf", 3);

        let outcome = pipeline.scan_once().await.unwrap();
        assert_eq!(outcome, ScanOutcome::Failed(id("a.pdf")));

        let doc = pipeline.library().get(&id("a.pdf")).await.unwrap();
        assert_eq!(doc.status, DocumentStatus::Failed);
        assert_eq!(doc.total_pages, 3);
        assert!(pipeline.library().get_pages(&id("a.pdf")).await.is_none());
        assert!(!pipeline
            .library()
            .storage()
            .exists("pages/a.pdf.json")
            .await
            .unwrap());

        extractor.clear();
        pipeline.retry(&id("a.pdf")).await.unwrap();
        assert_eq!(
            pipeline.scan_once().await.unwrap(),
            ScanOutcome::Ready(id("a.pdf"))
        );
        assert_eq!(extractor.calls()[3], ("a.pdf".to_string(), 1));
    }

    #[tokio::test]
    async fn test_page_error_fails_document() {
        let (pipeline, extractor) = pipeline().await;
        queue(&pipeline, "a.pdf", 4).await;
        extractor.fail("a.pdf", 2);

        assert_eq!(
            pipeline.scan_once().await.unwrap(),
            ScanOutcome::Failed(id("a.pdf"))
        );
        assert_eq!(extractor.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_pages_fails_without_fetching() {
        let (pipeline, extractor) = pipeline().await;
        queue(&pipeline, "a.pdf", 0).await;
        let mut events = pipeline.subscribe();

        assert_eq!(
            pipeline.scan_once().await.unwrap(),
            ScanOutcome::Failed(id("a.pdf"))
        );
        assert!(extractor.calls().is_empty());

        assert!(matches!(events.recv().await.unwrap(), IngestEvent::Started { .. }));
        match events.recv().await.unwrap() {
            IngestEvent::Failed { error, .. } => assert_eq!(error, "Document has no pages"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    async fn removed_while_fetching(fail_held_page: bool) {
        let (pipeline, extractor) = pipeline().await;
        queue(&pipeline, "a.pdf", 2).await;
        let release = extractor.hold("a.pdf", 2);
        if fail_held_page {
            extractor.fail("a.pdf", 2);
        }

        let scan = tokio::spawn({
            let pipeline = pipeline.clone();
            async move { pipeline.scan_once().await }
        });
        while extractor.calls().len() < 2 {
            tokio::task::yield_now().await;
        }

        pipeline.library().remove(&id("a.pdf")).await.unwrap();
        release.notify_one();

        assert_eq!(
            scan.await.unwrap().unwrap(),
            ScanOutcome::Removed(id("a.pdf"))
        );
        assert!(pipeline.library().get(&id("a.pdf")).await.is_none());
        assert!(!pipeline
            .library()
            .storage()
            .exists("pages/a.pdf.json")
            .await
            .unwrap());
        assert!(!pipeline.is_active());
        assert_eq!(pipeline.scan_once().await.unwrap(), ScanOutcome::Idle);
    }

    #[tokio::test]
    async fn test_removal_during_fetch_is_not_undone_by_ready() {
        removed_while_fetching(false).await;
    }

    #[tokio::test]
    async fn test_removal_during_fetch_is_not_undone_by_failure() {
        removed_while_fetching(true).await;
    }

    #[tokio::test]
    async fn test_retry_requires_failed_status() {
        let (pipeline, _) = pipeline().await;
        queue(&pipeline, "a.pdf", 1).await;

        let err = pipeline.retry(&id("a.pdf")).await.unwrap_err();
        assert!(matches!(
            err,
            HearLearnError::Ingest(IngestError::NotRetryable {
                status: DocumentStatus::Processing,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_documents_never_interleave() {
        let (pipeline, extractor) = pipeline().await;
        queue(&pipeline, "a.pdf", 3).await;
        queue(&pipeline, "b.pdf", 3).await;

        let (first, second) = tokio::join!(pipeline.scan_once(), pipeline.scan_once());
        assert_eq!(first.unwrap(), ScanOutcome::Ready(id("a.pdf")));
        assert_eq!(second.unwrap(), ScanOutcome::Busy);

        assert_eq!(
            pipeline.scan_once().await.unwrap(),
            ScanOutcome::Ready(id("b.pdf"))
        );
        assert_eq!(pipeline.scan_once().await.unwrap(), ScanOutcome::Idle);

        let order: Vec<String> = extractor.calls().into_iter().map(|(doc, _)| doc).collect();
        assert_eq!(order, vec!["a.pdf", "a.pdf", "a.pdf", "b.pdf", "b.pdf", "b.pdf"]);
    }

    #[tokio::test]
    async fn test_submit_decodes_name_and_keeps_binary() {
        let (pipeline, _) = pipeline().await;
        let doc = pipeline
            .submit("Relatório final.pdf", b"%PDF-1.7".to_vec())
            .await
            .unwrap();

        assert_eq!(doc.original_name, "Relatório final.pdf");
        assert_eq!(doc.status, DocumentStatus::Processing);
        assert_eq!(doc.local_resource.as_deref(), Some("files/3f2a.pdf"));

        let stored = pipeline
            .library()
            .storage()
            .read("files/3f2a.pdf")
            .await
            .unwrap();
        assert_eq!(stored, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn test_worker_picks_up_new_documents() {
        let (pipeline, _) = pipeline().await;
        let mut events = pipeline.subscribe();
        let shutdown = CancellationToken::new();
        let worker = pipeline.spawn(shutdown.clone());

        queue(&pipeline, "late.pdf", 1).await;

        let ready = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let IngestEvent::Ready { id } = events.recv().await.unwrap() {
                    return id;
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(ready, id("late.pdf"));

        shutdown.cancel();
        worker.await.unwrap();
    }
}
