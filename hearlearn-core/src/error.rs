//! Error types for HearLearn Core

use crate::types::{DocumentId, DocumentStatus};
use thiserror::Error;

/// Result type alias using HearLearnError
pub type Result<T> = std::result::Result<T, HearLearnError>;

/// Top-level error type for all HearLearn operations
#[derive(Debug, Error)]
pub enum HearLearnError {
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Speech error: {0}")]
    Speech(#[from] SpeechError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while assembling a document from the extraction service
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Page {page} timed out after {seconds}s")]
    Timeout { page: u32, seconds: u64 },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid page {page}: {reason}")]
    InvalidPage { page: u32, reason: String },

    #[error("Document has no pages")]
    EmptyDocument,

    #[error("Document {id} cannot be retried while {status}")]
    NotRetryable { id: DocumentId, status: DocumentStatus },
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        IngestError::Request(err.to_string())
    }
}

/// Errors that occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Backend error: {0}")]
    BackendError(String),

    #[error("Corrupt record at {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

/// Errors reported by the speech collaborator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpeechError {
    #[error("Speech engine failed: {0}")]
    Engine(String),

    #[error("Speech engine unavailable")]
    Unavailable,
}

/// Rejected requests: unknown documents, wrong state, out-of-range pages
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("Document {id} is {status}, not ready")]
    NotReady { id: DocumentId, status: DocumentStatus },

    #[error("Page content for {0} could not be loaded")]
    PagesUnavailable(DocumentId),

    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: u32, total: u32 },

    #[error("Ready document {id} carries {actual} of {expected} pages")]
    IncompletePages { id: DocumentId, expected: u32, actual: usize },

    #[error("Page {0} has no text to read")]
    EmptyPage(u32),

    #[error("Invalid document id: {0}")]
    InvalidId(String),
}
