//! The Document type - one catalog entry in the library

use super::Page;
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier issued by the extraction service (e.g. `<uuid>.pdf`)
///
/// Ids double as storage file names, so only ASCII alphanumerics, `-`, `_`
/// and non-leading `.` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    pub fn parse(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && !id.contains("..")
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(Self(id))
        } else {
            Err(ValidationError::InvalidId(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

/// Ingestion state of a document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Ready,
    Failed,
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A catalog entry: ingestion metadata plus engagement state
///
/// Page content is never part of this type; it lives in a separate
/// resource and is loaded through [`crate::library::Library::get_pages`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: DocumentId,

    /// Display name as uploaded
    pub original_name: String,

    pub total_pages: u32,

    pub status: DocumentStatus,

    /// Storage key of the uploaded binary, if kept locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_resource: Option<String>,

    /// Page index where the reader last stopped
    #[serde(default)]
    pub last_position: u32,

    #[serde(default)]
    pub listening_time_seconds: u64,

    #[serde(default)]
    pub completed: bool,

    #[serde(default)]
    pub bookmarks: BTreeSet<u32>,

    #[serde(default)]
    pub annotations: BTreeMap<u32, String>,

    pub added_at: DateTime<Utc>,
}

impl Document {
    /// Build a fresh catalog entry with default engagement fields
    pub fn from_record(record: &DocumentRecord) -> Self {
        Self {
            id: record.id.clone(),
            original_name: record.original_name.clone(),
            total_pages: record.total_pages,
            status: record.status,
            local_resource: record.local_resource.clone(),
            last_position: 0,
            listening_time_seconds: 0,
            completed: false,
            bookmarks: BTreeSet::new(),
            annotations: BTreeMap::new(),
            added_at: Utc::now(),
        }
    }

    /// Overlay ingestion-owned fields, keeping engagement state
    pub fn apply_record(&mut self, record: &DocumentRecord) {
        self.original_name = record.original_name.clone();
        self.total_pages = record.total_pages;
        self.status = record.status;
        self.local_resource = record.local_resource.clone();
    }

    pub fn is_ready(&self) -> bool {
        self.status == DocumentStatus::Ready
    }

    /// Index of the last page, `None` for an empty document
    pub fn final_page(&self) -> Option<u32> {
        self.total_pages.checked_sub(1)
    }

    pub fn check_page(&self, page: u32) -> Result<(), ValidationError> {
        if page < self.total_pages {
            Ok(())
        } else {
            Err(ValidationError::PageOutOfRange {
                page,
                total: self.total_pages,
            })
        }
    }

    pub fn has_bookmark(&self, page: u32) -> bool {
        self.bookmarks.contains(&page)
    }

    pub fn annotation(&self, page: u32) -> Option<&str> {
        self.annotations.get(&page).map(String::as_str)
    }
}

/// The ingestion-owned part of a document, as written by the pipeline
///
/// `pages` is present only together with `status = Ready`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub original_name: String,
    pub total_pages: u32,
    pub status: DocumentStatus,
    pub local_resource: Option<String>,
    pub pages: Option<Vec<Page>>,
}

impl DocumentRecord {
    /// A freshly submitted document awaiting its pages
    pub fn processing(id: DocumentId, original_name: impl Into<String>, total_pages: u32) -> Self {
        Self {
            id,
            original_name: original_name.into(),
            total_pages,
            status: DocumentStatus::Processing,
            local_resource: None,
            pages: None,
        }
    }

    pub fn with_local_resource(mut self, key: impl Into<String>) -> Self {
        self.local_resource = Some(key.into());
        self
    }

    /// Same metadata, every page assembled
    pub fn into_ready(mut self, pages: Vec<Page>) -> Self {
        self.status = DocumentStatus::Ready;
        self.pages = Some(pages);
        self
    }

    /// Same metadata, no pages
    pub fn into_failed(mut self) -> Self {
        self.status = DocumentStatus::Failed;
        self.pages = None;
        self
    }

    /// Same metadata, back in the queue
    pub fn into_processing(mut self) -> Self {
        self.status = DocumentStatus::Processing;
        self.pages = None;
        self
    }
}

impl From<&Document> for DocumentRecord {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            original_name: doc.original_name.clone(),
            total_pages: doc.total_pages,
            status: doc.status,
            local_resource: doc.local_resource.clone(),
            pages: None,
        }
    }
}
