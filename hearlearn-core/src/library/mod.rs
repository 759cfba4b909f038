//! Library store: the document catalog plus per-document page content
//!
//! The catalog is one blob (`library.json`) holding metadata only. Page
//! content for a ready document is written wholesale to `pages/<id>.json`,
//! and an uploaded binary, if kept, sits under `files/<id>`.
//!
//! Every catalog mutation goes through [`Library::transact`]: the catalog is
//! cloned, changed, written in full, and only then swapped into memory. A
//! failed write leaves both copies as they were.

mod marks;
mod stats;

pub use stats::{format_duration, LibraryStats};

use crate::error::{HearLearnError, Result, StorageError, ValidationError};
use crate::storage::StorageProvider;
use crate::types::{Document, DocumentId, DocumentRecord, DocumentStatus, Page};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};

/// Storage key of the catalog blob
pub const CATALOG_KEY: &str = "library.json";

/// Directory holding page content records
pub const PAGES_DIR: &str = "pages";

/// Directory holding uploaded binaries
pub const FILES_DIR: &str = "files";

/// Storage key of a document's page content
pub fn pages_key(id: &DocumentId) -> String {
    format!("{}/{}.json", PAGES_DIR, id)
}

/// Storage key for a document's uploaded binary
pub fn binary_key(id: &DocumentId) -> String {
    format!("{}/{}", FILES_DIR, id)
}

/// The persisted catalog, in insertion order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    pub documents: Vec<Document>,
}

impl Catalog {
    pub fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.iter().find(|d| &d.id == id)
    }

    pub fn get_mut(&mut self, id: &DocumentId) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| &d.id == id)
    }

    /// Mutable entry or `DocumentNotFound`
    pub fn require_mut(&mut self, id: &DocumentId) -> Result<&mut Document> {
        self.get_mut(id)
            .ok_or_else(|| ValidationError::DocumentNotFound(id.clone()).into())
    }

    pub fn remove(&mut self, id: &DocumentId) -> Option<Document> {
        let index = self.documents.iter().position(|d| &d.id == id)?;
        Some(self.documents.remove(index))
    }

    /// First document waiting for ingestion
    pub fn next_processing(&self) -> Option<&Document> {
        self.documents
            .iter()
            .find(|d| d.status == DocumentStatus::Processing)
    }
}

/// The library store
pub struct Library {
    storage: Arc<dyn StorageProvider>,
    catalog: RwLock<Catalog>,
    changes: Notify,
}

impl Library {
    /// Load the catalog from storage; a missing catalog is an empty library
    pub async fn open(storage: Arc<dyn StorageProvider>) -> Result<Self> {
        storage.create_dir(PAGES_DIR).await?;
        storage.create_dir(FILES_DIR).await?;

        let catalog = match storage.read(CATALOG_KEY).await {
            Ok(data) => serde_json::from_slice(&data).map_err(|e| {
                tracing::error!(error = %e, "Catalog is unreadable");
                StorageError::Corrupt {
                    path: CATALOG_KEY.to_string(),
                    reason: e.to_string(),
                }
            })?,
            Err(e) if e.is_not_found() => Catalog::default(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to load catalog");
                return Err(e.into());
            }
        };

        tracing::debug!(documents = catalog.documents.len(), "Library opened");

        Ok(Self {
            storage,
            catalog: RwLock::new(catalog),
            changes: Notify::new(),
        })
    }

    pub fn storage(&self) -> &Arc<dyn StorageProvider> {
        &self.storage
    }

    /// All document metadata, without page content
    pub async fn list(&self) -> Vec<Document> {
        self.catalog.read().await.documents.clone()
    }

    pub async fn get(&self, id: &DocumentId) -> Option<Document> {
        self.catalog.read().await.get(id).cloned()
    }

    /// Document metadata or `DocumentNotFound`
    pub async fn require(&self, id: &DocumentId) -> Result<Document> {
        self.get(id)
            .await
            .ok_or_else(|| ValidationError::DocumentNotFound(id.clone()).into())
    }

    /// First document in `processing` status, if any
    pub async fn next_processing(&self) -> Option<Document> {
        self.catalog.read().await.next_processing().cloned()
    }

    /// Resolves after the next successful catalog change
    ///
    /// A change made while nobody is waiting is remembered for the next call.
    pub async fn changed(&self) {
        self.changes.notified().await
    }

    /// Page content of a ready document
    ///
    /// Absent ids, documents that are not ready and unreadable page records
    /// all yield `None`.
    pub async fn get_pages(&self, id: &DocumentId) -> Option<Vec<Page>> {
        let doc = self.get(id).await?;
        if !doc.is_ready() {
            return None;
        }

        let data = match self.storage.read(&pages_key(id)).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(doc_id = %id, error = %e, "Failed to read page content");
                return None;
            }
        };

        match serde_json::from_slice::<Vec<Page>>(&data) {
            Ok(pages) if pages.len() == doc.total_pages as usize => Some(pages),
            Ok(pages) => {
                tracing::warn!(
                    doc_id = %id,
                    expected = doc.total_pages,
                    actual = pages.len(),
                    "Page content does not match page count"
                );
                None
            }
            Err(e) => {
                tracing::warn!(doc_id = %id, error = %e, "Page content is unreadable");
                None
            }
        }
    }

    /// Apply `f` to a copy of the catalog and commit it as a whole
    pub async fn transact<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Catalog) -> Result<T>,
    {
        let mut guard = self.catalog.write().await;
        let mut next = guard.clone();
        let output = f(&mut next)?;

        let data = serde_json::to_vec_pretty(&next).map_err(|e| StorageError::Corrupt {
            path: CATALOG_KEY.to_string(),
            reason: e.to_string(),
        })?;
        if let Err(e) = self.storage.write(CATALOG_KEY, data).await {
            tracing::error!(error = %e, "Failed to save catalog");
            return Err(e.into());
        }

        *guard = next;
        drop(guard);
        self.changes.notify_one();
        Ok(output)
    }

    /// Insert or update a document from the ingestion side
    ///
    /// Page content is written to its own record before the catalog entry
    /// changes; a ready record must carry exactly `total_pages` pages.
    pub async fn upsert(&self, record: DocumentRecord) -> Result<Document> {
        self.write_record(record, true).await
    }

    /// Write an ingestion outcome onto an entry that still exists
    ///
    /// Fails with `DocumentNotFound` if the entry was removed meanwhile, and
    /// deletes any page record written for it.
    pub async fn commit(&self, record: DocumentRecord) -> Result<Document> {
        self.write_record(record, false).await
    }

    async fn write_record(&self, record: DocumentRecord, insert: bool) -> Result<Document> {
        let DocumentRecord { pages, .. } = &record;

        match (record.status, pages) {
            (DocumentStatus::Ready, Some(pages)) if pages.len() == record.total_pages as usize => {
                let data = serde_json::to_vec(pages).map_err(|e| StorageError::Corrupt {
                    path: pages_key(&record.id),
                    reason: e.to_string(),
                })?;
                if let Err(e) = self.storage.write(&pages_key(&record.id), data).await {
                    tracing::error!(doc_id = %record.id, error = %e, "Failed to save page content");
                    return Err(e.into());
                }
            }
            (DocumentStatus::Ready, pages) => {
                return Err(ValidationError::IncompletePages {
                    id: record.id.clone(),
                    expected: record.total_pages,
                    actual: pages.as_ref().map_or(0, Vec::len),
                }
                .into());
            }
            _ => {}
        }

        let committed = self
            .transact(|catalog| {
                let doc = match catalog.get_mut(&record.id) {
                    Some(existing) => {
                        existing.apply_record(&record);
                        existing.clone()
                    }
                    None if insert => {
                        let doc = Document::from_record(&record);
                        catalog.documents.push(doc.clone());
                        doc
                    }
                    None => {
                        return Err(ValidationError::DocumentNotFound(record.id.clone()).into())
                    }
                };
                Ok(doc)
            })
            .await;

        let doc = match committed {
            Ok(doc) => doc,
            Err(HearLearnError::Validation(ValidationError::DocumentNotFound(id))) => {
                self.delete_quietly(&pages_key(&id)).await;
                return Err(ValidationError::DocumentNotFound(id).into());
            }
            Err(e) => return Err(e),
        };

        if !doc.is_ready() {
            self.delete_quietly(&pages_key(&doc.id)).await;
        }

        tracing::debug!(doc_id = %doc.id, status = %doc.status, "Document upserted");
        Ok(doc)
    }

    /// Remove a document, its page content and its binary
    ///
    /// Removing an unknown id succeeds.
    pub async fn remove(&self, id: &DocumentId) -> Result<()> {
        let exists = self.catalog.read().await.get(id).is_some();
        let removed = if exists {
            self.transact(|catalog| Ok(catalog.remove(id))).await?
        } else {
            None
        };

        self.delete_quietly(&pages_key(id)).await;
        if let Some(key) = removed.as_ref().and_then(|d| d.local_resource.as_deref()) {
            self.delete_quietly(key).await;
        }

        if removed.is_some() {
            tracing::info!(doc_id = %id, "Document removed");
        }
        Ok(())
    }

    /// Commit the outcome of a listening session
    ///
    /// Sets the last position, adds the listened seconds, and latches
    /// `completed` once the final page is reached.
    pub async fn record_session(
        &self,
        id: &DocumentId,
        page_index: u32,
        seconds: u64,
    ) -> Result<Document> {
        self.transact(|catalog| {
            let doc = catalog.require_mut(id)?;
            doc.check_page(page_index)?;
            doc.last_position = page_index;
            doc.listening_time_seconds += seconds;
            if doc.final_page().is_some_and(|last| page_index >= last) {
                doc.completed = true;
            }
            Ok(doc.clone())
        })
        .await
    }

    async fn delete_quietly(&self, key: &str) {
        match self.storage.delete(key).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => tracing::warn!(key, error = %e, "Failed to delete resource"),
        }
    }
}
