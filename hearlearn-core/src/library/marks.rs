//! Bookmarks and per-page annotations

use super::Library;
use crate::error::Result;
use crate::types::{Document, DocumentId};

impl Library {
    /// Bookmark a page; bookmarking it again changes nothing
    pub async fn add_bookmark(&self, id: &DocumentId, page: u32) -> Result<Document> {
        self.transact(|catalog| {
            let doc = catalog.require_mut(id)?;
            doc.check_page(page)?;
            doc.bookmarks.insert(page);
            Ok(doc.clone())
        })
        .await
    }

    pub async fn remove_bookmark(&self, id: &DocumentId, page: u32) -> Result<Document> {
        self.transact(|catalog| {
            let doc = catalog.require_mut(id)?;
            doc.bookmarks.remove(&page);
            Ok(doc.clone())
        })
        .await
    }

    /// Flip the bookmark on a page, returning whether it is now set
    pub async fn toggle_bookmark(&self, id: &DocumentId, page: u32) -> Result<bool> {
        self.transact(|catalog| {
            let doc = catalog.require_mut(id)?;
            doc.check_page(page)?;
            if doc.bookmarks.remove(&page) {
                Ok(false)
            } else {
                doc.bookmarks.insert(page);
                Ok(true)
            }
        })
        .await
    }

    /// Store the note for a page; blank text removes it
    pub async fn set_annotation(
        &self,
        id: &DocumentId,
        page: u32,
        text: impl Into<String>,
    ) -> Result<Document> {
        let text = text.into();
        self.transact(|catalog| {
            let doc = catalog.require_mut(id)?;
            doc.check_page(page)?;
            if text.trim().is_empty() {
                doc.annotations.remove(&page);
            } else {
                doc.annotations.insert(page, text);
            }
            Ok(doc.clone())
        })
        .await
    }

    pub async fn remove_annotation(&self, id: &DocumentId, page: u32) -> Result<Document> {
        self.transact(|catalog| {
            let doc = catalog.require_mut(id)?;
            doc.annotations.remove(&page);
            Ok(doc.clone())
        })
        .await
    }
}
