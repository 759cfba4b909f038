//! Core types for documents, pages and page geometry

mod document;
mod geometry;
mod page;

pub use document::{Document, DocumentId, DocumentRecord, DocumentStatus};
pub use geometry::{Point, Rect, Size};
pub use page::{Page, Word};
