//! HearLearn Core Library
//!
//! This crate turns paged documents into a listen-and-follow experience.
//! Documents are ingested page by page from an extraction service into a
//! persistent library, then read aloud by a playback engine that tracks the
//! spoken word and maps it onto the page for highlighting.

pub mod config;
pub mod error;
pub mod ingest;
pub mod library;
pub mod playback;
pub mod settings;
pub mod storage;
pub mod transform;
pub mod types;

pub use config::Config;
pub use error::{
    HearLearnError, IngestError, Result, SpeechError, StorageError, ValidationError,
};
pub use ingest::{Extractor, HttpExtractor, IngestEvent, IngestPipeline, PipelineConfig};
pub use library::{format_duration, Library, LibraryStats};
pub use playback::{PlaybackConfig, PlaybackEngine, SpeechEngine};
pub use settings::{Settings, SettingsStore, Theme};
pub use storage::{LocalStorage, MemoryStorage, StorageProvider};
pub use transform::{FitTransform, Magnifier};
pub use types::{Document, DocumentId, DocumentRecord, DocumentStatus, Page, Point, Rect, Size, Word};
