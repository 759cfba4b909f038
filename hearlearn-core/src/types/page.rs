//! Per-page content produced by the extraction service

use super::{Rect, Size};
use serde::{Deserialize, Serialize};

/// One positioned word on a page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Word {
    pub text: String,

    /// Bounding box in source (page) coordinates
    pub bounds: Rect,
}

impl Word {
    pub fn new(text: impl Into<String>, bounds: Rect) -> Self {
        Self {
            text: text.into(),
            bounds,
        }
    }
}

/// The content of a single page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Page {
    /// Full text as read aloud
    pub text: String,

    /// Positioned words, empty for recognized pages
    pub words: Vec<Word>,

    /// Source page dimensions
    pub dimensions: Size,

    /// Text came from character recognition rather than the embedded text layer
    pub recognized: bool,
}

impl Page {
    /// Create a text-only page
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Whitespace-delimited words in reading order
    pub fn spoken_words(&self) -> Vec<&str> {
        self.text.split_whitespace().collect()
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// Whether word boxes can be overlaid on a rendering of the source page
    pub fn has_geometry(&self) -> bool {
        !self.recognized && !self.dimensions.is_empty()
    }

    /// Positioned word at `index`, if the page carries one
    pub fn word(&self, index: usize) -> Option<&Word> {
        self.words.get(index)
    }
}
