//! Listen-and-follow playback
//!
//! [`PlaybackEngine`] reads a ready document page by page through a
//! [`SpeechEngine`], tracks which word is being spoken from boundary
//! events, advances pages on completion and accumulates listening time.

mod engine;
mod speech;

pub use engine::{word_index_at, Highlight, PlaybackEngine, PlaybackUpdate};
pub use speech::{SpeechEngine, SpeechEvent, SpeechEventKind, SpeechEvents, Utterance};

/// Speech parameters used by an engine
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Speaking rate multiplier, 1.0 is normal speed
    pub rate: f32,
    pub voice_id: Option<String>,
    pub language: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            rate: 1.0,
            voice_id: None,
            language: "pt-BR".to_string(),
        }
    }
}
