//! The speech collaborator and the events it reports

use crate::error::SpeechError;
use tokio::sync::mpsc;

/// One request to speak a text segment
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub voice_id: Option<String>,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpeechEventKind {
    /// About to speak the word starting at this char offset into the segment
    Boundary { char_index: usize },
    Done,
    Error(SpeechError),
}

/// A speech notification tagged with the session that requested it
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechEvent {
    pub session: u64,
    pub kind: SpeechEventKind,
}

/// Sender handed to the speech engine with each utterance
///
/// Every event it sends carries the session of that utterance, so the
/// playback engine can drop events from utterances it already stopped.
#[derive(Debug, Clone)]
pub struct SpeechEvents {
    session: u64,
    tx: mpsc::UnboundedSender<SpeechEvent>,
}

impl SpeechEvents {
    pub(crate) fn new(session: u64, tx: mpsc::UnboundedSender<SpeechEvent>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn boundary(&self, char_index: usize) {
        self.send(SpeechEventKind::Boundary { char_index });
    }

    pub fn done(&self) {
        self.send(SpeechEventKind::Done);
    }

    pub fn error(&self, error: SpeechError) {
        self.send(SpeechEventKind::Error(error));
    }

    fn send(&self, kind: SpeechEventKind) {
        // The playback engine may already be gone
        let _ = self.tx.send(SpeechEvent {
            session: self.session,
            kind,
        });
    }
}

/// Text-to-speech backend
pub trait SpeechEngine: Send {
    /// Start speaking; progress is reported through `events`
    fn speak(&mut self, utterance: Utterance, events: SpeechEvents) -> Result<(), SpeechError>;

    /// Halt the current utterance; a no-op when idle
    fn stop(&mut self);
}
