//! Playback state machine

use super::speech::{SpeechEngine, SpeechEvent, SpeechEventKind, SpeechEvents, Utterance};
use super::PlaybackConfig;
use crate::error::{Result, SpeechError, ValidationError};
use crate::library::Library;
use crate::transform::FitTransform;
use crate::types::{Document, DocumentId, Page, Rect, Size};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);

/// Number of whitespace runs in the first `char_index` chars of `segment`
///
/// Added to the segment's starting word this gives the word being spoken.
pub fn word_index_at(segment: &str, char_index: usize) -> usize {
    let mut runs = 0;
    let mut in_space = false;
    for c in segment.chars().take(char_index) {
        if c.is_whitespace() {
            if !in_space {
                runs += 1;
            }
            in_space = true;
        } else {
            in_space = false;
        }
    }
    runs
}

/// What changed after an event or tick
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackUpdate {
    /// Not playing and nothing queued
    Idle,
    /// Event from a stopped session
    Ignored,
    Word { page: u32, word_index: usize },
    /// Moved to the next page after finishing one
    PageAdvanced { page: u32 },
    /// The last page finished
    Finished,
    /// The speech engine failed; playback stopped where it was
    Failed(SpeechError),
    Tick { elapsed_seconds: u64 },
}

/// How to show the current word
#[derive(Debug, Clone, PartialEq)]
pub enum Highlight {
    None,
    /// Box over the rendered page, in view space
    Overlay { word_index: usize, rect: Rect },
    /// Highlight within the plain text rendering
    Text { word_index: Option<usize> },
}

/// The segment handed to the speech engine in the current session
struct Segment {
    text: String,
    from_word: usize,
}

pub struct PlaybackEngine {
    library: Arc<Library>,
    speech: Box<dyn SpeechEngine>,
    config: PlaybackConfig,
    document: Document,
    pages: Vec<Page>,
    current_page: u32,
    playing: bool,
    word_index: Option<usize>,
    segment: Option<Segment>,
    session: u64,
    elapsed_seconds: u64,
    events_tx: mpsc::UnboundedSender<SpeechEvent>,
    events_rx: mpsc::UnboundedReceiver<SpeechEvent>,
    ticker: Option<Interval>,
}

impl PlaybackEngine {
    /// Load a ready document and position at its last page
    pub async fn open(
        library: Arc<Library>,
        speech: Box<dyn SpeechEngine>,
        config: PlaybackConfig,
        id: &DocumentId,
    ) -> Result<Self> {
        let document = library.require(id).await?;
        if !document.is_ready() {
            return Err(ValidationError::NotReady {
                id: id.clone(),
                status: document.status,
            }
            .into());
        }

        let pages = match library.get_pages(id).await {
            Some(pages) if !pages.is_empty() => pages,
            _ => return Err(ValidationError::PagesUnavailable(id.clone()).into()),
        };

        let last = pages.len() as u32 - 1;
        let current_page = document.last_position.min(last);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        tracing::debug!(doc_id = %id, page = current_page, "Playback opened");

        Ok(Self {
            library,
            speech,
            config,
            document,
            pages,
            current_page,
            playing: false,
            word_index: None,
            segment: None,
            session: 0,
            elapsed_seconds: 0,
            events_tx,
            events_rx,
            ticker: None,
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page(&self) -> &Page {
        &self.pages[self.current_page as usize]
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn word_index(&self) -> Option<usize> {
        self.word_index
    }

    pub fn rate(&self) -> f32 {
        self.config.rate
    }

    pub fn voice_id(&self) -> Option<&str> {
        self.config.voice_id.as_deref()
    }

    /// Seconds listened since the engine was opened
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    /// Speak the current page starting at `from_word`
    pub fn play(&mut self, from_word: usize) -> Result<()> {
        let page = &self.pages[self.current_page as usize];
        if !page.has_text() {
            return Err(ValidationError::EmptyPage(self.current_page).into());
        }

        let words = page.spoken_words();
        let from_word = from_word.min(words.len() - 1);
        let text = words[from_word..].join(" ");

        self.halt_speech();
        self.session += 1;
        let utterance = Utterance {
            text: text.clone(),
            rate: self.config.rate,
            voice_id: self.config.voice_id.clone(),
            language: self.config.language.clone(),
        };
        let events = SpeechEvents::new(self.session, self.events_tx.clone());

        if let Err(e) = self.speech.speak(utterance, events) {
            tracing::warn!(doc_id = %self.document.id, error = %e, "Speech engine refused to speak");
            self.playing = false;
            self.ticker = None;
            return Err(e.into());
        }

        self.segment = Some(Segment { text, from_word });
        self.word_index = Some(from_word);
        self.playing = true;
        if self.ticker.is_none() {
            let mut ticker = time::interval_at(Instant::now() + TICK, TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.ticker = Some(ticker);
        }

        tracing::debug!(
            doc_id = %self.document.id,
            page = self.current_page,
            session = self.session,
            from_word,
            "Playback started"
        );
        Ok(())
    }

    /// Halt speech and the listening timer, keeping the word position
    pub fn stop(&mut self) {
        self.halt_speech();
        self.playing = false;
        self.ticker = None;
    }

    /// Pause if playing, otherwise resume from the current word
    pub fn toggle_play(&mut self) -> Result<bool> {
        if self.playing {
            self.stop();
        } else {
            self.play(self.word_index.unwrap_or(0))?;
        }
        Ok(self.playing)
    }

    /// Change speed, restarting the utterance at the same word
    pub fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.config.rate = rate;
        if self.playing {
            let from = self.word_index.unwrap_or(0);
            self.halt_speech();
            self.play(from)?;
        }
        Ok(())
    }

    /// Go to the following page, paused; false on the last page
    pub fn next(&mut self) -> bool {
        self.stop();
        if self.current_page + 1 < self.total_pages() {
            self.move_to(self.current_page + 1);
            true
        } else {
            false
        }
    }

    /// Go to the preceding page, paused; false on the first page
    pub fn previous(&mut self) -> bool {
        self.stop();
        if self.current_page > 0 {
            self.move_to(self.current_page - 1);
            true
        } else {
            false
        }
    }

    pub fn jump_to(&mut self, page: u32) -> Result<()> {
        self.stop();
        self.document.check_page(page)?;
        self.move_to(page);
        Ok(())
    }

    /// Apply one speech event
    pub fn handle_event(&mut self, event: SpeechEvent) -> PlaybackUpdate {
        if !self.playing || event.session != self.session {
            tracing::trace!(session = event.session, current = self.session, "Stale speech event");
            return PlaybackUpdate::Ignored;
        }

        match event.kind {
            SpeechEventKind::Boundary { char_index } => {
                let Some(segment) = &self.segment else {
                    return PlaybackUpdate::Ignored;
                };
                let spoken = segment.from_word + word_index_at(&segment.text, char_index);
                let word_index = self.word_index.map_or(spoken, |current| current.max(spoken));
                self.word_index = Some(word_index);
                PlaybackUpdate::Word {
                    page: self.current_page,
                    word_index,
                }
            }
            SpeechEventKind::Done => self.finish_page(),
            SpeechEventKind::Error(e) => {
                tracing::warn!(doc_id = %self.document.id, page = self.current_page, error = %e, "Speech failed");
                self.stop();
                PlaybackUpdate::Failed(e)
            }
        }
    }

    /// Count one second of listening while playing
    pub fn tick(&mut self) -> u64 {
        if self.playing {
            self.elapsed_seconds += 1;
        }
        self.elapsed_seconds
    }

    /// Wait for the next speech event or timer tick and apply it
    pub async fn step(&mut self) -> PlaybackUpdate {
        if !self.playing {
            return match self.events_rx.try_recv() {
                Ok(event) => self.handle_event(event),
                Err(_) => PlaybackUpdate::Idle,
            };
        }

        tokio::select! {
            Some(event) = self.events_rx.recv() => self.handle_event(event),
            _ = next_tick(&mut self.ticker) => PlaybackUpdate::Tick {
                elapsed_seconds: self.tick(),
            },
        }
    }

    /// Overlay box or text highlight for the current word
    pub fn highlight(&self, viewport: Size) -> Highlight {
        let page = self.page();
        if !page.has_geometry() || self.document.local_resource.is_none() {
            return Highlight::Text {
                word_index: self.word_index,
            };
        }

        let overlay = self.word_index.and_then(|index| {
            let word = page.word(index)?;
            let transform = FitTransform::new(page.dimensions, viewport)?;
            Some(Highlight::Overlay {
                word_index: index,
                rect: transform.to_view(word.bounds),
            })
        });
        overlay.unwrap_or(Highlight::None)
    }

    /// Flip the bookmark on the current page
    pub async fn toggle_bookmark(&mut self) -> Result<bool> {
        let marked = self
            .library
            .toggle_bookmark(&self.document.id, self.current_page)
            .await?;
        self.document = self.library.require(&self.document.id).await?;
        Ok(marked)
    }

    /// Set or clear the note on the current page
    pub async fn annotate(&mut self, text: &str) -> Result<()> {
        self.document = self
            .library
            .set_annotation(&self.document.id, self.current_page, text)
            .await?;
        Ok(())
    }

    /// Stop and commit position and listening time
    pub async fn end_session(mut self) -> Result<Document> {
        self.stop();
        let seconds = std::mem::take(&mut self.elapsed_seconds);
        let document = self
            .library
            .record_session(&self.document.id, self.current_page, seconds)
            .await?;

        tracing::info!(
            doc_id = %document.id,
            page = self.current_page,
            seconds,
            "Listening session saved"
        );
        Ok(document)
    }

    fn total_pages(&self) -> u32 {
        self.pages.len() as u32
    }

    fn move_to(&mut self, page: u32) {
        self.current_page = page;
        self.word_index = None;
    }

    /// Natural end of the current utterance
    fn finish_page(&mut self) -> PlaybackUpdate {
        self.segment = None;
        if self.current_page + 1 >= self.total_pages() {
            self.stop();
            self.word_index = None;
            return PlaybackUpdate::Finished;
        }

        self.move_to(self.current_page + 1);
        if let Err(e) = self.play(0) {
            tracing::warn!(doc_id = %self.document.id, page = self.current_page, error = %e, "Auto-advance stopped");
            self.stop();
        }
        PlaybackUpdate::PageAdvanced {
            page: self.current_page,
        }
    }

    /// Stop the utterance and invalidate its session
    fn halt_speech(&mut self) {
        if self.segment.take().is_some() {
            self.speech.stop();
            self.session += 1;
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HearLearnError;
    use crate::storage::MemoryStorage;
    use crate::types::{DocumentRecord, Word};
    use proptest::prelude::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct SpeechLog {
        spoken: Vec<Utterance>,
        sinks: Vec<SpeechEvents>,
        stops: usize,
        refuse: bool,
    }

    #[derive(Clone, Default)]
    struct FakeSpeech(Arc<Mutex<SpeechLog>>);

    impl FakeSpeech {
        fn sink(&self) -> SpeechEvents {
            self.0.lock().unwrap().sinks.last().cloned().unwrap()
        }

        fn last(&self) -> Utterance {
            self.0.lock().unwrap().spoken.last().cloned().unwrap()
        }

        fn spoken(&self) -> usize {
            self.0.lock().unwrap().spoken.len()
        }
    }

    impl SpeechEngine for FakeSpeech {
        fn speak(&mut self, utterance: Utterance, events: SpeechEvents) -> std::result::Result<(), SpeechError> {
            let mut log = self.0.lock().unwrap();
            if log.refuse {
                return Err(SpeechError::Unavailable);
            }
            log.spoken.push(utterance);
            log.sinks.push(events);
            Ok(())
        }

        fn stop(&mut self) {
            self.0.lock().unwrap().stops += 1;
        }
    }

    const TEN_WORDS: &str = "um dois três quatro cinco seis sete oito nove dez";

    fn id() -> DocumentId {
        DocumentId::parse("doc.pdf").unwrap()
    }

    async fn library_with(pages: Vec<Page>, local: bool) -> Arc<Library> {
        let library = Arc::new(Library::open(Arc::new(MemoryStorage::new())).await.unwrap());
        let mut record = DocumentRecord::processing(id(), "Doc", pages.len() as u32);
        if local {
            record = record.with_local_resource("files/doc.pdf");
        }
        library.upsert(record.clone()).await.unwrap();
        library.upsert(record.into_ready(pages)).await.unwrap();
        library
    }

    async fn engine_for(texts: &[&str]) -> (PlaybackEngine, FakeSpeech, Arc<Library>) {
        let pages = texts.iter().map(|t| Page::from_text(*t)).collect();
        let library = library_with(pages, false).await;
        let speech = FakeSpeech::default();
        let engine = PlaybackEngine::open(
            library.clone(),
            Box::new(speech.clone()),
            PlaybackConfig::default(),
            &id(),
        )
        .await
        .unwrap();
        (engine, speech, library)
    }

    /// Char offset of the second letter of `word` within `text`
    fn inside(text: &str, word: &str) -> usize {
        let byte = text.find(word).unwrap();
        text[..byte].chars().count() + 1
    }

    #[test]
    fn test_word_index_counts_whitespace_runs() {
        assert_eq!(word_index_at("one two  three", 0), 0);
        assert_eq!(word_index_at("one two  three", 5), 1);
        assert_eq!(word_index_at("one two  three", 9), 2);
        assert_eq!(word_index_at("olá você aí", 9), 2);
        assert_eq!(word_index_at("short", 100), 0);
    }

    #[tokio::test]
    async fn test_boundary_inside_sixth_word() {
        let (mut engine, speech, _) = engine_for(&[TEN_WORDS]).await;
        engine.play(0).unwrap();
        assert_eq!(speech.last().text, TEN_WORDS);

        speech.sink().boundary(inside(TEN_WORDS, "seis"));
        assert_eq!(
            engine.step().await,
            PlaybackUpdate::Word {
                page: 0,
                word_index: 5
            }
        );
    }

    #[tokio::test]
    async fn test_play_from_word_offsets_boundaries() {
        let (mut engine, speech, _) = engine_for(&[TEN_WORDS]).await;
        engine.play(3).unwrap();
        let segment = speech.last().text;
        assert!(segment.starts_with("quatro cinco"));

        speech.sink().boundary(inside(&segment, "seis"));
        engine.step().await;
        assert_eq!(engine.word_index(), Some(5));
    }

    #[tokio::test]
    async fn test_rate_change_keeps_word() {
        let (mut engine, speech, _) = engine_for(&[TEN_WORDS]).await;
        engine.play(0).unwrap();
        speech.sink().boundary(inside(TEN_WORDS, "cinco"));
        engine.step().await;
        assert_eq!(engine.word_index(), Some(4));

        engine.set_rate(1.5).unwrap();
        let utterance = speech.last();
        assert_eq!(utterance.rate, 1.5);
        assert!(utterance.text.starts_with("cinco seis"));
        assert_eq!(engine.word_index(), Some(4));
        assert!(engine.is_playing());
    }

    #[tokio::test]
    async fn test_stale_events_are_ignored() {
        let (mut engine, speech, _) = engine_for(&[TEN_WORDS]).await;
        engine.play(0).unwrap();
        let old = speech.sink();
        engine.set_rate(2.0).unwrap();

        old.boundary(inside(TEN_WORDS, "dez"));
        assert_eq!(engine.step().await, PlaybackUpdate::Ignored);
        assert_eq!(engine.word_index(), Some(0));

        let current = speech.sink();
        engine.stop();
        engine.stop();
        current.done();
        assert_eq!(engine.step().await, PlaybackUpdate::Ignored);
        assert_eq!(engine.current_page(), 0);
    }

    #[tokio::test]
    async fn test_word_index_never_moves_back_within_a_session() {
        let (mut engine, speech, _) = engine_for(&[TEN_WORDS]).await;
        engine.play(0).unwrap();
        speech.sink().boundary(inside(TEN_WORDS, "oito"));
        engine.step().await;
        speech.sink().boundary(inside(TEN_WORDS, "dois"));
        engine.step().await;
        assert_eq!(engine.word_index(), Some(7));
    }

    #[tokio::test]
    async fn test_done_advances_then_finishes() {
        let (mut engine, speech, _) = engine_for(&["first page", "second page"]).await;
        engine.play(0).unwrap();

        speech.sink().done();
        assert_eq!(engine.step().await, PlaybackUpdate::PageAdvanced { page: 1 });
        assert!(engine.is_playing());
        assert_eq!(speech.last().text, "second page");

        speech.sink().done();
        assert_eq!(engine.step().await, PlaybackUpdate::Finished);
        assert!(!engine.is_playing());
        assert_eq!(engine.word_index(), None);
    }

    #[tokio::test]
    async fn test_auto_advance_stops_on_blank_page() {
        let (mut engine, speech, _) = engine_for(&["first page", "   ", "third"]).await;
        engine.play(0).unwrap();
        speech.sink().done();

        assert_eq!(engine.step().await, PlaybackUpdate::PageAdvanced { page: 1 });
        assert!(!engine.is_playing());
        assert_eq!(speech.spoken(), 1);
    }

    #[tokio::test]
    async fn test_navigation_stops_and_resets_word() {
        let (mut engine, speech, _) = engine_for(&[TEN_WORDS, "b", "c"]).await;
        engine.play(0).unwrap();
        speech.sink().boundary(inside(TEN_WORDS, "três"));
        engine.step().await;

        assert!(engine.next());
        assert!(!engine.is_playing());
        assert_eq!(engine.current_page(), 1);
        assert_eq!(engine.word_index(), None);

        assert!(engine.previous());
        assert!(!engine.previous());
        assert_eq!(engine.current_page(), 0);

        engine.jump_to(2).unwrap();
        assert!(!engine.next());
        assert!(engine.jump_to(3).is_err());
        assert_eq!(engine.current_page(), 2);

        assert!(engine.toggle_play().unwrap());
        assert_eq!(speech.last().text, "c");
    }

    #[tokio::test]
    async fn test_pause_resumes_from_word() {
        let (mut engine, speech, _) = engine_for(&[TEN_WORDS]).await;
        engine.toggle_play().unwrap();
        speech.sink().boundary(inside(TEN_WORDS, "sete"));
        engine.step().await;

        assert!(!engine.toggle_play().unwrap());
        assert_eq!(engine.word_index(), Some(6));
        assert!(engine.toggle_play().unwrap());
        assert!(speech.last().text.starts_with("sete"));
    }

    #[tokio::test]
    async fn test_speech_error_stops_in_place() {
        let (mut engine, speech, _) = engine_for(&[TEN_WORDS]).await;
        engine.play(2).unwrap();
        speech.sink().error(SpeechError::Engine("audio focus lost".to_string()));

        assert!(matches!(engine.step().await, PlaybackUpdate::Failed(_)));
        assert!(!engine.is_playing());
        assert_eq!(engine.word_index(), Some(2));
    }

    #[tokio::test]
    async fn test_refused_speech_is_an_error() {
        let (mut engine, speech, _) = engine_for(&[TEN_WORDS]).await;
        speech.0.lock().unwrap().refuse = true;
        let err = engine.play(0).unwrap_err();
        assert!(matches!(err, HearLearnError::Speech(SpeechError::Unavailable)));
        assert!(!engine.is_playing());
    }

    #[tokio::test]
    async fn test_blank_page_cannot_play() {
        let (mut engine, _, _) = engine_for(&[" \n "]).await;
        let err = engine.play(0).unwrap_err();
        assert!(matches!(
            err,
            HearLearnError::Validation(ValidationError::EmptyPage(0))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_accumulate_and_commit_once() {
        let (mut engine, _, library) = engine_for(&["a b", "c d", "e f"]).await;
        engine.jump_to(2).unwrap();
        engine.play(0).unwrap();

        for expected in 1..=3 {
            assert_eq!(
                engine.step().await,
                PlaybackUpdate::Tick {
                    elapsed_seconds: expected
                }
            );
        }
        engine.stop();
        assert_eq!(engine.step().await, PlaybackUpdate::Idle);
        assert_eq!(engine.tick(), 3);

        let doc = engine.end_session().await.unwrap();
        assert_eq!(doc.listening_time_seconds, 3);
        assert_eq!(doc.last_position, 2);
        assert!(doc.completed);

        let stored = library.get(&id()).await.unwrap();
        assert_eq!(stored.listening_time_seconds, 3);
    }

    #[tokio::test]
    async fn test_open_resumes_at_last_position() {
        let (engine, _, library) = engine_for(&["a", "b", "c"]).await;
        engine.end_session().await.unwrap();
        library.record_session(&id(), 1, 0).await.unwrap();

        let engine = PlaybackEngine::open(
            library,
            Box::new(FakeSpeech::default()),
            PlaybackConfig::default(),
            &id(),
        )
        .await
        .unwrap();
        assert_eq!(engine.current_page(), 1);
    }

    #[tokio::test]
    async fn test_open_requires_ready_document_with_pages() {
        let library = Arc::new(Library::open(Arc::new(MemoryStorage::new())).await.unwrap());
        library
            .upsert(DocumentRecord::processing(id(), "Doc", 2))
            .await
            .unwrap();

        let result = PlaybackEngine::open(
            library.clone(),
            Box::new(FakeSpeech::default()),
            PlaybackConfig::default(),
            &id(),
        )
        .await;
        assert!(matches!(
            result,
            Err(HearLearnError::Validation(ValidationError::NotReady { .. }))
        ));

        let record = DocumentRecord::processing(id(), "Doc", 1);
        library
            .upsert(record.into_ready(vec![Page::from_text("x")]))
            .await
            .unwrap();
        library.storage().delete("pages/doc.pdf.json").await.unwrap();

        let result = PlaybackEngine::open(
            library,
            Box::new(FakeSpeech::default()),
            PlaybackConfig::default(),
            &id(),
        )
        .await;
        assert!(matches!(
            result,
            Err(HearLearnError::Validation(ValidationError::PagesUnavailable(_)))
        ));
    }

    #[tokio::test]
    async fn test_highlight_modes() {
        let mut page = Page::from_text("Olá mundo");
        page.words = vec![
            Word::new("Olá", Rect::new(100.0, 100.0, 200.0, 120.0)),
            Word::new("mundo", Rect::new(210.0, 100.0, 300.0, 120.0)),
        ];
        page.dimensions = Size::new(612.0, 792.0);
        let viewport = Size::new(306.0, 500.0);

        let library = library_with(vec![page.clone()], true).await;
        let speech = FakeSpeech::default();
        let mut engine = PlaybackEngine::open(
            library,
            Box::new(speech.clone()),
            PlaybackConfig::default(),
            &id(),
        )
        .await
        .unwrap();
        assert_eq!(engine.highlight(viewport), Highlight::None);

        engine.play(0).unwrap();
        assert_eq!(
            engine.highlight(viewport),
            Highlight::Overlay {
                word_index: 0,
                rect: Rect::new(50.0, 102.0, 100.0, 112.0)
            }
        );

        let library = library_with(vec![page], false).await;
        let mut engine = PlaybackEngine::open(
            library,
            Box::new(FakeSpeech::default()),
            PlaybackConfig::default(),
            &id(),
        )
        .await
        .unwrap();
        engine.play(1).unwrap();
        assert_eq!(
            engine.highlight(viewport),
            Highlight::Text {
                word_index: Some(1)
            }
        );
    }

    #[tokio::test]
    async fn test_highlight_falls_back_to_text_without_dimensions() {
        let mut page = Page::from_text("Olá mundo");
        page.words = vec![Word::new("Olá", Rect::new(100.0, 100.0, 200.0, 120.0))];

        let library = library_with(vec![page], true).await;
        let mut engine = PlaybackEngine::open(
            library,
            Box::new(FakeSpeech::default()),
            PlaybackConfig::default(),
            &id(),
        )
        .await
        .unwrap();
        engine.play(0).unwrap();

        assert_eq!(
            engine.highlight(Size::new(300.0, 300.0)),
            Highlight::Text {
                word_index: Some(0)
            }
        );
    }

    #[tokio::test]
    async fn test_bookmark_and_annotation_on_current_page() {
        let (mut engine, _, library) = engine_for(&["a", "b"]).await;
        engine.next();

        assert!(engine.toggle_bookmark().await.unwrap());
        assert!(engine.document().has_bookmark(1));

        engine.annotate("revisar").await.unwrap();
        assert_eq!(engine.document().annotation(1), Some("revisar"));
        assert_eq!(
            library.get(&id()).await.unwrap().annotation(1),
            Some("revisar")
        );
    }

    proptest! {
        #[test]
        fn prop_word_index_non_decreasing(mut offsets in proptest::collection::vec(0usize..60, 1..30)) {
            offsets.sort_unstable();
            offsets.dedup();

            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let (mut engine, speech, _) = engine_for(&[TEN_WORDS]).await;
                engine.play(0).unwrap();
                let sink = speech.sink();

                let mut last = 0;
                for offset in offsets {
                    let update = engine.handle_event(SpeechEvent {
                        session: sink.session(),
                        kind: SpeechEventKind::Boundary { char_index: offset },
                    });
                    let PlaybackUpdate::Word { word_index, .. } = update else {
                        return Err(TestCaseError::fail("boundary was not applied"));
                    };
                    prop_assert!(word_index >= last);
                    last = word_index;
                }
                Ok(())
            })?;
        }
    }
}
