// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline runner: executes one recognition run on a blocking worker and
// streams its events over a channel.
//
// Stage order (strictly sequential, no stage re-entered):
//
//   Idle → Loading → Preprocessing → Previewing → Recognizing → Aggregating
//        → [PostProcessing] → Completed | Failed
//
// Events: Progress(10) after load, Preview + Progress(40) after
// preprocessing, Progress(70) after recognition, Progress(100) on
// completion, then exactly one terminal Result or Failure. Nothing is sent
// after the terminal event, and the runner accepts a new run by the time it
// is delivered.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lesewerk_core::config::AppConfig;
use lesewerk_core::error::{ErrorCode, LesewerkError, Result};
use lesewerk_core::types::{OcrResult, RunId, Settings};
use lesewerk_engine::{EngineInvoker, OcrEngine, TesseractEngine, aggregate};
use lesewerk_imaging::{ImageLoader, PreprocessedImage, Preprocessor};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::diagnostics::DiagnosticLog;
use crate::lexicon::{Lexicon, WordListLexicon};
use crate::postprocess::post_process;

const PROGRESS_LOADED: u8 = 10;
const PROGRESS_PREPROCESSED: u8 = 40;
const PROGRESS_RECOGNIZED: u8 = 70;
const PROGRESS_DONE: u8 = 100;

/// A message from a running pipeline to its caller.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Coarse milestone in `0..=100`; non-decreasing within a run.
    Progress(u8),
    /// The preprocessed raster, sent once right after preprocessing.
    Preview(PreprocessedImage),
    /// Terminal: the run succeeded.
    Result(OcrResult),
    /// Terminal: the run failed at some stage.
    Failure { code: ErrorCode, message: String },
}

impl PipelineEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Result(_) | Self::Failure { .. })
    }
}

/// Stage of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Idle,
    Loading,
    Preprocessing,
    Previewing,
    Recognizing,
    Aggregating,
    PostProcessing,
    Completed,
    Failed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Preprocessing => "preprocessing",
            Self::Previewing => "previewing",
            Self::Recognizing => "recognizing",
            Self::Aggregating => "aggregating",
            Self::PostProcessing => "post_processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Orchestrates runs. At most one run is active per runner; a second
/// [`start`](Self::start) while busy fails with
/// [`LesewerkError::RunInProgress`].
pub struct PipelineRunner {
    engine: Arc<dyn OcrEngine>,
    lexicon: Option<Arc<dyn Lexicon>>,
    diagnostics: Option<Arc<DiagnosticLog>>,
    config: AppConfig,
    busy: Arc<AtomicBool>,
}

impl PipelineRunner {
    pub fn new(engine: Arc<dyn OcrEngine>, config: AppConfig) -> Self {
        Self {
            engine,
            lexicon: None,
            diagnostics: None,
            config,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wire up the Tesseract engine, the word-list lexicon and the
    /// diagnostic log from configuration.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let engine: Arc<dyn OcrEngine> = Arc::new(TesseractEngine::from_config(&config));
        let mut runner = Self::new(engine, config.clone());

        if let Some(path) = &config.dictionary_path {
            let lexicon = WordListLexicon::open(path, config.max_suggestions)?;
            runner = runner.with_lexicon(Arc::new(lexicon));
        }
        if let Some(path) = &config.diagnostic_log {
            runner = runner.with_diagnostics(Arc::new(DiagnosticLog::open(path)?));
        }
        Ok(runner)
    }

    pub fn with_lexicon(mut self, lexicon: Arc<dyn Lexicon>) -> Self {
        self.lexicon = Some(lexicon);
        self
    }

    pub fn with_diagnostics(mut self, log: Arc<DiagnosticLog>) -> Self {
        self.diagnostics = Some(log);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Whether a run is currently active.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Start a run on the current Tokio runtime's blocking pool.
    ///
    /// # Errors
    ///
    /// - [`LesewerkError::Runtime`] when called outside a Tokio runtime.
    /// - [`LesewerkError::Config`] when spell checking is requested but no
    ///   lexicon is configured.
    /// - [`LesewerkError::RunInProgress`] when another run is active.
    ///
    /// Stage failures are not returned here; they arrive as a
    /// [`PipelineEvent::Failure`].
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn start(&self, path: impl AsRef<Path>, settings: Settings) -> Result<RunHandle> {
        let runtime = Handle::try_current().map_err(|e| LesewerkError::Runtime(e.to_string()))?;

        let lexicon = match (&self.lexicon, settings.spellcheck_enabled) {
            (None, true) => {
                return Err(LesewerkError::Config(
                    "spell checking requested but no dictionary is configured".into(),
                ));
            }
            (lexicon, _) => lexicon.clone(),
        };

        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                warn!("Run rejected: another run is active");
                LesewerkError::RunInProgress
            })?;

        let id = RunId::new();
        let (tx, rx) = unbounded_channel();
        let job = RunJob {
            id,
            source: path.as_ref().to_path_buf(),
            settings,
            engine: Arc::clone(&self.engine),
            lexicon,
            diagnostics: self.diagnostics.clone(),
            config: self.config.clone(),
            events: EventSink { tx },
            busy: BusyGuard(Arc::clone(&self.busy)),
        };

        info!(run_id = %id, "Run started");
        let task = runtime.spawn_blocking(move || job.run());

        Ok(RunHandle {
            id,
            events: rx,
            task,
        })
    }
}

/// Caller's side of one run.
pub struct RunHandle {
    id: RunId,
    events: UnboundedReceiver<PipelineEvent>,
    task: JoinHandle<Result<OcrResult>>,
}

impl RunHandle {
    pub fn id(&self) -> RunId {
        self.id
    }

    /// Next event, or `None` once the run has finished and every event has
    /// been received.
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        self.events.recv().await
    }

    /// Drain all remaining events in order and wait for the worker to exit.
    pub async fn collect(mut self) -> Result<Vec<PipelineEvent>> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        // The run's own outcome is already in the terminal event.
        let _ = self.task.await.map_err(join_failure)?;
        Ok(events)
    }

    /// Wait for the run and return its result or the error that failed it.
    /// Undelivered events are discarded.
    pub async fn outcome(self) -> Result<OcrResult> {
        let RunHandle { events, task, .. } = self;
        drop(events);
        task.await.map_err(join_failure)?
    }
}

fn join_failure(err: tokio::task::JoinError) -> LesewerkError {
    LesewerkError::Runtime(format!("pipeline worker did not complete: {err}"))
}

/// Clears the busy flag when dropped, including during unwinding.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Event sender that tolerates a caller who stopped listening.
struct EventSink {
    tx: UnboundedSender<PipelineEvent>,
}

impl EventSink {
    fn send(&self, event: PipelineEvent) {
        if self.tx.send(event).is_err() {
            debug!("Event dropped: receiver closed");
        }
    }

    fn progress(&self, percent: u8) {
        self.send(PipelineEvent::Progress(percent));
    }
}

/// Everything one run owns. Consumed by [`RunJob::run`].
struct RunJob {
    id: RunId,
    source: PathBuf,
    settings: Settings,
    engine: Arc<dyn OcrEngine>,
    lexicon: Option<Arc<dyn Lexicon>>,
    diagnostics: Option<Arc<DiagnosticLog>>,
    config: AppConfig,
    events: EventSink,
    busy: BusyGuard,
}

impl RunJob {
    #[instrument(skip_all, fields(run_id = %self.id))]
    fn run(self) -> Result<OcrResult> {
        let mut state = StateTracker::new(self.id);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute(&mut state)))
            .unwrap_or_else(|payload| Err(stage_panic(payload)));

        let terminal = match &outcome {
            Ok(result) => {
                state.advance(PipelineState::Completed);
                info!(confidence = result.confidence(), "Run completed");
                if let Some(log) = &self.diagnostics {
                    if let Err(e) = log.record_success(self.id, &self.source, result) {
                        warn!(error = %e, "Could not write diagnostic log");
                    }
                }
                PipelineEvent::Result(result.clone())
            }
            Err(err) => {
                state.advance(PipelineState::Failed);
                error!(code = %err.code(), error = %err, "Run failed");
                if let Some(log) = &self.diagnostics {
                    if let Err(e) = log.record_failure(self.id, &self.source, err) {
                        warn!(error = %e, "Could not write diagnostic log");
                    }
                }
                PipelineEvent::Failure {
                    code: err.code(),
                    message: err.to_string(),
                }
            }
        };

        // The flag must be clear before the caller can observe the terminal event.
        let RunJob { busy, events, .. } = self;
        drop(busy);
        events.send(terminal);
        outcome
    }

    fn execute(&self, state: &mut StateTracker) -> Result<OcrResult> {
        state.advance(PipelineState::Loading);
        let raw = ImageLoader::new(self.config.max_samples).load(&self.source)?;
        self.events.progress(PROGRESS_LOADED);

        state.advance(PipelineState::Preprocessing);
        // `process` takes the raw buffer by value; it is freed here.
        let image = Preprocessor::new(self.config.apply_enhancements).process(raw, &self.settings);

        state.advance(PipelineState::Previewing);
        self.events.send(PipelineEvent::Preview(image.clone()));
        self.events.progress(PROGRESS_PREPROCESSED);

        state.advance(PipelineState::Recognizing);
        let invoker = EngineInvoker::new(
            self.engine.as_ref(),
            &self.settings,
            self.config.legacy_engine_available,
        );
        let text = invoker.extract_text(&image)?;
        let tokens = invoker.extract_tokens(&image)?;
        drop(image);
        self.events.progress(PROGRESS_RECOGNIZED);

        state.advance(PipelineState::Aggregating);
        let confidence = aggregate(&tokens.confidences());
        debug!(tokens = tokens.len(), confidence, "Confidence aggregated");

        let text = match (&self.lexicon, self.settings.spellcheck_enabled) {
            (Some(lexicon), true) => {
                state.advance(PipelineState::PostProcessing);
                post_process(&text, true, lexicon.as_ref())?
            }
            _ => text,
        };

        let result = OcrResult::new(text, confidence, self.settings);
        self.events.progress(PROGRESS_DONE);
        Ok(result)
    }
}

/// A panicking stage becomes a `Runtime` failure instead of a closed channel
/// with no terminal event.
fn stage_panic(payload: Box<dyn Any + Send>) -> LesewerkError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into());
    LesewerkError::Runtime(format!("pipeline stage panicked: {detail}"))
}

/// Logs stage transitions and checks they only move forward.
struct StateTracker {
    run_id: RunId,
    current: PipelineState,
}

impl StateTracker {
    fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            current: PipelineState::Idle,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(next > self.current, "stage {next} after {}", self.current);
        debug!(run_id = %self.run_id, from = %self.current, to = %next, "Stage transition");
        self.current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use image::{GrayImage, Luma};
    use lesewerk_core::types::{EngineMode, Segmentation};
    use lesewerk_engine::{EngineConfig, TokenConfidence, TokenEntry, TokenTable};

    use crate::diagnostics::DiagnosticLevel;

    /// Counts engine calls and returns canned output.
    struct CountingEngine {
        calls: AtomicUsize,
        configs: Mutex<Vec<String>>,
        text: String,
        confidences: Vec<TokenConfidence>,
        gate: Option<Mutex<std::sync::mpsc::Receiver<()>>>,
        fail_data: bool,
        panic_on_text: bool,
    }

    impl CountingEngine {
        fn new(text: &str, confidences: Vec<TokenConfidence>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                configs: Mutex::new(Vec::new()),
                text: text.into(),
                confidences,
                gate: None,
                fail_data: false,
                panic_on_text: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn record(&self, config: &EngineConfig) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.configs.lock().unwrap().push(config.to_string());
            if let Some(gate) = &self.gate {
                // Blocks until released or the sender is dropped.
                let _ = gate.lock().unwrap().recv();
            }
        }
    }

    impl OcrEngine for CountingEngine {
        fn image_to_string(&self, _: &PreprocessedImage, config: &EngineConfig) -> Result<String> {
            self.record(config);
            if self.panic_on_text {
                panic!("recogniser crashed");
            }
            Ok(self.text.clone())
        }

        fn image_to_data(&self, _: &PreprocessedImage, config: &EngineConfig) -> Result<TokenTable> {
            self.record(config);
            if self.fail_data {
                return Err(LesewerkError::Engine("tesseract exited with 1".into()));
            }
            Ok(TokenTable::new(
                self.confidences
                    .iter()
                    .map(|&confidence| TokenEntry {
                        level: 5,
                        text: String::new(),
                        confidence,
                    })
                    .collect(),
            ))
        }
    }

    /// Lexicon that counts lookups and optionally fails.
    struct CountingLexicon {
        inner: WordListLexicon,
        lookups: AtomicUsize,
        fail: bool,
    }

    impl CountingLexicon {
        fn new(words: &[&str]) -> Self {
            Self {
                inner: WordListLexicon::new(words.iter().copied(), 5),
                lookups: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    impl Lexicon for CountingLexicon {
        fn check(&self, word: &str) -> Result<bool> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(LesewerkError::PostProcess("dictionary unavailable".into()));
            }
            self.inner.check(word)
        }

        fn suggest(&self, word: &str) -> Result<Vec<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.suggest(word)
        }
    }

    fn scores() -> Vec<TokenConfidence> {
        vec![
            TokenConfidence::Score(90),
            TokenConfidence::NoText,
            TokenConfidence::Score(70),
            TokenConfidence::NoText,
        ]
    }

    fn write_page(dir: &Path, width: u32, height: u32) -> PathBuf {
        let path = dir.join("page.png");
        GrayImage::from_pixel(width, height, Luma([200]))
            .save(&path)
            .unwrap();
        path
    }

    fn lstm_auto() -> Settings {
        Settings {
            engine_mode: EngineMode::LstmOnly,
            segmentation: Segmentation::Auto,
            spellcheck_enabled: false,
            ..Settings::default()
        }
    }

    fn progress_values(events: &[PipelineEvent]) -> Vec<u8> {
        events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    fn failure_code(events: &[PipelineEvent]) -> Option<ErrorCode> {
        events.iter().find_map(|e| match e {
            PipelineEvent::Failure { code, .. } => Some(*code),
            _ => None,
        })
    }

    #[tokio::test]
    async fn grayscale_page_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(dir.path(), 800, 600);

        let engine = Arc::new(CountingEngine::new("Hello world\nsecond line", scores()));
        let lexicon = Arc::new(CountingLexicon::new(&["hello"]));
        let runner = PipelineRunner::new(engine.clone(), AppConfig::default())
            .with_lexicon(lexicon.clone());

        let events = runner.start(&page, lstm_auto()).unwrap().collect().await.unwrap();

        assert_eq!(events.len(), 6);
        assert!(matches!(events[0], PipelineEvent::Progress(10)));
        match &events[1] {
            PipelineEvent::Preview(preview) => {
                assert_eq!((preview.width(), preview.height()), (800, 600));
                assert_eq!(preview.channels(), 1);
            }
            other => panic!("expected preview, got {other:?}"),
        }
        assert!(matches!(events[2], PipelineEvent::Progress(40)));
        assert!(matches!(events[3], PipelineEvent::Progress(70)));
        assert!(matches!(events[4], PipelineEvent::Progress(100)));
        match &events[5] {
            PipelineEvent::Result(result) => {
                assert_eq!(result.text(), "Hello world\nsecond line");
                assert_eq!(result.confidence(), 80.0);
                assert_eq!(result.settings(), &lstm_auto());
            }
            other => panic!("expected result, got {other:?}"),
        }

        assert_eq!(engine.calls(), 2);
        assert_eq!(*engine.configs.lock().unwrap(), vec!["--oem 1 --psm 1"; 2]);
        assert_eq!(lexicon.lookups.load(Ordering::SeqCst), 0);
        assert!(!runner.is_busy());
    }

    #[tokio::test]
    async fn oversized_image_never_reaches_engine() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(dir.path(), 800, 600);

        let engine = Arc::new(CountingEngine::new("unused", scores()));
        let config = AppConfig {
            max_samples: 800 * 600,
            ..AppConfig::default()
        };
        let runner = PipelineRunner::new(engine.clone(), config);

        let events = runner.start(&page, lstm_auto()).unwrap().collect().await.unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(failure_code(&events), Some(ErrorCode::ResourceLimit));
        assert_eq!(engine.calls(), 0);
    }

    fn assert_failed_after_preview(events: &[PipelineEvent], expected: ErrorCode) {
        assert_eq!(events.len(), 4, "events: {events:?}");
        assert!(matches!(events[0], PipelineEvent::Progress(10)));
        assert!(matches!(events[1], PipelineEvent::Preview(_)));
        assert!(matches!(events[2], PipelineEvent::Progress(40)));
        match &events[3] {
            PipelineEvent::Failure { code, message } => {
                assert_eq!(*code, expected);
                assert!(!message.is_empty());
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn engine_failure_after_preview() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(dir.path(), 64, 48);

        let mut engine = CountingEngine::new("text", scores());
        engine.fail_data = true;
        let engine = Arc::new(engine);
        let runner = PipelineRunner::new(engine.clone(), AppConfig::default());

        let events = runner.start(&page, lstm_auto()).unwrap().collect().await.unwrap();

        assert_failed_after_preview(&events, ErrorCode::EngineError);
        assert!(!events.iter().any(|e| matches!(e, PipelineEvent::Result(_))));
        assert_eq!(engine.calls(), 2);
    }

    #[tokio::test]
    async fn engine_panic_becomes_failure_event() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(dir.path(), 64, 48);

        let mut engine = CountingEngine::new("text", scores());
        engine.panic_on_text = true;
        let runner = PipelineRunner::new(Arc::new(engine), AppConfig::default());

        let events = runner.start(&page, lstm_auto()).unwrap().collect().await.unwrap();

        assert_failed_after_preview(&events, ErrorCode::RuntimeError);
        assert!(!runner.is_busy());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn restart_allowed_on_terminal_event() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(dir.path(), 1200, 900);
        let log = Arc::new(DiagnosticLog::open(dir.path().join("diag.jsonl")).unwrap());

        let engine = Arc::new(CountingEngine::new("text", scores()));
        let runner = PipelineRunner::new(engine, AppConfig::default()).with_diagnostics(log.clone());

        let sources = [page.clone(), dir.path().join("missing.png")];
        for source in sources.iter().cycle().take(6) {
            let mut handle = runner.start(source, lstm_auto()).unwrap();
            while let Some(event) = handle.next_event().await {
                if event.is_terminal() {
                    break;
                }
            }

            // No waiting on the worker: the terminal event alone must free the runner.
            let retry = runner.start(&page, lstm_auto()).unwrap();
            retry.outcome().await.unwrap();
            let _ = handle.outcome().await;
        }

        assert_eq!(log.entries().unwrap().len(), 12);
    }

    #[tokio::test]
    async fn missing_file_fails_with_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = Arc::new(CountingEngine::new("unused", scores()));
        let runner = PipelineRunner::new(engine.clone(), AppConfig::default());

        let handle = runner
            .start(dir.path().join("absent.png"), lstm_auto())
            .unwrap();
        let err = handle.outcome().await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::LoadError);
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn spellcheck_rewrites_unknown_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(dir.path(), 64, 48);

        let engine = Arc::new(CountingEngine::new("Helo   wrld\nok fine", scores()));
        let lexicon = Arc::new(CountingLexicon::new(&["hello", "world", "fine"]));
        let runner =
            PipelineRunner::new(engine, AppConfig::default()).with_lexicon(lexicon.clone());

        let settings = Settings {
            spellcheck_enabled: true,
            ..lstm_auto()
        };
        let result = runner.start(&page, settings).unwrap().outcome().await.unwrap();

        assert_eq!(result.text(), "Hello world\nok fine");
        assert!(result.settings().spellcheck_enabled);
        assert!(lexicon.lookups.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn lexicon_failure_aborts_without_result() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(dir.path(), 64, 48);

        let engine = Arc::new(CountingEngine::new("some words here", scores()));
        let mut lexicon = CountingLexicon::new(&[]);
        lexicon.fail = true;
        let runner = PipelineRunner::new(engine, AppConfig::default()).with_lexicon(Arc::new(lexicon));

        let settings = Settings {
            spellcheck_enabled: true,
            ..lstm_auto()
        };
        let events = runner.start(&page, settings).unwrap().collect().await.unwrap();

        assert_eq!(failure_code(&events), Some(ErrorCode::PostProcessError));
        assert!(!events.iter().any(|e| matches!(e, PipelineEvent::Result(_))));
        assert_eq!(progress_values(&events), vec![10, 40, 70]);
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert!(events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn spellcheck_without_lexicon_is_rejected() {
        let engine = Arc::new(CountingEngine::new("x", scores()));
        let runner = PipelineRunner::new(engine, AppConfig::default());
        let settings = Settings {
            spellcheck_enabled: true,
            ..lstm_auto()
        };

        let result = runner.start("page.png", settings);
        assert!(matches!(result, Err(LesewerkError::Config(_))));
        assert!(!runner.is_busy());
    }

    #[tokio::test]
    async fn second_run_is_rejected_while_busy() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(dir.path(), 32, 32);

        let (release, gate) = std::sync::mpsc::channel();
        let mut engine = CountingEngine::new("text", scores());
        engine.gate = Some(Mutex::new(gate));
        let runner = PipelineRunner::new(Arc::new(engine), AppConfig::default());

        let first = runner.start(&page, lstm_auto()).unwrap();
        assert!(runner.is_busy());
        assert!(matches!(
            runner.start(&page, lstm_auto()),
            Err(LesewerkError::RunInProgress)
        ));

        drop(release);
        first.outcome().await.unwrap();
        assert!(!runner.is_busy());

        let third = runner.start(&page, lstm_auto()).unwrap();
        assert!(third.outcome().await.is_ok());
    }

    #[tokio::test]
    async fn events_are_streamed_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(dir.path(), 40, 30);

        let engine = Arc::new(CountingEngine::new("a", vec![TokenConfidence::NoText]));
        let runner = PipelineRunner::new(engine, AppConfig::default());

        let mut handle = runner.start(&page, lstm_auto()).unwrap();
        let mut last_progress = 0;
        let mut previews = 0;
        let mut terminal = None;
        while let Some(event) = handle.next_event().await {
            assert!(terminal.is_none(), "event after terminal: {event:?}");
            match event {
                PipelineEvent::Progress(p) => {
                    assert!(p >= last_progress);
                    last_progress = p;
                }
                PipelineEvent::Preview(_) => previews += 1,
                other => terminal = Some(other),
            }
        }

        assert_eq!(last_progress, 100);
        assert_eq!(previews, 1);
        match terminal {
            Some(PipelineEvent::Result(result)) => assert_eq!(result.confidence(), 0.0),
            other => panic!("expected result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn diagnostics_record_both_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let page = write_page(dir.path(), 32, 32);
        let log = Arc::new(DiagnosticLog::open(dir.path().join("diag.jsonl")).unwrap());

        let engine = Arc::new(CountingEngine::new("text", scores()));
        let runner = PipelineRunner::new(engine, AppConfig::default()).with_diagnostics(log.clone());

        let ok = runner.start(&page, lstm_auto()).unwrap();
        let ok_id = ok.id();
        ok.outcome().await.unwrap();

        let bad = runner.start(dir.path().join("gone.png"), lstm_auto()).unwrap();
        let bad_id = bad.id();
        assert!(bad.outcome().await.is_err());

        let ok_entries = log.entries_for_run(ok_id).unwrap();
        assert_eq!(ok_entries.len(), 1);
        assert_eq!(ok_entries[0].level, DiagnosticLevel::Info);
        assert_eq!(ok_entries[0].confidence, Some(80.0));
        assert!(ok_entries[0].source_sha256.is_some());

        let bad_entries = log.entries_for_run(bad_id).unwrap();
        assert_eq!(bad_entries[0].level, DiagnosticLevel::Error);
        assert_eq!(bad_entries[0].code, Some(ErrorCode::LoadError));
    }

    #[test]
    fn start_outside_runtime_is_runtime_error() {
        let engine = Arc::new(CountingEngine::new("x", scores()));
        let runner = PipelineRunner::new(engine, AppConfig::default());
        assert!(matches!(
            runner.start("page.png", lstm_auto()),
            Err(LesewerkError::Runtime(_))
        ));
    }

    #[test]
    fn from_config_loads_dictionary_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let words = dir.path().join("words.txt");
        std::fs::write(&words, "hello\nworld\n").unwrap();

        let config = AppConfig {
            dictionary_path: Some(words),
            diagnostic_log: Some(dir.path().join("logs/diag.jsonl")),
            ..AppConfig::default()
        };
        let runner = PipelineRunner::from_config(config).unwrap();
        assert!(runner.lexicon.is_some());
        assert!(runner.diagnostics.is_some());
        assert!(dir.path().join("logs/diag.jsonl").exists());
    }
}
