//! Session Controller
//!
//! Orchestrates the capture -> detect -> OCR -> translate -> align -> wrap
//! cycle and the continuous polling loop. The worker never touches renderable
//! state directly: completed block sets are handed off over a channel and the
//! owning context drives the render sink.

pub mod messages;

pub use messages::{SessionCommand, SessionEvent};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::align;
use crate::capture::{FrameSnapshot, FrameSource, Region};
use crate::config::AppConfig;
use crate::detect::{ChangeDetector, ComparisonMethod};
use crate::layout::{self, FontDesc, Measure};
use crate::overlay::{Color, RenderBlock, RenderSink};
use crate::translate::Translator;
use crate::vision::{self, TextBlock, TextDetector};

/// Current pipeline phase, for status display and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Capturing,
    Detecting,
    Extracting,
    Translating,
    Aligning,
    Rendering,
}

/// Runtime status shared between the worker and the owning context
#[derive(Debug, Clone, Default)]
pub struct SessionStatus {
    /// Phase the current cycle is in
    pub phase: SessionPhase,
    /// Whether the polling loop is running
    pub is_polling: bool,
    /// Completed pipeline cycles
    pub cycles_completed: u64,
    /// Last cycle error, if any
    pub last_error: Option<String>,
}

/// What started a pipeline cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleTrigger {
    /// User-initiated: skips the change-detection gate
    Manual,
    /// Polling loop: gated on the change detector
    Poll,
}

/// How a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A new block set was rendered (count of blocks)
    Rendered(usize),
    /// The change detector saw nothing new
    NoChange,
    /// OCR found no text in the frame
    NoText,
    /// The cycle was aborted by an error or cancellation
    Aborted,
}

/// Cooperative cancellation token polled at pipeline stage boundaries
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Session configuration snapshot derived from [`AppConfig`]
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Screen region to capture
    pub region: Region,
    /// Source language code (`auto` allowed)
    pub source_lang: String,
    /// Target language code
    pub target_lang: String,
    /// Frame comparison strategy
    pub method: ComparisonMethod,
    /// Change threshold fraction
    pub change_threshold: f32,
    /// Polling interval for continuous mode
    pub update_interval: Duration,
    /// Configured font (size used verbatim in fixed-size mode)
    pub font: FontDesc,
    /// Fixed-size vs adaptive font sizing
    pub use_fixed_font_size: bool,
    /// Rendered text color
    pub text_color: Color,
}

impl SessionConfig {
    /// Build a session configuration from the persisted settings
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            region: config.capture.region,
            source_lang: config.languages.source.clone(),
            target_lang: config.languages.target.clone(),
            method: config.detection.method,
            change_threshold: config.detection.change_threshold,
            update_interval: Duration::from_secs_f32(
                config.capture.update_interval_secs.max(0.1),
            ),
            font: FontDesc::new(
                config.appearance.font_family.clone(),
                config.appearance.font_size,
                config.appearance.bold,
            ),
            use_fixed_font_size: config.appearance.use_fixed_font_size,
            text_color: Color::from_hex(&config.appearance.text_color).unwrap_or_default(),
        }
    }
}

/// External collaborators supplied by the host
pub struct Collaborators {
    /// Screen capture backend
    pub frames: Box<dyn FrameSource + Send>,
    /// OCR backend
    pub ocr: Box<dyn TextDetector + Send>,
    /// Translation backend
    pub translator: Box<dyn Translator + Send>,
    /// Text measurement backend
    pub measure: Box<dyn Measure + Send>,
}

/// Per-cycle pipeline state, decoupled from any rendering handle
#[derive(Debug, Default)]
struct PipelineState {
    /// The last frame accepted by the change detector
    last_frame: Option<FrameSnapshot>,
    /// Text blocks from the most recent completed cycle
    blocks: Vec<TextBlock>,
}

/// Drives one pipeline cycle at a time
///
/// Only one cycle ever runs at once: the controller is owned either by the
/// foreground context or by the single polling worker, never both.
pub struct SessionController {
    config: SessionConfig,
    collaborators: Collaborators,
    detector: ChangeDetector,
    state: PipelineState,
    events: Sender<SessionEvent>,
    status: Arc<Mutex<SessionStatus>>,
}

impl SessionController {
    /// Create a controller and the event receiver for the rendering context
    pub fn new(
        config: SessionConfig,
        mut collaborators: Collaborators,
    ) -> (Self, Receiver<SessionEvent>) {
        let detector = ChangeDetector::new(config.method, config.change_threshold);

        // Configure the recognizer for the language pair, falling back to a
        // minimal set rather than leaving the pipeline permanently broken.
        let languages = vision::ocr_language_set(&config.source_lang, &config.target_lang);
        if let Err(e) = collaborators.ocr.set_languages(&languages) {
            warn!("OCR rejected language set {:?}: {}", languages, e);
            let fallback = vision::fallback_language_set();
            if let Err(e) = collaborators.ocr.set_languages(&fallback) {
                warn!("OCR fallback language set failed too: {}", e);
            } else {
                info!("OCR falling back to {:?}", fallback);
            }
        }

        let (events, receiver) = unbounded();

        (
            Self {
                config,
                collaborators,
                detector,
                state: PipelineState::default(),
                events,
                status: Arc::new(Mutex::new(SessionStatus::default())),
            },
            receiver,
        )
    }

    /// Handle for reading session status from other contexts
    pub fn status_handle(&self) -> Arc<Mutex<SessionStatus>> {
        self.status.clone()
    }

    /// The session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Text blocks from the most recent completed cycle
    pub fn last_blocks(&self) -> &[TextBlock] {
        &self.state.blocks
    }

    /// Drop all per-cycle state and tell the renderer to clear
    pub fn clear(&mut self) {
        self.state.blocks.clear();
        self.state.last_frame = None;
        self.detector.reset();
        let _ = self.events.send(SessionEvent::Cleared);
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.status.lock().phase = phase;
    }

    fn abort_cycle(&self, error: String) -> CycleOutcome {
        warn!("cycle aborted: {}", error);
        {
            let mut status = self.status.lock();
            status.last_error = Some(error.clone());
            status.phase = SessionPhase::Idle;
        }
        let _ = self.events.send(SessionEvent::CycleError(error));
        CycleOutcome::Aborted
    }

    /// Run one pipeline cycle
    ///
    /// Errors from capture or OCR abort the cycle and leave prior rendered
    /// state untouched; a translation failure substitutes a visible error
    /// token so spatial rendering still occurs.
    pub fn run_cycle(&mut self, trigger: CycleTrigger, cancel: &CancelToken) -> CycleOutcome {
        if cancel.is_cancelled() {
            return CycleOutcome::Aborted;
        }

        self.set_phase(SessionPhase::Capturing);
        let frame = match self.collaborators.frames.capture(self.config.region) {
            Ok(frame) => frame,
            Err(e) => return self.abort_cycle(format!("capture failed: {e}")),
        };

        // Numeric change detection gates polling cycles before OCR runs;
        // manual triggers always proceed.
        if trigger == CycleTrigger::Poll && self.config.method != ComparisonMethod::TextHash {
            self.set_phase(SessionPhase::Detecting);
            if !self
                .detector
                .frame_changed(self.state.last_frame.as_ref(), &frame)
            {
                debug!("no frame change; skipping cycle");
                self.set_phase(SessionPhase::Idle);
                return CycleOutcome::NoChange;
            }
        }

        if cancel.is_cancelled() {
            self.set_phase(SessionPhase::Idle);
            return CycleOutcome::Aborted;
        }

        self.set_phase(SessionPhase::Extracting);
        let detections = match self.collaborators.ocr.detect_text(&frame) {
            Ok(detections) => detections,
            Err(e) => {
                // Retry the minimal language set so the next cycle can work
                let fallback = vision::fallback_language_set();
                if self.collaborators.ocr.set_languages(&fallback).is_ok() {
                    info!("OCR error; language set reset to {:?}", fallback);
                }
                return self.abort_cycle(format!("ocr failed: {e}"));
            }
        };
        let blocks = vision::blocks_from_detections(&detections);

        // The text-hash method compares OCR output rather than pixels
        if trigger == CycleTrigger::Poll && self.config.method == ComparisonMethod::TextHash {
            self.set_phase(SessionPhase::Detecting);
            if !self.detector.text_changed(&blocks) {
                debug!("text hash unchanged; skipping cycle");
                self.set_phase(SessionPhase::Idle);
                return CycleOutcome::NoChange;
            }
        }

        // Accept the frame: replaced wholesale, never partially mutated
        if trigger == CycleTrigger::Poll {
            self.state.last_frame = Some(frame.clone());
        }

        if blocks.is_empty() {
            debug!("no text found in frame");
            self.set_phase(SessionPhase::Idle);
            return CycleOutcome::NoText;
        }

        if cancel.is_cancelled() {
            self.set_phase(SessionPhase::Idle);
            return CycleOutcome::Aborted;
        }

        self.set_phase(SessionPhase::Translating);
        let combined = align::combined_text(&blocks);
        let translated = match self.collaborators.translator.translate(
            &combined,
            &self.config.source_lang,
            &self.config.target_lang,
        ) {
            Ok(translated) => translated,
            Err(e) => {
                // Render the failure in place rather than aborting the cycle
                warn!("translation failed: {}", e);
                self.status.lock().last_error = Some(e.to_string());
                format!("[Translation Error: {e}]")
            }
        };

        if cancel.is_cancelled() {
            self.set_phase(SessionPhase::Idle);
            return CycleOutcome::Aborted;
        }

        self.set_phase(SessionPhase::Aligning);
        let fragments = align::align(&translated, &blocks);

        self.set_phase(SessionPhase::Rendering);
        let rendered = self.wrap_blocks(&frame, &blocks, &fragments);
        let count = rendered.len();
        let _ = self.events.send(SessionEvent::Rendered(rendered));

        self.state.blocks = blocks;
        {
            let mut status = self.status.lock();
            status.cycles_completed += 1;
            status.phase = SessionPhase::Idle;
        }
        info!(blocks = count, "pipeline cycle complete");

        CycleOutcome::Rendered(count)
    }

    /// Wrap each fragment into its block's box and build the render set
    fn wrap_blocks(
        &self,
        frame: &FrameSnapshot,
        blocks: &[TextBlock],
        fragments: &[String],
    ) -> Vec<RenderBlock> {
        let unspaced = layout::is_unspaced_script(&self.config.target_lang);

        // Intensity image is only needed for adaptive sizing
        let intensity = if self.config.use_fixed_font_size {
            None
        } else {
            Some(frame.to_intensity())
        };

        blocks
            .iter()
            .filter(|b| b.has_text())
            .zip(fragments.iter())
            .map(|(block, fragment)| {
                let size = match &intensity {
                    None => self.config.font.size,
                    Some(intensity) => layout::adaptive_font_size(
                        vision::estimate_font_size(intensity, block),
                        unspaced,
                    ),
                };
                let font = self.config.font.with_size(size);
                let wrapped = layout::wrap_to_block(
                    fragment,
                    block.width,
                    block.height,
                    &font,
                    self.collaborators.measure.as_ref(),
                    unspaced,
                );

                RenderBlock {
                    rect: Region::new(block.x, block.y, block.width, block.height),
                    lines: wrapped.lines,
                    font: font.with_size(wrapped.font_size_used),
                    color: self.config.text_color,
                }
            })
            .collect()
    }
}

/// A running polling worker
struct PollingWorker {
    cancel: CancelToken,
    commands: Sender<SessionCommand>,
    handle: JoinHandle<SessionController>,
}

/// Owns the session controller and its optional background polling loop
///
/// Starting continuous mode is idempotent; stopping is cooperative, the
/// worker exits at the next sleep or stage boundary. Manual triggers issued
/// while a cycle is in flight are queued on the command channel and run
/// between cycles, never concurrently.
pub struct SessionManager {
    controller: Option<SessionController>,
    worker: Option<PollingWorker>,
    status: Arc<Mutex<SessionStatus>>,
    interval: Duration,
}

impl SessionManager {
    /// Wrap a controller for foreground use and background polling
    pub fn new(controller: SessionController) -> Self {
        let status = controller.status_handle();
        let interval = controller.config().update_interval;
        Self {
            controller: Some(controller),
            worker: None,
            status,
            interval,
        }
    }

    /// Whether the polling loop is currently running
    pub fn is_polling(&self) -> bool {
        self.worker
            .as_ref()
            .map(|w| !w.handle.is_finished())
            .unwrap_or(false)
    }

    /// Start continuous mode; no-op when already running
    pub fn start(&mut self) {
        if self.is_polling() {
            debug!("polling already running");
            return;
        }

        // A finished worker still holds the controller; reclaim it first
        if self.worker.is_some() {
            self.stop();
        }

        let Some(mut controller) = self.controller.take() else {
            return;
        };

        let cancel = CancelToken::new();
        let (commands, command_rx) = unbounded::<SessionCommand>();
        let interval = self.interval;
        let status = self.status.clone();

        status.lock().is_polling = true;

        let worker_cancel = cancel.clone();
        let handle = std::thread::spawn(move || {
            info!("polling worker starting (interval {:?})", interval);
            loop {
                if worker_cancel.is_cancelled() {
                    break;
                }
                // Sleeping on the command channel lets manual triggers wake
                // the worker before the interval elapses
                match command_rx.recv_timeout(interval) {
                    Ok(SessionCommand::Trigger) => {
                        controller.run_cycle(CycleTrigger::Manual, &worker_cancel);
                    }
                    Ok(SessionCommand::Clear) => controller.clear(),
                    Ok(SessionCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {
                        controller.run_cycle(CycleTrigger::Poll, &worker_cancel);
                    }
                }
            }
            status.lock().is_polling = false;
            info!("polling worker exiting");
            controller
        });

        self.worker = Some(PollingWorker {
            cancel,
            commands,
            handle,
        });
    }

    /// Stop continuous mode and reclaim the controller
    ///
    /// Signals the worker and joins it; the worker exits after its current
    /// sleep or cycle boundary, never mid-stage.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        worker.cancel.cancel();
        let _ = worker.commands.send(SessionCommand::Stop);

        if let Ok(controller) = worker.handle.join() {
            self.controller = Some(controller);
        }
    }

    /// Run a manual capture-and-translate cycle
    ///
    /// While polling, the trigger is queued for the worker; otherwise the
    /// cycle runs directly on the calling context.
    pub fn trigger(&mut self) {
        if let Some(worker) = &self.worker {
            if !worker.handle.is_finished() {
                let _ = worker.commands.send(SessionCommand::Trigger);
                return;
            }
        }
        if let Some(controller) = &mut self.controller {
            controller.run_cycle(CycleTrigger::Manual, &CancelToken::new());
        }
    }

    /// Clear rendered translations
    pub fn clear(&mut self) {
        if let Some(worker) = &self.worker {
            if !worker.handle.is_finished() {
                let _ = worker.commands.send(SessionCommand::Clear);
                return;
            }
        }
        if let Some(controller) = &mut self.controller {
            controller.clear();
        }
    }

    /// Read the current session status
    pub fn status(&self) -> SessionStatus {
        self.status.lock().clone()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Forward pending worker events to the render sink
///
/// Non-blocking; call from the context that owns the sink.
pub fn pump_events(events: &Receiver<SessionEvent>, sink: &mut dyn RenderSink) {
    for event in events.try_iter() {
        match event {
            SessionEvent::Rendered(blocks) => sink.render(&blocks),
            SessionEvent::Cleared => sink.clear(),
            SessionEvent::CycleError(error) => {
                debug!("cycle error reported to renderer: {}", error);
            }
        }
    }
}
