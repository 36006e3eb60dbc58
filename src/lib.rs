//! OverText - screen translation overlay core
//!
//! Captures a screen region, detects when its content changes, runs OCR,
//! translates the combined text, re-distributes the translation across the
//! original text blocks, and wraps each fragment to fit its block's box.
//! Platform concerns (actual screen grabbing, OCR engines, font rasterizers
//! and the overlay window itself) plug in through the collaborator traits
//! [`capture::FrameSource`], [`vision::TextDetector`],
//! [`translate::Translator`], [`layout::Measure`] and
//! [`overlay::RenderSink`].

pub mod align;
pub mod capture;
pub mod config;
pub mod detect;
pub mod layout;
pub mod overlay;
pub mod session;
pub mod translate;
pub mod vision;

pub use capture::{CaptureError, FrameSnapshot, FrameSource, Region};
pub use config::AppConfig;
pub use detect::{ChangeDetector, ComparisonMethod};
pub use layout::{FontDesc, Measure, TextSize, WrappedText};
pub use overlay::{Color, RenderBlock, RenderSink};
pub use session::{
    Collaborators, CycleOutcome, CycleTrigger, SessionConfig, SessionController, SessionEvent,
    SessionManager,
};
pub use translate::{build_translator, TranslationError, TranslationService, Translator};
pub use vision::{OcrDetection, OcrError, TextBlock, TextDetector};
