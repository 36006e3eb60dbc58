//! Message types between the pipeline worker and the owning context

use crate::overlay::RenderBlock;

/// Commands sent to the polling worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Run a pipeline cycle now, bypassing the change-detection gate
    Trigger,
    /// Clear rendered translations and forget comparison state
    Clear,
    /// Exit the polling loop
    Stop,
}

/// Results handed off from the worker to the rendering context
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A cycle completed and produced a new block set to display
    Rendered(Vec<RenderBlock>),
    /// Translations were cleared
    Cleared,
    /// A cycle was aborted; the previous render is untouched
    CycleError(String),
}
