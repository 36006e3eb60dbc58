//! Screen Capture Layer
//!
//! Collaborator contract for pulling pixel regions off the screen. Capture
//! backends are supplied by the host application; the core only requires that
//! captures are cheap, repeatable, and read-only with respect to the source.

pub mod frame;

pub use frame::FrameSnapshot;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Axis-aligned screen region in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    /// Left edge in screen coordinates
    pub x: i32,
    /// Top edge in screen coordinates
    pub y: i32,
    /// Region width
    pub width: u32,
    /// Region height
    pub height: u32,
}

impl Region {
    /// Create a new region
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Self {
            x: 100,
            y: 100,
            width: 1020,
            height: 264,
        }
    }
}

/// Errors raised by a capture backend
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No frame could be produced for the requested region
    #[error("frame unavailable: {0}")]
    FrameUnavailable(String),
}

/// Screen capture collaborator
pub trait FrameSource {
    /// Capture the given screen region as a frame snapshot
    fn capture(&self, region: Region) -> Result<FrameSnapshot, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_default() {
        let region = Region::default();
        assert_eq!(region.width, 1020);
        assert_eq!(region.height, 264);
    }

    #[test]
    fn test_region_serde_roundtrip() {
        let region = Region::new(10, 20, 300, 400);
        let toml_str = toml::to_string(&region).unwrap();
        let parsed: Region = toml::from_str(&toml_str).unwrap();
        assert_eq!(region, parsed);
    }
}
