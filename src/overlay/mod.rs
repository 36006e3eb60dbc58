//! Overlay Presentation Layer
//!
//! Render sink contract for displaying wrapped translations. The core owns
//! what to draw (rectangles, lines, fonts, colors); how that reaches the
//! screen is entirely the host's concern.

use crate::capture::Region;
use crate::layout::FontDesc;

/// A 24-bit RGB text color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    /// Parse a `#RRGGBB` hex string
    pub fn from_hex(hex: &str) -> Option<Color> {
        let hex = hex.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Color { r, g, b })
    }

    /// Format as a `#RRGGBB` hex string
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// One block of wrapped translation ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderBlock {
    /// Where the block sits, relative to the captured region
    pub rect: Region,
    /// Wrapped lines in display order
    pub lines: Vec<String>,
    /// Font the lines were wrapped against
    pub font: FontDesc,
    /// Text color
    pub color: Color,
}

/// Render collaborator
pub trait RenderSink {
    /// Replace the displayed block set
    fn render(&mut self, blocks: &[RenderBlock]);

    /// Remove everything from the display
    fn clear(&mut self);

    /// Show or hide the rendered output without discarding it
    fn set_visible(&mut self, visible: bool);
}
