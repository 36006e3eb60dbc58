//! Vision/OCR Layer
//!
//! Defines the OCR collaborator contract and the text block model produced
//! from it. The OCR engine itself lives outside the core; this module converts
//! its quad-based detections into axis-aligned text blocks, builds the
//! recognizer language set from the configured language pair, and estimates
//! the original on-screen font size from the source pixels.

use image::GrayImage;
use thiserror::Error;

use crate::capture::FrameSnapshot;
use crate::layout::{MAX_BLOCK_FONT_SIZE, MIN_BLOCK_FONT_SIZE};
use crate::translate::base_lang;

/// Mid-point intensity separating "text" pixels from background
const TEXT_INTENSITY_THRESHOLD: u8 = 128;

/// Minimum dark-pixel coverage before assuming light-on-dark text
const DARK_TEXT_MIN_COVERAGE: f32 = 0.1;

/// One OCR-detected text region with its axis-aligned pixel rectangle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    /// Detected text content
    pub text: String,
    /// Left edge relative to the captured region
    pub x: i32,
    /// Top edge relative to the captured region
    pub y: i32,
    /// Block width in pixels
    pub width: u32,
    /// Block height in pixels
    pub height: u32,
}

impl TextBlock {
    /// Create a new text block
    pub fn new(text: impl Into<String>, x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the block carries any non-whitespace text
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Raw OCR detection: recognized text plus its bounding quad
///
/// Quad points are ordered top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone)]
pub struct OcrDetection {
    /// Recognized text
    pub text: String,
    /// Bounding quad corner points
    pub quad: [(f32, f32); 4],
}

/// Errors raised by an OCR backend
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine could not be reached or is misconfigured
    #[error("ocr engine unavailable: {0}")]
    EngineUnavailable(String),
    /// The requested recognizer language set is not supported
    #[error("unsupported ocr language set: {0:?}")]
    UnsupportedLanguages(Vec<String>),
}

/// OCR collaborator
pub trait TextDetector {
    /// Detect text regions in a captured frame
    fn detect_text(&self, frame: &FrameSnapshot) -> Result<Vec<OcrDetection>, OcrError>;

    /// Reconfigure the recognizer language set
    ///
    /// Engines that cannot switch languages at runtime may ignore this.
    fn set_languages(&mut self, languages: &[String]) -> Result<(), OcrError> {
        let _ = languages;
        Ok(())
    }
}

/// Convert an OCR quad into an axis-aligned text block
///
/// Uses the top-left corner as the origin, the top-right delta for width and
/// the bottom-left delta for height.
pub fn quad_to_block(detection: &OcrDetection) -> TextBlock {
    let [top_left, top_right, _bottom_right, bottom_left] = detection.quad;

    TextBlock {
        text: detection.text.clone(),
        x: top_left.0 as i32,
        y: top_left.1 as i32,
        width: (top_right.0 - top_left.0).max(0.0) as u32,
        height: (bottom_left.1 - top_left.1).max(0.0) as u32,
    }
}

/// Convert OCR detections into text blocks, dropping empty detections
pub fn blocks_from_detections(detections: &[OcrDetection]) -> Vec<TextBlock> {
    detections
        .iter()
        .filter(|d| !d.text.trim().is_empty())
        .map(quad_to_block)
        .collect()
}

/// Build the recognizer language list for a source/target pair
///
/// The source language is included unless it is `auto`, in which case English
/// stands in; the target language is appended when not already present.
pub fn ocr_language_set(source: &str, target: &str) -> Vec<String> {
    let source = base_lang(source);
    let target = base_lang(target);

    let mut languages = Vec::new();

    if source != "auto" && !source.is_empty() {
        languages.push(source);
    } else {
        languages.push("en".to_string());
    }

    if !target.is_empty() && !languages.contains(&target) {
        languages.push(target);
    }

    languages
}

/// Minimal language set used when the OCR engine rejects the configured one
pub fn fallback_language_set() -> Vec<String> {
    vec!["en".to_string()]
}

/// Estimate the font size of the original text from the source image region
///
/// Counts pixels darker than the mid threshold inside the block rectangle;
/// when dark coverage is under 10% of the region the text is assumed to be
/// light-on-dark and bright pixels are counted instead. The pixel density
/// scaled by the block height gives a rough size, clamped to a sane range.
pub fn estimate_font_size(intensity: &GrayImage, block: &TextBlock) -> u32 {
    let (img_w, img_h) = intensity.dimensions();

    let x0 = block.x.max(0) as u32;
    let y0 = block.y.max(0) as u32;
    if x0 >= img_w || y0 >= img_h {
        return MIN_BLOCK_FONT_SIZE;
    }
    let x1 = (x0 + block.width).min(img_w);
    let y1 = (y0 + block.height).min(img_h);

    let area = ((x1 - x0) as u64) * ((y1 - y0) as u64);
    if area == 0 {
        return MIN_BLOCK_FONT_SIZE;
    }

    let mut dark = 0u64;
    for y in y0..y1 {
        for x in x0..x1 {
            if intensity.get_pixel(x, y).0[0] < TEXT_INTENSITY_THRESHOLD {
                dark += 1;
            }
        }
    }

    let text_pixels = if (dark as f32) < area as f32 * DARK_TEXT_MIN_COVERAGE {
        area - dark
    } else {
        dark
    };

    let density = text_pixels as f32 / area as f32;
    let size = (block.height as f32 * 0.7 * density) as u32;

    size.clamp(MIN_BLOCK_FONT_SIZE, MAX_BLOCK_FONT_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_quad_to_block() {
        let detection = OcrDetection {
            text: "hello".to_string(),
            quad: [(10.0, 20.0), (110.0, 20.0), (110.0, 45.0), (10.0, 45.0)],
        };

        let block = quad_to_block(&detection);
        assert_eq!(block.x, 10);
        assert_eq!(block.y, 20);
        assert_eq!(block.width, 100);
        assert_eq!(block.height, 25);
    }

    #[test]
    fn test_quad_to_block_degenerate() {
        // Inverted quad must not underflow
        let detection = OcrDetection {
            text: "x".to_string(),
            quad: [(50.0, 50.0), (40.0, 50.0), (40.0, 40.0), (50.0, 40.0)],
        };

        let block = quad_to_block(&detection);
        assert_eq!(block.width, 0);
        assert_eq!(block.height, 0);
    }

    #[test]
    fn test_blocks_skip_empty_text() {
        let detections = vec![
            OcrDetection {
                text: "  ".to_string(),
                quad: [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            },
            OcrDetection {
                text: "ok".to_string(),
                quad: [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            },
        ];

        let blocks = blocks_from_detections(&detections);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "ok");
    }

    #[test]
    fn test_ocr_language_set_auto_source() {
        assert_eq!(ocr_language_set("auto", "de"), vec!["en", "de"]);
    }

    #[test]
    fn test_ocr_language_set_explicit_source() {
        assert_eq!(ocr_language_set("fr", "de"), vec!["fr", "de"]);
    }

    #[test]
    fn test_ocr_language_set_dedupes() {
        assert_eq!(ocr_language_set("en", "EN-us"), vec!["en"]);
        assert_eq!(ocr_language_set("auto", "en"), vec!["en"]);
    }

    #[test]
    fn test_estimate_font_size_dark_text() {
        // 20x20 block, half the pixels dark
        let mut img = GrayImage::from_pixel(20, 20, Luma([255u8]));
        for y in 0..20 {
            for x in 0..10 {
                img.put_pixel(x, y, Luma([0u8]));
            }
        }

        let block = TextBlock::new("t", 0, 0, 20, 20);
        // density 0.5 -> 20 * 0.7 * 0.5 = 7, clamped up to 8
        assert_eq!(estimate_font_size(&img, &block), 8);
    }

    #[test]
    fn test_estimate_font_size_light_on_dark() {
        // Nearly all dark pixels: dark coverage is high, so dark pixels are
        // the text; invert to a bright region with sparse dark pixels to hit
        // the light-text branch instead.
        let img = GrayImage::from_pixel(40, 40, Luma([255u8]));
        let block = TextBlock::new("t", 0, 0, 40, 40);
        // No dark pixels at all -> light text assumed, density 1.0
        // 40 * 0.7 * 1.0 = 28
        assert_eq!(estimate_font_size(&img, &block), 28);
    }

    #[test]
    fn test_estimate_font_size_out_of_bounds() {
        let img = GrayImage::new(10, 10);
        let block = TextBlock::new("t", 50, 50, 20, 20);
        assert_eq!(estimate_font_size(&img, &block), MIN_BLOCK_FONT_SIZE);
    }
}
