//! Change Detection Layer
//!
//! Decides whether two captured frames differ enough to warrant re-running
//! the OCR/translate pipeline. Three numeric strategies compare intensity
//! images directly; a fourth hashes OCR output so pure pixel noise (video,
//! animations) does not retrigger translation.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::debug;

use crate::capture::FrameSnapshot;
use crate::vision::TextBlock;

/// Window edge for the structural similarity computation
const SSIM_WINDOW: u32 = 8;

/// Frame comparison strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMethod {
    /// Ratio of pixels whose intensity changed at all
    #[default]
    PixelDiff,
    /// Windowed structural similarity mapped to a change measure
    Ssim,
    /// Normalized intensity histogram distance
    Histogram,
    /// Hash of OCR text and positions
    TextHash,
}

/// Decides whether screen content changed beyond a configured threshold
#[derive(Debug)]
pub struct ChangeDetector {
    method: ComparisonMethod,
    threshold: f32,
    last_text_hash: Option<u64>,
}

impl ChangeDetector {
    /// Create a detector for the given method and threshold fraction
    pub fn new(method: ComparisonMethod, threshold: f32) -> Self {
        Self {
            method,
            threshold,
            last_text_hash: None,
        }
    }

    /// The configured comparison method
    pub fn method(&self) -> ComparisonMethod {
        self.method
    }

    /// Compare two frames using the configured numeric method
    ///
    /// Always reports a change when there is no previous frame. For the
    /// text-hash method this returns true unconditionally; the gate happens
    /// after OCR via [`ChangeDetector::text_changed`].
    pub fn frame_changed(&self, previous: Option<&FrameSnapshot>, current: &FrameSnapshot) -> bool {
        let Some(previous) = previous else {
            return true;
        };

        // Degenerate frame: nothing to compare against
        if current.width == 0 || current.height == 0 {
            return false;
        }

        // Geometry changed, so the content did too
        if previous.dimensions() != current.dimensions() {
            return true;
        }

        let ratio = match self.method {
            ComparisonMethod::PixelDiff => {
                pixel_diff_ratio(&previous.to_intensity(), &current.to_intensity())
            }
            ComparisonMethod::Ssim => {
                let score = ssim_score(&previous.to_intensity(), &current.to_intensity());
                1.0 - (score + 1.0) / 2.0
            }
            ComparisonMethod::Histogram => {
                histogram_ratio(&previous.to_intensity(), &current.to_intensity())
            }
            ComparisonMethod::TextHash => return true,
        };

        let ratio = ratio.clamp(0.0, 1.0);
        debug!(method = ?self.method, ratio, threshold = self.threshold, "frame comparison");

        ratio > self.threshold as f64
    }

    /// Compare OCR output against the previously stored text hash
    ///
    /// The stored hash is updated only when it differs; the first call with
    /// no prior hash always reports a change.
    pub fn text_changed(&mut self, blocks: &[TextBlock]) -> bool {
        let hash = text_position_hash(blocks);

        match self.last_text_hash {
            Some(prev) if prev == hash => false,
            _ => {
                self.last_text_hash = Some(hash);
                true
            }
        }
    }

    /// Forget any stored comparison state
    pub fn reset(&mut self) {
        self.last_text_hash = None;
    }
}

/// Ratio of pixels whose binarized absolute difference is non-zero
fn pixel_diff_ratio(last: &GrayImage, current: &GrayImage) -> f64 {
    let total = current.width() as u64 * current.height() as u64;
    if total == 0 {
        return 0.0;
    }

    let changed = current
        .pixels()
        .zip(last.pixels())
        .filter(|(c, l)| c.0[0] != l.0[0])
        .count() as u64;

    changed as f64 / total as f64
}

/// Mean structural similarity over non-overlapping windows, in [-1, 1]
fn ssim_score(last: &GrayImage, current: &GrayImage) -> f64 {
    let (width, height) = current.dimensions();
    if width == 0 || height == 0 {
        return 1.0;
    }

    // Standard SSIM stabilizers for 8-bit dynamic range
    let c1 = (0.01f64 * 255.0).powi(2);
    let c2 = (0.03f64 * 255.0).powi(2);

    let mut total = 0.0;
    let mut windows = 0u64;

    let mut wy = 0;
    while wy < height {
        let wh = SSIM_WINDOW.min(height - wy);
        let mut wx = 0;
        while wx < width {
            let ww = SSIM_WINDOW.min(width - wx);
            let n = (ww * wh) as f64;

            let mut sum_a = 0.0;
            let mut sum_b = 0.0;
            let mut sum_a2 = 0.0;
            let mut sum_b2 = 0.0;
            let mut sum_ab = 0.0;

            for y in wy..wy + wh {
                for x in wx..wx + ww {
                    let a = current.get_pixel(x, y).0[0] as f64;
                    let b = last.get_pixel(x, y).0[0] as f64;
                    sum_a += a;
                    sum_b += b;
                    sum_a2 += a * a;
                    sum_b2 += b * b;
                    sum_ab += a * b;
                }
            }

            let mean_a = sum_a / n;
            let mean_b = sum_b / n;
            let var_a = sum_a2 / n - mean_a * mean_a;
            let var_b = sum_b2 / n - mean_b * mean_b;
            let cov = sum_ab / n - mean_a * mean_b;

            let numerator = (2.0 * mean_a * mean_b + c1) * (2.0 * cov + c2);
            let denominator = (mean_a * mean_a + mean_b * mean_b + c1) * (var_a + var_b + c2);

            total += numerator / denominator;
            windows += 1;

            wx += SSIM_WINDOW;
        }
        wy += SSIM_WINDOW;
    }

    total / windows as f64
}

/// Normalized sum of absolute per-bin histogram differences
fn histogram_ratio(last: &GrayImage, current: &GrayImage) -> f64 {
    let current_hist = intensity_histogram(current);
    let last_hist = intensity_histogram(last);

    let mut diff = 0u64;
    let mut max_sum = 0u64;
    for (c, l) in current_hist.iter().zip(last_hist.iter()) {
        diff += c.abs_diff(*l);
        max_sum += (*c).max(*l);
    }

    if max_sum == 0 {
        0.0
    } else {
        diff as f64 / max_sum as f64
    }
}

/// 256-bin intensity histogram
fn intensity_histogram(image: &GrayImage) -> [u64; 256] {
    let mut hist = [0u64; 256];
    for pixel in image.pixels() {
        hist[pixel.0[0] as usize] += 1;
    }
    hist
}

/// Hash text content and positions of every block
fn text_position_hash(blocks: &[TextBlock]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for block in blocks {
        block.text.hash(&mut hasher);
        block.x.hash(&mut hasher);
        block.y.hash(&mut hasher);
    }
    hasher.finish()
}
