//! Frame data structures for captured screen content

use image::{GrayImage, Luma};
use std::time::Instant;

/// A captured frame from the screen
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Timestamp when the frame was captured
    pub timestamp: Instant,
}

impl FrameSnapshot {
    /// Create a new frame snapshot
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Total pixel count
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Convert the RGBA buffer to a single-channel intensity image
    pub fn to_intensity(&self) -> GrayImage {
        let mut gray = GrayImage::new(self.width, self.height);

        for y in 0..self.height {
            for x in 0..self.width {
                let idx = ((y * self.width + x) * 4) as usize;
                if idx + 2 < self.data.len() {
                    let r = self.data[idx] as f32;
                    let g = self.data[idx + 1] as f32;
                    let b = self.data[idx + 2] as f32;
                    // Standard grayscale conversion
                    let gray_val = (0.299 * r + 0.587 * g + 0.114 * b) as u8;
                    gray.put_pixel(x, y, Luma([gray_val]));
                }
            }
        }

        gray
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let frame = FrameSnapshot::new(vec![0u8; 2 * 3 * 4], 2, 3);
        assert_eq!(frame.dimensions(), (2, 3));
        assert_eq!(frame.pixel_count(), 6);
    }

    #[test]
    fn test_to_intensity() {
        // One red and one green pixel (RGBA)
        let data = vec![255, 0, 0, 255, 0, 255, 0, 255];
        let frame = FrameSnapshot::new(data, 2, 1);

        let gray = frame.to_intensity();
        let red_gray = gray.get_pixel(0, 0).0[0];
        let green_gray = gray.get_pixel(1, 0).0[0];

        assert!(
            green_gray > red_gray,
            "Green should be brighter than red in grayscale"
        );
    }
}
