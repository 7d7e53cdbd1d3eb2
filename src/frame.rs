//! Captured frames.
//!
//! - `Frame`: one still image captured from a source, owned by the loop iteration
//!   that produced it. Detectors borrow it immutably.
//! - `DisplayBuffer`: the frame's pixels once handed to the overlay stage. Overlays
//!   are drawn here and the buffer is dropped after display.

use anyhow::{anyhow, Result};
use image::RgbImage;
use std::time::Instant;

/// One captured RGB frame.
///
/// Pixels are stored row-major, 3 bytes per pixel. There is no interior
/// mutability: anything holding `&Frame` observes the pixels exactly as captured.
pub struct Frame {
    image: RgbImage,
    /// Sequence number assigned by the source (1-based).
    pub sequence: u64,
    /// Capture instant, used only for diagnostics.
    pub captured_at: Instant,
}

impl Frame {
    /// Build a frame from packed RGB24 bytes.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", width, height))?;
        Ok(Self::from_image(image, sequence))
    }

    pub fn from_image(image: RgbImage, sequence: u64) -> Self {
        Self {
            image,
            sequence,
            captured_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Read-only pixel access for detectors.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Packed RGB24 bytes.
    pub fn as_rgb(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Hand the pixels over to the render stage.
    ///
    /// Consumes the frame, so overlays can never leak back into a detector input.
    pub fn into_display(self) -> DisplayBuffer {
        DisplayBuffer {
            image: self.image,
            sequence: self.sequence,
        }
    }
}

/// Render target for one iteration. Dropped once the window has shown it.
pub struct DisplayBuffer {
    image: RgbImage,
    pub sequence: u64,
}

impl DisplayBuffer {
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}
