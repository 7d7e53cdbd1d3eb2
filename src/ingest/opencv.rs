//! OpenCV VideoCapture source, addressed by device index.

use anyhow::{anyhow, Context, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};

use super::normalize::{normalize_to_rgb, PixelFormat};
use super::{FrameSource, SourceStats};
use crate::frame::Frame;

pub struct OpencvSource {
    index: i32,
    width: u32,
    height: u32,
    capture: Option<VideoCapture>,
    frame_count: u64,
    last_error: Option<String>,
}

impl OpencvSource {
    pub fn new(index: i32, width: u32, height: u32) -> Self {
        Self {
            index,
            width,
            height,
            capture: None,
            frame_count: 0,
            last_error: None,
        }
    }
}

impl FrameSource for OpencvSource {
    fn describe(&self) -> String {
        format!("opencv:{}", self.index)
    }

    fn connect(&mut self) -> Result<()> {
        let mut capture = VideoCapture::new(self.index, videoio::CAP_ANY)
            .with_context(|| format!("open capture device {}", self.index))?;
        if !capture.is_opened()? {
            return Err(anyhow!("failed to open capture device {}", self.index));
        }
        // Size hints are best effort; the driver may ignore them.
        let _ = capture.set(videoio::CAP_PROP_FRAME_WIDTH, self.width as f64);
        let _ = capture.set(videoio::CAP_PROP_FRAME_HEIGHT, self.height as f64);
        self.capture = Some(capture);
        log::info!("OpencvSource: connected to device {}", self.index);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| anyhow!("opencv source not connected; call connect() first"))?;
        let mut mat = Mat::default();
        let grabbed = capture.read(&mut mat).context("read capture frame")?;
        if !grabbed || mat.empty() {
            self.last_error = Some("empty frame".to_string());
            return Ok(None);
        }

        let width = mat.cols() as u32;
        let height = mat.rows() as u32;
        let bytes = mat.data_bytes().context("access frame bytes")?;
        let (pixels, width, height) = normalize_to_rgb(bytes, width, height, PixelFormat::Bgr24)?;

        self.frame_count += 1;
        Ok(Some(Frame::from_rgb(pixels, width, height, self.frame_count)?))
    }

    fn is_healthy(&self) -> bool {
        self.capture.is_some() && self.last_error.is_none()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.describe(),
        }
    }

    fn release(&mut self) -> Result<()> {
        if let Some(mut capture) = self.capture.take() {
            capture.release().context("release capture device")?;
            log::info!("OpencvSource: released device {}", self.index);
        }
        Ok(())
    }
}
