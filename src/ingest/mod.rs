//! Frame sources.
//!
//! This module provides the sources a session can pull frames from:
//! - Synthetic `stub://` source (demos and tests, always available)
//! - USB/V4L2 devices (feature: ingest-v4l2)
//! - OpenCV VideoCapture devices (feature: ingest-opencv)
//!
//! Every source follows the same lifecycle: construct, `connect()`, then call
//! `next_frame()` until it returns `Ok(None)` (end of stream) or an error. A
//! failed read ends the session; sources do not retry.

#[cfg(any(feature = "ingest-v4l2", feature = "ingest-opencv", test))]
mod normalize;
#[cfg(feature = "ingest-opencv")]
pub mod opencv;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Context, Result};

use crate::frame::Frame;

#[cfg(feature = "ingest-opencv")]
pub use self::opencv::OpencvSource;
pub use synthetic::{SyntheticConfig, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

/// A camera-like producer of consecutive frames.
pub trait FrameSource {
    /// Human-readable source identifier for logs.
    fn describe(&self) -> String;

    /// Open the underlying device. Must be called before `next_frame`.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame. `Ok(None)` signals end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Check if the source is healthy.
    fn is_healthy(&self) -> bool;

    /// Get frame statistics.
    fn stats(&self) -> SourceStats;

    /// Release the device handle. Called once when the session terminates.
    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Statistics for a frame source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}

/// Capture settings shared by all device sources.
#[derive(Clone, Debug)]
pub struct CaptureSettings {
    /// `stub://name[?frames=N]`, a device index (`0`) or a device path (`/dev/video0`).
    pub camera: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            camera: "0".to_string(),
            width: 640,
            height: 480,
            target_fps: 30,
        }
    }
}

/// Build and connect the source named by `settings.camera`.
///
/// An error here is a capture-open failure: the caller must end the session
/// without processing frames.
pub fn open_source(settings: &CaptureSettings) -> Result<Box<dyn FrameSource>> {
    let camera = settings.camera.trim();
    if camera.is_empty() {
        return Err(anyhow!("camera must not be empty"));
    }
    let mut source: Box<dyn FrameSource> = if camera.starts_with("stub://") {
        Box::new(SyntheticSource::new(SyntheticConfig::parse(
            camera,
            settings.width,
            settings.height,
        )?))
    } else {
        open_device(camera, settings)?
    };
    source
        .connect()
        .with_context(|| format!("open camera {}", source.describe()))?;
    log::info!("capture source ready: {}", source.describe());
    Ok(source)
}

#[cfg(feature = "ingest-v4l2")]
fn open_device(camera: &str, settings: &CaptureSettings) -> Result<Box<dyn FrameSource>> {
    let device = match camera.parse::<u32>() {
        Ok(index) => format!("/dev/video{}", index),
        Err(_) => camera.to_string(),
    };
    Ok(Box::new(V4l2Source::new(V4l2Config {
        device,
        target_fps: settings.target_fps,
        width: settings.width,
        height: settings.height,
    })?))
}

#[cfg(all(feature = "ingest-opencv", not(feature = "ingest-v4l2")))]
fn open_device(camera: &str, settings: &CaptureSettings) -> Result<Box<dyn FrameSource>> {
    let index = camera
        .parse::<i32>()
        .map_err(|_| anyhow!("opencv capture expects a device index, got '{}'", camera))?;
    Ok(Box::new(OpencvSource::new(index, settings.width, settings.height)))
}

#[cfg(not(any(feature = "ingest-v4l2", feature = "ingest-opencv")))]
fn open_device(camera: &str, _settings: &CaptureSettings) -> Result<Box<dyn FrameSource>> {
    Err(anyhow!(
        "camera '{}' requires the ingest-v4l2 or ingest-opencv feature",
        camera
    ))
}
