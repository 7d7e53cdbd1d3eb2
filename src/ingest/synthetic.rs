//! Synthetic frame source.
//!
//! `stub://name` produces a moving gradient forever; `stub://name?frames=N`
//! ends the stream after N frames. Used for headless demos and tests.

use anyhow::{anyhow, Result};

use super::{FrameSource, SourceStats};
use crate::frame::Frame;

/// Configuration for a synthetic source.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Number of frames before end of stream. `None` means unbounded.
    pub frame_limit: Option<u64>,
}

impl SyntheticConfig {
    /// Parse a `stub://name[?frames=N]` locator.
    pub fn parse(locator: &str, width: u32, height: u32) -> Result<Self> {
        let rest = locator
            .strip_prefix("stub://")
            .ok_or_else(|| anyhow!("synthetic camera must use stub:// (got '{}')", locator))?;
        let (name, query) = match rest.split_once('?') {
            Some((name, query)) => (name, Some(query)),
            None => (rest, None),
        };
        let mut frame_limit = None;
        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            match pair.split_once('=') {
                Some(("frames", value)) => {
                    let limit = value
                        .parse::<u64>()
                        .map_err(|_| anyhow!("stub frames must be an integer, got '{}'", value))?;
                    frame_limit = Some(limit);
                }
                _ => return Err(anyhow!("unsupported stub option '{}'", pair)),
            }
        }
        if width == 0 || height == 0 {
            return Err(anyhow!("synthetic frame size must be non-zero"));
        }
        Ok(Self {
            name: name.to_string(),
            width,
            height,
            frame_limit,
        })
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    connected: bool,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            connected: false,
            frame_count: 0,
            scene_state: 0,
        }
    }

    fn generate_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (self.config.width * self.config.height * 3) as usize;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn describe(&self) -> String {
        format!("stub://{}", self.config.name)
    }

    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!("SyntheticSource: connected to {}", self.describe());
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.connected {
            return Err(anyhow!("synthetic source not connected; call connect() first"));
        }
        if let Some(limit) = self.config.frame_limit {
            if self.frame_count >= limit {
                return Ok(None);
            }
        }
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        let frame = Frame::from_rgb(
            pixels,
            self.config.width,
            self.config.height,
            self.frame_count,
        )?;
        Ok(Some(frame))
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.describe(),
        }
    }

    fn release(&mut self) -> Result<()> {
        self.connected = false;
        log::debug!("SyntheticSource: released {}", self.describe());
        Ok(())
    }
}
