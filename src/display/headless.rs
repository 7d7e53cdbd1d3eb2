use anyhow::Result;
use image::RgbImage;
use std::time::Duration;

use super::Display;

/// Display that only counts frames. Never reports key presses, so a headless
/// session runs until its source ends.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    frames_shown: u64,
    closed: bool,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Display for HeadlessDisplay {
    fn show(&mut self, image: &RgbImage) -> Result<()> {
        self.frames_shown += 1;
        log::debug!(
            "headless frame #{} ({}x{})",
            self.frames_shown,
            image.width(),
            image.height()
        );
        Ok(())
    }

    fn poll_key(&mut self, _timeout: Duration) -> Result<Option<char>> {
        Ok(None)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        log::info!("headless display closed after {} frames", self.frames_shown);
        Ok(())
    }
}
