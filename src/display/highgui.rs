use anyhow::{Context, Result};
use image::RgbImage;
use opencv::{core::Mat, highgui, prelude::*};
use std::time::Duration;

use super::Display;

/// OpenCV highgui window. Keys are read from the window with `wait_key`.
pub struct HighguiDisplay {
    title: String,
    open: bool,
}

impl HighguiDisplay {
    pub fn new(title: &str) -> Result<Self> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)
            .with_context(|| format!("create window '{}'", title))?;
        Ok(Self {
            title: title.to_string(),
            open: true,
        })
    }
}

impl Display for HighguiDisplay {
    fn show(&mut self, image: &RgbImage) -> Result<()> {
        // highgui expects BGR.
        let mut bgr: Vec<u8> = image
            .as_raw()
            .chunks_exact(3)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect();
        let mat = unsafe {
            Mat::new_rows_cols_with_data_unsafe(
                image.height() as i32,
                image.width() as i32,
                opencv::core::CV_8UC3,
                bgr.as_mut_ptr().cast(),
                opencv::core::Mat_AUTO_STEP,
            )
        }
        .context("wrap frame for display")?;
        highgui::imshow(&self.title, &mat).context("show frame")?;
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>> {
        let millis = timeout.as_millis().clamp(1, i32::MAX as u128) as i32;
        let key = highgui::wait_key(millis).context("poll window key")?;
        if key < 0 {
            return Ok(None);
        }
        Ok(Some(char::from((key & 0xFF) as u8)))
    }

    fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            highgui::destroy_window(&self.title).context("destroy window")?;
        }
        Ok(())
    }
}

impl Drop for HighguiDisplay {
    fn drop(&mut self) {
        if self.open {
            let _ = highgui::destroy_window(&self.title);
        }
    }
}
