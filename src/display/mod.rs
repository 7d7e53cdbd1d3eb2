//! Display surfaces and key input.
//!
//! A display shows one rendered frame per iteration and is polled once per
//! iteration for a key press. The single key is classified into a `KeySignal`.

mod headless;
#[cfg(feature = "display-highgui")]
mod highgui;

use anyhow::Result;
use image::RgbImage;
use std::time::Duration;

pub use headless::HeadlessDisplay;
#[cfg(feature = "display-highgui")]
pub use highgui::HighguiDisplay;

pub const RECOMMEND_KEY: char = 'r';
pub const QUIT_KEY: char = 'q';

/// User intent derived from one key poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeySignal {
    RequestRecommendations,
    Quit,
}

impl KeySignal {
    /// Classify a polled key. Any other key (or none) carries no signal.
    pub fn classify(key: Option<char>) -> Option<Self> {
        match key? {
            RECOMMEND_KEY => Some(KeySignal::RequestRecommendations),
            QUIT_KEY => Some(KeySignal::Quit),
            _ => None,
        }
    }
}

/// Window-like surface owned by the session.
pub trait Display {
    /// Show a rendered frame.
    fn show(&mut self, image: &RgbImage) -> Result<()>;

    /// Wait up to `timeout` for a key press.
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>>;

    /// Tear down the surface. Called once when the session terminates.
    fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_keys_only() {
        assert_eq!(
            KeySignal::classify(Some('r')),
            Some(KeySignal::RequestRecommendations)
        );
        assert_eq!(KeySignal::classify(Some('q')), Some(KeySignal::Quit));
        assert_eq!(KeySignal::classify(Some('Q')), None);
        assert_eq!(KeySignal::classify(Some('x')), None);
        assert_eq!(KeySignal::classify(None), None);
    }
}
