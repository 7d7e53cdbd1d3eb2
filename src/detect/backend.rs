use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Object detector backend.
///
/// Implementations map one frame to an ordered list of detections. The order is
/// whatever the underlying model produces; callers must not assume sorting.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// The frame is borrowed read-only. For a fixed model and frame the result
    /// must be the same on every call. Every returned detection satisfies
    /// `x1 < x2`, `y1 < y2` and `0.0 <= confidence <= 1.0`.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
