use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};
use crate::frame::Frame;

enum Script {
    Fixed(Vec<Detection>),
    Centered { label: String, confidence: f32 },
}

/// Deterministic backend for demos and tests. Never looks at pixel values.
pub struct StubBackend {
    script: Script,
}

impl StubBackend {
    /// Backend that never detects anything.
    pub fn new() -> Self {
        Self::with_detections(Vec::new())
    }

    /// Backend that returns the same detections for every frame.
    pub fn with_detections(detections: Vec<Detection>) -> Self {
        Self {
            script: Script::Fixed(detections),
        }
    }

    /// Backend that reports one object covering the middle half of each frame.
    pub fn centered(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            script: Script::Centered {
                label: label.into(),
                confidence,
            },
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        match &self.script {
            Script::Fixed(detections) => Ok(detections.clone()),
            Script::Centered { label, confidence } => {
                let (w, h) = (frame.width() as i32, frame.height() as i32);
                let bbox = BoundingBox::new(w / 4, h / 4, w - w / 4, h - h / 4);
                Ok(bbox
                    .map(|bbox| Detection::new(label.clone(), *confidence, bbox))
                    .into_iter()
                    .collect())
            }
        }
    }
}
