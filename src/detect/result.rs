use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};

/// Axis-aligned box in frame pixel coordinates.
///
/// Only constructible with `x1 < x2` and `y1 < y2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Option<Self> {
        if x1 < x2 && y1 < y2 {
            Some(Self { x1, y1, x2, y2 })
        } else {
            None
        }
    }

    pub fn x1(&self) -> i32 {
        self.x1
    }

    pub fn y1(&self) -> i32 {
        self.y1
    }

    pub fn x2(&self) -> i32 {
        self.x2
    }

    pub fn y2(&self) -> i32 {
        self.y2
    }

    pub fn corners(&self) -> (i32, i32, i32, i32) {
        (self.x1, self.y1, self.x2, self.y2)
    }
}

// Serialized as `[x1, y1, x2, y2]`.
impl Serialize for BoundingBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(4)?;
        tuple.serialize_element(&self.x1)?;
        tuple.serialize_element(&self.y1)?;
        tuple.serialize_element(&self.x2)?;
        tuple.serialize_element(&self.y2)?;
        tuple.end()
    }
}

/// One labeled box produced by a detector for a single frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    label: String,
    /// Unrounded model score in [0, 1]. Rounded only when shown or sent.
    #[serde(serialize_with = "serialize_rounded")]
    confidence: f32,
    bbox: BoundingBox,
}

impl Detection {
    /// Confidence is clamped into [0, 1]; NaN becomes 0.
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn rounded_confidence(&self) -> f64 {
        round2(self.confidence)
    }

    /// Overlay caption, e.g. `chair (0.87)`.
    pub fn caption(&self) -> String {
        format!("{} ({:.2})", self.label, self.rounded_confidence())
    }
}

fn round2(value: f32) -> f64 {
    (value as f64 * 100.0).round() / 100.0
}

fn serialize_rounded<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round2(*value))
}
