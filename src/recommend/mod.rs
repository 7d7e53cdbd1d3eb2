//! Remote renovation recommendations.
//!
//! A `RecommendationClient` turns the current frame's detections into a
//! recommendation payload through one synchronous request/response exchange.
//! There is no retry, backoff or caching: every call is independent.

mod http;

use serde::Serialize;
use thiserror::Error;

use crate::detect::Detection;

pub use http::{HttpRecommendationClient, RecommendationSettings};

/// Task identifier sent with every request.
pub const TASK_ID: &str = "room_renovation_analysis";

/// Request body: `{"objects": [...], "task": "room_renovation_analysis"}`.
#[derive(Debug, Serialize)]
pub struct RecommendationRequest<'a> {
    pub objects: &'a [Detection],
    pub task: &'static str,
}

impl<'a> RecommendationRequest<'a> {
    pub fn new(objects: &'a [Detection]) -> Self {
        Self {
            objects,
            task: TASK_ID,
        }
    }
}

/// Opaque JSON payload returned by the service. Printed and dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct Recommendation(serde_json::Value);

impl Recommendation {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    /// Pretty JSON with 4-space indentation.
    pub fn to_pretty_json(&self) -> String {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        // Serializing a Value into a Vec cannot fail.
        if self.0.serialize(&mut ser).is_err() {
            return self.0.to_string();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Why a recommendation request failed. Neither variant ends the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecommendError {
    /// The service answered with a non-success status (or an unusable body).
    #[error("{status} {body}")]
    Remote { status: u16, body: String },

    /// The request could not be completed (connection, DNS, timeout, I/O).
    #[error("{0}")]
    Transport(String),
}

/// Request/response contract for the recommendation service.
pub trait RecommendationClient {
    fn analyze(&mut self, detections: &[Detection]) -> Result<Recommendation, RecommendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use serde_json::json;

    #[test]
    fn request_has_wire_shape() {
        let dets = vec![Detection::new(
            "chair",
            0.874,
            BoundingBox::new(10, 20, 110, 220).unwrap(),
        )];
        let body = serde_json::to_value(RecommendationRequest::new(&dets)).unwrap();
        assert_eq!(
            body,
            json!({
                "objects": [{"label": "chair", "confidence": 0.87, "bbox": [10, 20, 110, 220]}],
                "task": "room_renovation_analysis"
            })
        );
    }

    #[test]
    fn empty_request_still_names_task() {
        let body = serde_json::to_value(RecommendationRequest::new(&[])).unwrap();
        assert_eq!(body, json!({"objects": [], "task": TASK_ID}));
    }

    #[test]
    fn pretty_json_uses_four_spaces() {
        let rec = Recommendation::new(json!({"suggestions": ["repaint wall"]}));
        assert_eq!(
            rec.to_pretty_json(),
            "{\n    \"suggestions\": [\n        \"repaint wall\"\n    ]\n}"
        );
    }

    #[test]
    fn remote_error_display_includes_body() {
        let err = RecommendError::Remote {
            status: 500,
            body: "\"internal error\"".to_string(),
        };
        assert_eq!(err.to_string(), "500 \"internal error\"");
    }
}
