//! Room scanner.
//!
//! Captures live video, runs object detection on every frame, draws the
//! detections and, when the user presses `r`, sends the current detection list
//! to a remote service for renovation recommendations.
//!
//! # Module Structure
//!
//! - `ingest`: Frame sources (synthetic, V4L2, OpenCV)
//! - `detect`: Detection types, detector backends, YOLO post-processing
//! - `overlay`: Box and caption rendering
//! - `display`: Window surfaces and key signals
//! - `recommend`: Recommendation client contract and HTTP implementation
//! - `session`: The single-threaded capture/render loop
//! - `config`: File, environment and CLI configuration

pub mod config;
pub mod detect;
pub mod display;
pub mod frame;
pub mod ingest;
pub mod overlay;
pub mod recommend;
pub mod session;

pub use config::{CliOverrides, DisplaySettings, RoomscanConfig};
pub use detect::{build_detector, BoundingBox, Detection, DetectorBackend, DetectorSettings};
pub use display::{Display, HeadlessDisplay, KeySignal};
pub use frame::{DisplayBuffer, Frame};
pub use ingest::{open_source, CaptureSettings, FrameSource, SourceStats};
pub use recommend::{
    HttpRecommendationClient, Recommendation, RecommendError, RecommendationClient,
    RecommendationSettings,
};
pub use session::{launch, Session, SessionEnd, SessionOptions, SessionReport};
