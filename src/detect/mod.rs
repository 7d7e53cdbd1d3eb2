mod backend;
mod backends;
pub mod labels;
mod result;
pub mod yolo;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{BoundingBox, Detection};

use anyhow::{anyhow, Result};

/// Detector selection, as named in configuration.
#[derive(Clone, Debug)]
pub struct DetectorSettings {
    /// `tract` or `stub`.
    pub backend: String,
    pub model_path: String,
    pub input_width: u32,
    pub input_height: u32,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
}

/// Build the configured backend and run its warm-up hook.
pub fn build_detector(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    let mut detector: Box<dyn DetectorBackend> = match settings.backend.as_str() {
        "stub" => Box::new(StubBackend::centered("chair", 0.87)),
        "tract" => tract_backend(settings)?,
        other => return Err(anyhow!("unknown detector backend '{}'", other)),
    };
    detector.warm_up()?;
    log::info!("detector ready: {}", detector.name());
    Ok(detector)
}

#[cfg(feature = "backend-tract")]
fn tract_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    let backend = TractBackend::new(
        &settings.model_path,
        settings.input_width,
        settings.input_height,
    )?
    .with_threshold(settings.confidence_threshold)
    .with_nms_threshold(settings.nms_threshold);
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn tract_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!(
        "detector 'tract' (model {}) requires the backend-tract feature",
        settings.model_path
    ))
}
