use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::DetectorSettings;
use crate::ingest::CaptureSettings;
use crate::recommend::RecommendationSettings;
use crate::session::SessionOptions;

const DEFAULT_CAMERA: &str = "0";
const DEFAULT_CAPTURE_WIDTH: u32 = 640;
const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
const DEFAULT_CAPTURE_FPS: u32 = 30;
const DEFAULT_DETECTOR: &str = "tract";
const DEFAULT_MODEL_PATH: &str = "models/yolov8n.onnx";
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
const DEFAULT_NMS_THRESHOLD: f32 = 0.7;
const DEFAULT_API_URL: &str = "https://api.gemini.com/analyze";
const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WINDOW_TITLE: &str = "Room Object Detection";
const DEFAULT_KEY_POLL_MS: u64 = 1;

#[derive(Debug, Deserialize, Default)]
struct RoomscanConfigFile {
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    api: Option<ApiConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<String>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    confidence_threshold: Option<f32>,
    nms_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    url: Option<String>,
    key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    window_title: Option<String>,
    key_poll_ms: Option<u64>,
    headless: Option<bool>,
    max_frames: Option<u64>,
}

/// Everything a session is built from. Passed explicitly to each component.
#[derive(Debug, Clone)]
pub struct RoomscanConfig {
    pub capture: CaptureSettings,
    pub detector: DetectorSettings,
    pub api: RecommendationSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub window_title: String,
    pub key_poll: Duration,
    pub headless: bool,
    pub max_frames: Option<u64>,
}

impl DisplaySettings {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            key_poll: self.key_poll,
            max_frames: self.max_frames,
        }
    }
}

/// Command-line overrides, applied after the file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub camera: Option<String>,
    pub model_path: Option<String>,
    pub headless: bool,
    pub max_frames: Option<u64>,
}

impl RoomscanConfig {
    /// Load from `path` (or `ROOMSCAN_CONFIG`), then apply `ROOMSCAN_*` env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("ROOMSCAN_CONFIG").ok().map(PathBuf::from));
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: RoomscanConfigFile) -> Self {
        let camera = file.camera.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let api = file.api.unwrap_or_default();
        let display = file.display.unwrap_or_default();
        Self {
            capture: CaptureSettings {
                camera: camera.device.unwrap_or_else(|| DEFAULT_CAMERA.to_string()),
                width: camera.width.unwrap_or(DEFAULT_CAPTURE_WIDTH),
                height: camera.height.unwrap_or(DEFAULT_CAPTURE_HEIGHT),
                target_fps: camera.target_fps.unwrap_or(DEFAULT_CAPTURE_FPS),
            },
            detector: DetectorSettings {
                backend: detector
                    .backend
                    .unwrap_or_else(|| DEFAULT_DETECTOR.to_string()),
                model_path: detector
                    .model_path
                    .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string()),
                input_width: detector.input_width.unwrap_or(DEFAULT_INPUT_SIZE),
                input_height: detector.input_height.unwrap_or(DEFAULT_INPUT_SIZE),
                confidence_threshold: detector
                    .confidence_threshold
                    .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
                nms_threshold: detector.nms_threshold.unwrap_or(DEFAULT_NMS_THRESHOLD),
            },
            api: RecommendationSettings {
                endpoint: api.url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                api_key: api.key.unwrap_or_default(),
                timeout: Duration::from_secs(api.timeout_secs.unwrap_or(DEFAULT_API_TIMEOUT_SECS)),
            },
            display: DisplaySettings {
                window_title: display
                    .window_title
                    .unwrap_or_else(|| DEFAULT_WINDOW_TITLE.to_string()),
                key_poll: Duration::from_millis(display.key_poll_ms.unwrap_or(DEFAULT_KEY_POLL_MS)),
                headless: display.headless.unwrap_or(false),
                max_frames: display.max_frames,
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(camera) = non_empty_env("ROOMSCAN_CAMERA") {
            self.capture.camera = camera;
        }
        if let Some(model) = non_empty_env("ROOMSCAN_MODEL_PATH") {
            self.detector.model_path = model;
        }
        if let Some(backend) = non_empty_env("ROOMSCAN_DETECTOR") {
            self.detector.backend = backend;
        }
        if let Some(url) = non_empty_env("ROOMSCAN_API_URL") {
            self.api.endpoint = url;
        }
        if let Some(key) = non_empty_env("ROOMSCAN_API_KEY") {
            self.api.api_key = key;
        }
        if let Some(timeout) = non_empty_env("ROOMSCAN_API_TIMEOUT_SECS") {
            let seconds: u64 = timeout.parse().map_err(|_| {
                anyhow!("ROOMSCAN_API_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.api.timeout = Duration::from_secs(seconds);
        }
        if let Some(headless) = non_empty_env("ROOMSCAN_HEADLESS") {
            self.display.headless = parse_bool(&headless)
                .ok_or_else(|| anyhow!("ROOMSCAN_HEADLESS must be true/false or 1/0"))?;
        }
        Ok(())
    }

    /// Apply command-line flags and re-validate.
    pub fn apply_cli(&mut self, overrides: &CliOverrides) -> Result<()> {
        if let Some(camera) = &overrides.camera {
            self.capture.camera = camera.clone();
        }
        if let Some(model) = &overrides.model_path {
            self.detector.model_path = model.clone();
        }
        if overrides.headless {
            self.display.headless = true;
        }
        if overrides.max_frames.is_some() {
            self.display.max_frames = overrides.max_frames;
        }
        self.validate()
    }

    fn validate(&mut self) -> Result<()> {
        self.capture.camera = self.capture.camera.trim().to_string();
        if self.capture.camera.is_empty() {
            return Err(anyhow!("camera must not be empty"));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow!("capture width and height must be greater than zero"));
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return Err(anyhow!("detector input size must be greater than zero"));
        }
        for (name, value) in [
            ("confidence_threshold", self.detector.confidence_threshold),
            ("nms_threshold", self.detector.nms_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
            }
        }
        let endpoint = self.api.endpoint.trim().to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(anyhow!("api url must use http:// or https:// (got '{}')", endpoint));
        }
        self.api.endpoint = endpoint;
        if self.api.timeout.is_zero() {
            return Err(anyhow!("api timeout must be greater than zero"));
        }
        if self.api.api_key.is_empty() {
            log::warn!("ROOMSCAN_API_KEY is not set; recommendation requests will likely be rejected");
        }
        if self.display.max_frames == Some(0) {
            return Err(anyhow!("max_frames must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<RoomscanConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
