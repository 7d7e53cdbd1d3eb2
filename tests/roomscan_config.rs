use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::{Builder, NamedTempFile};

use roomscan::config::{CliOverrides, RoomscanConfig};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "ROOMSCAN_CONFIG",
        "ROOMSCAN_CAMERA",
        "ROOMSCAN_MODEL_PATH",
        "ROOMSCAN_DETECTOR",
        "ROOMSCAN_API_URL",
        "ROOMSCAN_API_KEY",
        "ROOMSCAN_API_TIMEOUT_SECS",
        "ROOMSCAN_HEADLESS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = RoomscanConfig::load(None).expect("load defaults");
    assert_eq!(cfg.capture.camera, "0");
    assert_eq!(cfg.detector.backend, "tract");
    assert_eq!(cfg.detector.model_path, "models/yolov8n.onnx");
    assert_eq!(cfg.api.endpoint, "https://api.gemini.com/analyze");
    assert!(cfg.api.api_key.is_empty());
    assert_eq!(cfg.api.timeout, Duration::from_secs(30));
    assert_eq!(cfg.display.window_title, "Room Object Detection");
    assert_eq!(cfg.display.key_poll, Duration::from_millis(1));
    assert!(!cfg.display.headless);
    assert_eq!(cfg.display.max_frames, None);
}

#[test]
fn loads_json_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "camera": { "device": "/dev/video2", "width": 1280, "height": 720 },
        "detector": { "backend": "stub", "confidence_threshold": 0.4 },
        "api": { "url": "http://localhost:8080/analyze", "key": "from-file", "timeout_secs": 5 },
        "display": { "window_title": "Den", "max_frames": 50 }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("ROOMSCAN_CONFIG", file.path());
    std::env::set_var("ROOMSCAN_API_KEY", "from-env");
    std::env::set_var("ROOMSCAN_HEADLESS", "yes");

    let cfg = RoomscanConfig::load(None).expect("load config");
    assert_eq!(cfg.capture.camera, "/dev/video2");
    assert_eq!((cfg.capture.width, cfg.capture.height), (1280, 720));
    assert_eq!(cfg.detector.backend, "stub");
    assert!((cfg.detector.confidence_threshold - 0.4).abs() < f32::EPSILON);
    assert_eq!(cfg.api.endpoint, "http://localhost:8080/analyze");
    assert_eq!(cfg.api.api_key, "from-env");
    assert_eq!(cfg.api.timeout, Duration::from_secs(5));
    assert_eq!(cfg.display.window_title, "Den");
    assert_eq!(cfg.display.max_frames, Some(50));
    assert!(cfg.display.headless);

    clear_env();
}

#[test]
fn loads_toml_file_from_explicit_path() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
[camera]
device = "stub://kitchen?frames=10"

[detector]
backend = "stub"
nms_threshold = 0.5

[display]
key_poll_ms = 5
"#;
    file.write_all(toml.as_bytes()).expect("write config");

    let cfg = RoomscanConfig::load(Some(file.path())).expect("load config");
    assert_eq!(cfg.capture.camera, "stub://kitchen?frames=10");
    assert!((cfg.detector.nms_threshold - 0.5).abs() < f32::EPSILON);
    assert_eq!(cfg.display.key_poll, Duration::from_millis(5));
}

#[test]
fn env_overrides_camera_and_model() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ROOMSCAN_CAMERA", "3");
    std::env::set_var("ROOMSCAN_MODEL_PATH", "/opt/models/room.onnx");
    std::env::set_var("ROOMSCAN_DETECTOR", "stub");

    let cfg = RoomscanConfig::load(None).expect("load config");
    assert_eq!(cfg.capture.camera, "3");
    assert_eq!(cfg.detector.model_path, "/opt/models/room.onnx");
    assert_eq!(cfg.detector.backend, "stub");

    clear_env();
}

#[test]
fn rejects_invalid_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ROOMSCAN_API_TIMEOUT_SECS", "soon");
    assert!(RoomscanConfig::load(None).is_err());
    clear_env();

    std::env::set_var("ROOMSCAN_HEADLESS", "maybe");
    assert!(RoomscanConfig::load(None).is_err());
    clear_env();

    std::env::set_var("ROOMSCAN_API_URL", "ftp://example.com/analyze");
    assert!(RoomscanConfig::load(None).is_err());
    clear_env();
}

#[test]
fn rejects_missing_or_malformed_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let dir = tempfile::tempdir().expect("temp dir");
    assert!(RoomscanConfig::load(Some(&dir.path().join("absent.json"))).is_err());

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(b"{ not json").expect("write config");
    assert!(RoomscanConfig::load(Some(file.path())).is_err());
}

#[test]
fn cli_overrides_apply_last() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    std::env::set_var("ROOMSCAN_CAMERA", "1");

    let mut cfg = RoomscanConfig::load(None).expect("load config");
    cfg.apply_cli(&CliOverrides {
        camera: Some("stub://cli".to_string()),
        model_path: None,
        headless: true,
        max_frames: Some(12),
    })
    .expect("apply cli");

    assert_eq!(cfg.capture.camera, "stub://cli");
    assert!(cfg.display.headless);
    assert_eq!(cfg.display.session_options().max_frames, Some(12));

    clear_env();
}
