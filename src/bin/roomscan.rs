//! roomscan - live room object detection with on-demand renovation suggestions
//!
//! Keys (in the video window):
//!   r  send the current detections for recommendations
//!   q  quit

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use roomscan::config::{CliOverrides, DisplaySettings, RoomscanConfig};
use roomscan::display::{Display, HeadlessDisplay};
use roomscan::{build_detector, launch, open_source, HttpRecommendationClient, SessionEnd};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "ROOMSCAN_CONFIG")]
    config: Option<PathBuf>,
    /// Camera: device index, device path, or stub://name[?frames=N].
    #[arg(long)]
    camera: Option<String>,
    /// ONNX model path.
    #[arg(long)]
    model: Option<String>,
    /// Run without a window (no key input).
    #[arg(long)]
    headless: bool,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = RoomscanConfig::load(args.config.as_deref())?;
    cfg.apply_cli(&CliOverrides {
        camera: args.camera,
        model_path: args.model,
        headless: args.headless,
        max_frames: args.max_frames,
    })?;
    log::debug!("config: {:?}", cfg);

    let detector = build_detector(&cfg.detector)?;
    let client = HttpRecommendationClient::new(&cfg.api);
    log::info!("recommendation endpoint: {}", client.endpoint());

    let capture = cfg.capture.clone();
    let display = cfg.display.clone();
    let report = launch(
        || open_source(&capture),
        || open_display(&display),
        detector,
        Box::new(client),
        Box::new(std::io::stdout()),
        cfg.display.session_options(),
    )?;

    match &report.end {
        SessionEnd::CaptureFailed(reason) => log::warn!("session ended: {}", reason),
        end => log::info!("session ended: {:?}", end),
    }
    log::info!(
        "frames={} recommendations ok={} failed={}",
        report.frames_rendered,
        report.recommendations_succeeded,
        report.recommendations_failed
    );
    Ok(())
}

#[cfg(feature = "display-highgui")]
fn open_display(settings: &DisplaySettings) -> Result<Box<dyn Display>> {
    if settings.headless {
        return Ok(Box::new(HeadlessDisplay::new()));
    }
    Ok(Box::new(roomscan::display::HighguiDisplay::new(
        &settings.window_title,
    )?))
}

#[cfg(not(feature = "display-highgui"))]
fn open_display(settings: &DisplaySettings) -> Result<Box<dyn Display>> {
    if !settings.headless {
        log::warn!("built without display-highgui; running headless");
    }
    Ok(Box::new(HeadlessDisplay::new()))
}
