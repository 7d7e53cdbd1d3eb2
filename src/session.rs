//! The capture → detect → draw → display → poll loop.
//!
//! A `Session` exclusively owns the frame source and the display surface. Each
//! iteration runs to completion before the next begins; the only blocking steps
//! are frame capture, inference and a requested recommendation call. Both owned
//! resources are released on every exit path.

use anyhow::{Context, Result};
use std::io::Write;
use std::time::{Duration, Instant};

use crate::detect::{Detection, DetectorBackend};
use crate::display::{Display, KeySignal, QUIT_KEY};
use crate::ingest::FrameSource;
use crate::overlay;
use crate::recommend::RecommendationClient;

#[derive(Clone, Copy, Debug)]
pub struct SessionOptions {
    /// How long each iteration waits for a key.
    pub key_poll: Duration,
    /// Stop after this many rendered frames. `None` runs until quit or end of stream.
    pub max_frames: Option<u64>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            key_poll: Duration::from_millis(1),
            max_frames: None,
        }
    }
}

/// Why the session stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user pressed the quit key.
    Quit,
    /// The source ran out of frames, or the frame limit was reached.
    EndOfStream,
    /// The camera could not be opened or a read failed.
    CaptureFailed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub frames_rendered: u64,
    pub recommendations_requested: u64,
    pub recommendations_succeeded: u64,
    pub recommendations_failed: u64,
    pub end: SessionEnd,
}

impl SessionReport {
    fn empty(end: SessionEnd) -> Self {
        Self {
            frames_rendered: 0,
            recommendations_requested: 0,
            recommendations_succeeded: 0,
            recommendations_failed: 0,
            end,
        }
    }
}

enum LoopState {
    Running,
    Terminated(SessionEnd),
}

pub struct Session {
    source: Box<dyn FrameSource>,
    detector: Box<dyn DetectorBackend>,
    display: Box<dyn Display>,
    client: Box<dyn RecommendationClient>,
    console: Box<dyn Write>,
    options: SessionOptions,
    report: SessionReport,
}

impl Session {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn DetectorBackend>,
        display: Box<dyn Display>,
        client: Box<dyn RecommendationClient>,
    ) -> Self {
        Self {
            source,
            detector,
            display,
            client,
            console: Box::new(std::io::stdout()),
            options: SessionOptions::default(),
            report: SessionReport::empty(SessionEnd::EndOfStream),
        }
    }

    /// Redirect user-facing console output (stdout by default).
    pub fn with_console(mut self, console: Box<dyn Write>) -> Self {
        self.console = console;
        self
    }

    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Run until quit, end of stream or capture failure, then release resources.
    ///
    /// Detector, display and console failures are returned as errors; the
    /// source and display are still released first.
    pub fn run(mut self) -> Result<SessionReport> {
        log::info!(
            "session started: source={} detector={}",
            self.source.describe(),
            self.detector.name()
        );
        let outcome = writeln!(self.console, "Press '{}' to quit.", QUIT_KEY)
            .context("write console")
            .and_then(|_| self.drive());
        self.teardown();

        self.report.end = outcome?;
        log::info!(
            "session ended ({:?}) after {} frames, {} recommendation requests",
            self.report.end,
            self.report.frames_rendered,
            self.report.recommendations_requested
        );
        Ok(self.report)
    }

    fn drive(&mut self) -> Result<SessionEnd> {
        loop {
            if let LoopState::Terminated(end) = self.step()? {
                return Ok(end);
            }
        }
    }

    fn step(&mut self) -> Result<LoopState> {
        if let Some(max) = self.options.max_frames {
            if self.report.frames_rendered >= max {
                return Ok(LoopState::Terminated(SessionEnd::EndOfStream));
            }
        }

        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(LoopState::Terminated(SessionEnd::EndOfStream)),
            Err(err) => {
                let message = format!("{:#}", err);
                log::error!("capture failed: {}", message);
                writeln!(self.console, "Capture failed: {}", message).context("write console")?;
                return Ok(LoopState::Terminated(SessionEnd::CaptureFailed(message)));
            }
        };

        let detections = self.detector.detect(&frame).context("run detector")?;

        let mut buffer = frame.into_display();
        overlay::render(&mut buffer, &detections);
        self.display.show(buffer.image()).context("show frame")?;
        self.report.frames_rendered += 1;
        drop(buffer);

        // One poll per iteration; the single key is classified once.
        let key = self
            .display
            .poll_key(self.options.key_poll)
            .context("poll key")?;
        match KeySignal::classify(key) {
            Some(KeySignal::RequestRecommendations) => {
                self.request_recommendations(&detections)?;
                Ok(LoopState::Running)
            }
            Some(KeySignal::Quit) => Ok(LoopState::Terminated(SessionEnd::Quit)),
            None => Ok(LoopState::Running),
        }
    }

    /// Blocks on the remote call. Failures are reported and the loop continues.
    fn request_recommendations(&mut self, detections: &[Detection]) -> Result<()> {
        self.report.recommendations_requested += 1;
        writeln!(
            self.console,
            "Sending {} detected objects for recommendations...",
            detections.len()
        )
        .context("write console")?;

        let started = Instant::now();
        match self.client.analyze(detections) {
            Ok(recommendation) => {
                self.report.recommendations_succeeded += 1;
                log::info!("recommendations received in {:?}", started.elapsed());
                writeln!(
                    self.console,
                    "\nRenovation Suggestions:\n{}",
                    recommendation.to_pretty_json()
                )
                .context("write console")?;
            }
            Err(err) => {
                self.report.recommendations_failed += 1;
                log::warn!("recommendation request failed: {}", err);
                writeln!(self.console, "Error with recommendation service: {}", err)
                    .context("write console")?;
            }
        }
        self.console.flush().context("flush console")?;
        Ok(())
    }

    fn teardown(&mut self) {
        let stats = self.source.stats();
        log::debug!(
            "releasing {} (captured={}, healthy={})",
            stats.source,
            stats.frames_captured,
            self.source.is_healthy()
        );
        if let Err(err) = self.source.release() {
            log::warn!("failed to release {}: {:#}", self.source.describe(), err);
        }
        if let Err(err) = self.display.close() {
            log::warn!("failed to close display: {:#}", err);
        }
    }
}

/// Open the camera, then the display, then run a session.
///
/// A camera that cannot be opened ends the session before any window is
/// created; this is reported as `SessionEnd::CaptureFailed`, not as an error.
pub fn launch(
    open_source: impl FnOnce() -> Result<Box<dyn FrameSource>>,
    open_display: impl FnOnce() -> Result<Box<dyn Display>>,
    detector: Box<dyn DetectorBackend>,
    client: Box<dyn RecommendationClient>,
    mut console: Box<dyn Write>,
    options: SessionOptions,
) -> Result<SessionReport> {
    let mut source = match open_source() {
        Ok(source) => source,
        Err(err) => {
            let message = format!("{:#}", err);
            log::error!("capture open failed: {}", message);
            writeln!(console, "Failed to open camera: {}", message).context("write console")?;
            return Ok(SessionReport::empty(SessionEnd::CaptureFailed(message)));
        }
    };

    let display = match open_display() {
        Ok(display) => display,
        Err(err) => {
            if let Err(release_err) = source.release() {
                log::warn!("failed to release {}: {:#}", source.describe(), release_err);
            }
            return Err(err.context("open display"));
        }
    };

    Session::new(source, detector, display, client)
        .with_console(console)
        .with_options(options)
        .run()
}
