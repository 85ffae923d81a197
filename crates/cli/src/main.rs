use std::process;
use std::time::{Duration, Instant};

use clap::Parser;

use facepulse_core::capture::infrastructure::synthetic_capture::SyntheticCapture;
use facepulse_core::channel::infrastructure::service_factory::ServiceTransportFactory;
use facepulse_core::overlay::domain::render_surface::RenderSurface;
use facepulse_core::overlay::interpolator::DisplayParams;
use facepulse_core::pipeline::diagnostics::StreamDiagnostics;
use facepulse_core::pipeline::pipeline_event::PipelineEvent;
use facepulse_core::pipeline::streaming_pipeline::{PipelineConfig, StreamingPipeline};
use facepulse_core::protocol::messages::DetectionConfig;
use facepulse_core::session::handshake::SessionConfig;
use facepulse_core::shared::bounding_box::BoundingBox;
use facepulse_core::shared::resolution::Resolution;

/// Live emotion-detection overlay demo against a streaming inference
/// service.
#[derive(Parser)]
#[command(name = "facepulse")]
struct Cli {
    /// Inference service endpoint (ws:// or wss://).
    #[arg(long, default_value = "ws://127.0.0.1:8765/stream")]
    url: String,

    /// Frame upload rate in frames per second (clamped to 1-5).
    #[arg(long, default_value = "2.0")]
    fps: f64,

    /// How long to stream before exiting, in seconds.
    #[arg(long, default_value = "10")]
    duration: u64,

    /// Synthetic capture resolution, WIDTHxHEIGHT.
    #[arg(long, default_value = "640x480")]
    capture: String,

    /// Overlay surface resolution, WIDTHxHEIGHT.
    #[arg(long, default_value = "1280x720")]
    display: String,

    /// Skip the network entirely and run on synthetic detections.
    #[arg(long)]
    offline: bool,

    /// Minimum face size hint sent in the handshake, in pixels.
    #[arg(long, default_value = "60")]
    min_face_size: u32,

    /// Request face landmarks from the service.
    #[arg(long)]
    landmarks: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let capture_res = parse_resolution(&cli.capture)?;
    let display_res = parse_resolution(&cli.display)?;

    let factory = ServiceTransportFactory::new(&cli.url)?;
    let config = PipelineConfig {
        session: SessionConfig {
            detection: DetectionConfig {
                min_face_size: cli.min_face_size,
                return_face_landmarks: cli.landmarks,
                ..DetectionConfig::default()
            },
            ..SessionConfig::default()
        },
        frame_rate: cli.fps,
        display: DisplayParams::default(),
        auto_fallback: true,
    };

    let mut pipeline = StreamingPipeline::new(Box::new(factory), config);
    let events = pipeline.events();
    let mut diagnostics = StreamDiagnostics::new(Instant::now());
    let mut surface = LogSurface::new(display_res);

    pipeline.start(Box::new(SyntheticCapture::new(capture_res)), Instant::now())?;
    if cli.offline {
        pipeline.activate_fallback();
    }

    log::info!(
        "streaming to {} for {}s at {} fps",
        cli.url,
        cli.duration,
        pipeline.current_rate()
    );

    // ~60Hz cooperative loop standing in for the display's refresh signal.
    let deadline = Instant::now() + Duration::from_secs(cli.duration);
    while Instant::now() < deadline {
        pipeline.tick(Instant::now(), &mut surface)?;
        while let Ok(event) = events.try_recv() {
            report(&event);
            diagnostics.record(&event);
        }
        std::thread::sleep(Duration::from_millis(16));
    }

    pipeline.stop(Instant::now());
    while let Ok(event) = events.try_recv() {
        diagnostics.record(&event);
    }
    if let Some(summary) = diagnostics.summary_string(Instant::now()) {
        log::info!("\n\n{summary}");
    }
    Ok(())
}

fn report(event: &PipelineEvent) {
    match event {
        PipelineEvent::ConnectionChanged { state, mode } => {
            log::info!("connection: {state:?} via {mode:?}")
        }
        PipelineEvent::Disconnected { kind } => log::warn!("disconnected: {kind:?}"),
        PipelineEvent::SessionReady {
            session_id,
            locally_resolved,
        } => match session_id {
            Some(id) => log::info!("session ready: {id}"),
            None if *locally_resolved => log::warn!("session assumed ready (server silent)"),
            None => log::info!("session ready"),
        },
        PipelineEvent::RateAdjusted { fps, source } => {
            log::info!("upload rate now {fps} fps ({source:?})")
        }
        PipelineEvent::FallbackActivated => log::warn!("running on synthetic detections"),
        PipelineEvent::FallbackDeactivated => log::info!("live detections restored"),
        PipelineEvent::ServerError { code, message } => {
            log::warn!("server error {code}: {message}")
        }
        PipelineEvent::BatchReceived { .. } | PipelineEvent::FrameSent { .. } => {}
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.duration == 0 {
        return Err("Duration must be at least 1 second".into());
    }
    if !cli.fps.is_finite() || cli.fps <= 0.0 {
        return Err(format!("Frame rate must be positive, got {}", cli.fps).into());
    }
    Ok(())
}

fn parse_resolution(text: &str) -> Result<Resolution, Box<dyn std::error::Error>> {
    let (w, h) = text
        .split_once('x')
        .ok_or_else(|| format!("Resolution must be WIDTHxHEIGHT, got '{text}'"))?;
    let width: u32 = w.parse()?;
    let height: u32 = h.parse()?;
    if width == 0 || height == 0 {
        return Err(format!("Resolution must be non-zero, got '{text}'").into());
    }
    Ok(Resolution::new(width, height))
}

/// Surface that logs draw commands instead of painting pixels: a box
/// count per second at info level, individual commands at debug level.
struct LogSurface {
    resolution: Resolution,
    boxes_this_pass: usize,
    boxes_last_pass: usize,
    passes: usize,
    last_report: Instant,
}

impl LogSurface {
    fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            boxes_this_pass: 0,
            boxes_last_pass: 0,
            passes: 0,
            last_report: Instant::now(),
        }
    }
}

impl RenderSurface for LogSurface {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn clear(&mut self) {
        self.boxes_last_pass = self.boxes_this_pass;
        self.boxes_this_pass = 0;
        self.passes += 1;
        if self.last_report.elapsed() >= Duration::from_secs(1) {
            log::info!(
                "overlay: {} boxes, {} passes/s",
                self.boxes_last_pass,
                self.passes
            );
            self.last_report = Instant::now();
            self.passes = 0;
        }
    }

    fn draw_rect(&mut self, bbox: &BoundingBox) {
        self.boxes_this_pass += 1;
        log::debug!(
            "rect [{:.0},{:.0} {:.0}x{:.0}]",
            bbox.x,
            bbox.y,
            bbox.width,
            bbox.height
        );
    }

    fn draw_label(&mut self, x: f64, y: f64, text: &str) {
        log::debug!("label [{x:.0},{y:.0}] {text}");
    }
}
