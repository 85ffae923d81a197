use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::capture::domain::capture_source::{CaptureError, CaptureSource};
use crate::capture::frame_encoder;
use crate::capture::scheduler::FrameScheduler;
use crate::channel::connection_manager::{ConnectionManager, ConnectionState};
use crate::channel::domain::transport::{TransportFactory, TransportMode};
use crate::fallback::synthetic_batches::SyntheticBatchSource;
use crate::overlay::domain::render_surface::RenderSurface;
use crate::overlay::engine::OverlayEngine;
use crate::overlay::interpolator::DisplayParams;
use crate::pipeline::pipeline_event::{PipelineEvent, RateSource};
use crate::protocol::messages::{ClientMessage, ControlAction, ServerMessage, OVERLOAD_CODE};
use crate::session::handshake::{Session, SessionConfig};
use crate::shared::clock::unix_millis;
use crate::shared::constants::DEFAULT_FRAME_RATE;
use crate::shared::frame::Frame;
use crate::shared::resolution::Resolution;
use crate::tracking::ingestion::TrackingTable;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The only failure that prevents streaming outright; everything
    /// else degrades into state changes.
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
}

pub struct PipelineConfig {
    pub session: SessionConfig,
    pub frame_rate: f64,
    pub display: DisplayParams,
    /// Switch to the synthetic detection source when the service cannot
    /// be reached during start.
    pub auto_fallback: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            frame_rate: DEFAULT_FRAME_RATE,
            display: DisplayParams::default(),
            auto_fallback: true,
        }
    }
}

/// One streaming pipeline instance: owns the channel, session,
/// scheduler, tracking table, overlay engine, and fallback generator.
///
/// Everything runs on the caller's thread. The caller drives `tick`
/// from its display-refresh loop; all network I/O is non-blocking polls
/// and all waiting is deadline arithmetic, so a tick is always short.
/// Multiple independent instances can coexist — no state is shared.
pub struct StreamingPipeline {
    manager: ConnectionManager,
    session: Session,
    session_config: SessionConfig,
    scheduler: FrameScheduler,
    table: TrackingTable,
    engine: Option<OverlayEngine>,
    display: DisplayParams,
    fallback: Option<SyntheticBatchSource>,
    auto_fallback: bool,
    capture: Option<Box<dyn CaptureSource>>,
    source_resolution: Option<Resolution>,
    sequence: u64,
    running: bool,
    prev_state: ConnectionState,
    prev_mode: TransportMode,
    events_tx: Sender<PipelineEvent>,
    events_rx: Receiver<PipelineEvent>,
}

impl StreamingPipeline {
    pub fn new(factory: Box<dyn TransportFactory>, config: PipelineConfig) -> Self {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Self {
            manager: ConnectionManager::new(factory),
            session: Session::new(),
            session_config: config.session,
            scheduler: FrameScheduler::new(config.frame_rate),
            table: TrackingTable::new(),
            engine: None,
            display: config.display,
            fallback: None,
            auto_fallback: config.auto_fallback,
            capture: None,
            source_resolution: None,
            sequence: 0,
            running: false,
            prev_state: ConnectionState::Disconnected,
            prev_mode: TransportMode::WebSocket,
            events_tx,
            events_rx,
        }
    }

    /// The outbound event queue. Clone-cheap; drain with `try_recv`.
    pub fn events(&self) -> Receiver<PipelineEvent> {
        self.events_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn transport_mode(&self) -> TransportMode {
        self.manager.mode()
    }

    pub fn fallback_active(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn current_rate(&self) -> f64 {
        self.scheduler.rate()
    }

    /// Acquires the capture source and brings the channel up. Capture
    /// failure is fatal; an unreachable service is not — the pipeline
    /// starts degraded on the synthetic source instead.
    pub fn start(
        &mut self,
        mut capture: Box<dyn CaptureSource>,
        now: Instant,
    ) -> Result<(), PipelineError> {
        if self.running {
            return Ok(());
        }

        // Probe the device up front so a missing/denied camera fails
        // the start rather than the first tick.
        capture.latest_frame()?;
        let source = capture.resolution();

        self.capture = Some(capture);
        self.source_resolution = Some(source);
        self.engine = Some(OverlayEngine::with_params(source, self.display));
        self.table.clear();
        self.scheduler.reset();
        self.sequence = 0;
        self.running = true;

        self.manager.connect(now);
        self.sync_connection();

        if self.manager.is_connected() {
            self.begin_handshake(now);
        } else if self.auto_fallback {
            // One full attempt resolved without a connection: degrade.
            self.engage_fallback();
        }
        Ok(())
    }

    /// Drives one cooperative step: timers, inbound messages, handshake
    /// resolution, fallback generation, frame upload, overlay render.
    pub fn tick(
        &mut self,
        now: Instant,
        surface: &mut dyn RenderSurface,
    ) -> Result<(), PipelineError> {
        if !self.running {
            return Ok(());
        }

        self.manager.tick(now);
        self.sync_connection();

        if self.manager.is_connected() {
            self.begin_handshake(now);
        }

        while let Some(message) = self.manager.poll(now) {
            self.handle_message(message, now);
        }
        self.sync_connection();

        if self.session.tick(now) {
            self.emit(PipelineEvent::SessionReady {
                session_id: None,
                locally_resolved: true,
            });
            self.send_control(ControlAction::Start, now);
        }

        if let Some(generator) = self.fallback.as_mut() {
            if let Some(batch) = generator.next_batch(now) {
                self.table.apply(&batch, now);
                self.emit(PipelineEvent::BatchReceived {
                    face_count: batch.faces.len(),
                    processing_ms: batch.processing_time,
                });
            }
        }

        self.pump_frame(now)?;

        if let Some(engine) = &self.engine {
            engine.render(&self.table, now, surface);
        }
        Ok(())
    }

    /// Manual rate change; clamped, effective next tick.
    pub fn set_rate(&mut self, fps: f64) -> f64 {
        let effective = self.scheduler.set_rate(fps);
        self.emit(PipelineEvent::RateAdjusted {
            fps: effective,
            source: RateSource::Manual,
        });
        effective
    }

    /// Manually switch to the synthetic detection source.
    pub fn activate_fallback(&mut self) {
        self.engage_fallback();
    }

    /// Stops everything: scheduling, rendering, fallback, capture, and
    /// the channel. Idempotent — each obligation tolerates repetition.
    pub fn stop(&mut self, now: Instant) {
        if self.running && self.manager.is_connected() {
            // Best effort; the channel is going away regardless.
            self.send_control(ControlAction::Stop, now);
        }
        self.running = false;
        self.fallback = None;
        if let Some(mut capture) = self.capture.take() {
            capture.release();
        }
        self.manager.disconnect();
        self.sync_connection();
        self.session.reset();
        self.scheduler.reset();
        self.table.clear();
        self.engine = None;
    }

    fn begin_handshake(&mut self, now: Instant) {
        if let Some(message) = self.session.begin(&self.session_config, now) {
            self.send(message, now);
        }
    }

    fn handle_message(&mut self, message: ServerMessage, now: Instant) {
        match message {
            ServerMessage::Initialized(ack) => {
                let session_id = ack.session_id.clone();
                log::info!("session initialized: {session_id}");
                if self.session.on_ack(ack) {
                    self.emit(PipelineEvent::SessionReady {
                        session_id: Some(session_id),
                        locally_resolved: false,
                    });
                    self.send_control(ControlAction::Start, now);
                }
            }
            ServerMessage::DetectionResult(batch) => {
                self.table.apply(&batch, now);
                self.emit(PipelineEvent::BatchReceived {
                    face_count: batch.faces.len(),
                    processing_ms: batch.processing_time,
                });
            }
            ServerMessage::ErrorMessage(error) => match (error.code, error.recommended_value) {
                (OVERLOAD_CODE, Some(recommended)) => {
                    // One-directional control loop: the server signals
                    // down; the client never signals a rate increase.
                    let fps = self.scheduler.set_rate(recommended);
                    log::info!("server requested rate reduction to {fps} fps");
                    self.emit(PipelineEvent::RateAdjusted {
                        fps,
                        source: RateSource::Server,
                    });
                }
                _ => {
                    log::warn!("server error {}: {}", error.code, error.message);
                    self.emit(PipelineEvent::ServerError {
                        code: error.code,
                        message: error.message,
                    });
                }
            },
            // Liveness bookkeeping already happened in the manager.
            ServerMessage::Pong => {}
        }
    }

    fn pump_frame(&mut self, now: Instant) -> Result<(), PipelineError> {
        let allowed =
            self.manager.is_connected() && self.session.is_initialized() && self.scheduler.due(now);
        if !allowed {
            return Ok(());
        }
        let Some(capture) = self.capture.as_mut() else {
            return Ok(());
        };

        let buffer = match capture.latest_frame() {
            Ok(Some(buffer)) => buffer,
            // No ready frame: skip this tick without blocking.
            Ok(None) => return Ok(()),
            Err(e) => {
                log::error!("capture failed mid-stream: {e}");
                self.stop(now);
                return Err(PipelineError::Capture(e));
            }
        };

        let jpeg = match frame_encoder::encode_jpeg(&buffer) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                log::warn!("frame encode failed, skipping: {e}");
                return Ok(());
            }
        };
        let frame = Frame::new(self.sequence, now, unix_millis(), buffer.resolution(), jpeg);

        let message = ClientMessage::VideoFrame {
            timestamp: frame.wall_ms(),
            resolution: frame.resolution().as_array(),
            data: frame_encoder::to_wire_payload(frame.jpeg()),
        };
        if self.send(message, now) {
            self.scheduler.mark_sent(now);
            self.emit(PipelineEvent::FrameSent {
                sequence: frame.sequence(),
            });
            self.sequence += 1;
        }
        Ok(())
    }

    /// Mirrors manager state into events and dependent lifecycles.
    fn sync_connection(&mut self) {
        let state = self.manager.state();
        let mode = self.manager.mode();
        if (state, mode) == (self.prev_state, self.prev_mode) {
            return;
        }

        if self.prev_state == ConnectionState::Connected && state != ConnectionState::Connected {
            // The session rode on the channel that just went away.
            self.session.reset();
            if let Some(kind) = self.manager.last_disconnect() {
                self.emit(PipelineEvent::Disconnected { kind });
            }
        }
        if state == ConnectionState::Connected && self.prev_state != ConnectionState::Connected {
            // Live again: the synthetic source yields to real results.
            if self.fallback.take().is_some() {
                log::info!("service reachable again, leaving fallback mode");
                self.emit(PipelineEvent::FallbackDeactivated);
            }
        }

        self.prev_state = state;
        self.prev_mode = mode;
        self.emit(PipelineEvent::ConnectionChanged { state, mode });
    }

    fn engage_fallback(&mut self) {
        if self.fallback.is_some() {
            return;
        }
        let bounds = self.source_resolution.unwrap_or(Resolution::new(640, 480));
        self.fallback = Some(SyntheticBatchSource::new(bounds));
        log::warn!("inference service unavailable, using synthetic detections");
        self.emit(PipelineEvent::FallbackActivated);
    }

    fn send(&mut self, message: ClientMessage, now: Instant) -> bool {
        let sent = self.manager.send(&message, now);
        if !sent {
            log::debug!("outbound message dropped; channel unavailable");
        }
        sent
    }

    fn send_control(&mut self, action: ControlAction, now: Instant) {
        self.send(
            ClientMessage::Control {
                action,
                timestamp: unix_millis(),
            },
            now,
        );
    }

    fn emit(&self, event: PipelineEvent) {
        let _ = self.events_tx.send(event);
    }
}
