use std::time::{Duration, Instant};

use crate::shared::constants::{MAX_FRAME_RATE, MIN_FRAME_RATE};

/// Self-throttled gate pacing frame uploads to a target rate.
///
/// Driven by the caller's display-refresh loop rather than a timer: on
/// each tick the pipeline asks `due`, and only captures when the target
/// interval has elapsed. Rate changes (manual or server-commanded) are
/// clamped to the service's accepted range and take effect on the next
/// tick, not retroactively.
pub struct FrameScheduler {
    fps: f64,
    target_interval: Duration,
    last_sent: Option<Instant>,
}

impl FrameScheduler {
    pub fn new(fps: f64) -> Self {
        let mut scheduler = Self {
            fps: 0.0,
            target_interval: Duration::ZERO,
            last_sent: None,
        };
        scheduler.set_rate(fps);
        scheduler
    }

    /// Updates the target rate, clamped to the accepted bounds.
    /// Returns the effective rate.
    pub fn set_rate(&mut self, fps: f64) -> f64 {
        let clamped = if fps.is_finite() {
            fps.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE)
        } else {
            MIN_FRAME_RATE
        };
        self.fps = clamped;
        self.target_interval = Duration::from_secs_f64(1.0 / clamped);
        clamped
    }

    pub fn rate(&self) -> f64 {
        self.fps
    }

    pub fn target_interval(&self) -> Duration {
        self.target_interval
    }

    /// Whether enough time has elapsed since the last accepted frame.
    pub fn due(&self, now: Instant) -> bool {
        self.last_sent
            .map_or(true, |t| now.duration_since(t) >= self.target_interval)
    }

    pub fn mark_sent(&mut self, now: Instant) {
        self.last_sent = Some(now);
    }

    /// Clears pacing state so a restarted stream sends immediately.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}
