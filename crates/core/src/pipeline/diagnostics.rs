use std::time::Instant;

use crate::channel::connection_manager::ConnectionState;
use crate::pipeline::pipeline_event::{PipelineEvent, RateSource};

/// Accumulates pipeline events into counters and a closing summary.
///
/// Purely observational: feed it the drained event queue and ask for
/// the report when streaming ends. Keeps the pipeline itself free of
/// any output mechanism.
pub struct StreamDiagnostics {
    started: Instant,
    batches: usize,
    faces_total: usize,
    frames_sent: usize,
    processing_ms: Vec<f64>,
    reconnects: usize,
    disconnects: usize,
    server_errors: usize,
    server_rate_changes: usize,
    fallback_used: bool,
    last_rate: Option<f64>,
}

impl StreamDiagnostics {
    pub fn new(started: Instant) -> Self {
        Self {
            started,
            batches: 0,
            faces_total: 0,
            frames_sent: 0,
            processing_ms: Vec::new(),
            reconnects: 0,
            disconnects: 0,
            server_errors: 0,
            server_rate_changes: 0,
            fallback_used: false,
            last_rate: None,
        }
    }

    pub fn record(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::BatchReceived {
                face_count,
                processing_ms,
            } => {
                self.batches += 1;
                self.faces_total += face_count;
                self.processing_ms.push(*processing_ms);
            }
            PipelineEvent::FrameSent { .. } => self.frames_sent += 1,
            PipelineEvent::ConnectionChanged { state, .. } => {
                if *state == ConnectionState::Connected {
                    self.reconnects += 1;
                }
            }
            PipelineEvent::Disconnected { .. } => self.disconnects += 1,
            PipelineEvent::ServerError { .. } => self.server_errors += 1,
            PipelineEvent::RateAdjusted { fps, source } => {
                self.last_rate = Some(*fps);
                if *source == RateSource::Server {
                    self.server_rate_changes += 1;
                }
            }
            PipelineEvent::FallbackActivated => self.fallback_used = true,
            PipelineEvent::FallbackDeactivated | PipelineEvent::SessionReady { .. } => {}
        }
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn frames_sent(&self) -> usize {
        self.frames_sent
    }

    /// The formatted summary, or `None` when nothing happened.
    pub fn summary_string(&self, now: Instant) -> Option<String> {
        if self.batches == 0 && self.frames_sent == 0 {
            return None;
        }

        let elapsed_s = now.duration_since(self.started).as_secs_f64();
        let mut lines = Vec::new();
        lines.push(format!("Stream summary ({elapsed_s:.1}s):"));
        lines.push(format!(
            "  frames sent : {} ({:.1} fps effective)",
            self.frames_sent,
            per_second(self.frames_sent, elapsed_s)
        ));
        lines.push(format!(
            "  batches     : {} ({:.1}/s, {} faces)",
            self.batches,
            per_second(self.batches, elapsed_s),
            self.faces_total
        ));
        if !self.processing_ms.is_empty() {
            let avg = self.processing_ms.iter().sum::<f64>() / self.processing_ms.len() as f64;
            lines.push(format!("  server time : avg {avg:.1}ms"));
        }
        if let Some(rate) = self.last_rate {
            lines.push(format!(
                "  upload rate : {rate} fps ({} server adjustments)",
                self.server_rate_changes
            ));
        }
        if self.disconnects > 0 || self.reconnects > 1 {
            lines.push(format!(
                "  connection  : {} drops, {} connects",
                self.disconnects, self.reconnects
            ));
        }
        if self.server_errors > 0 {
            lines.push(format!("  server errs : {}", self.server_errors));
        }
        if self.fallback_used {
            lines.push("  fallback    : synthetic detections were used".to_string());
        }
        Some(lines.join("\n"))
    }
}

fn per_second(count: usize, elapsed_s: f64) -> f64 {
    if elapsed_s > 0.0 {
        count as f64 / elapsed_s
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::domain::transport::{DisconnectKind, TransportMode};
    use std::time::Duration;

    fn batch_event(faces: usize) -> PipelineEvent {
        PipelineEvent::BatchReceived {
            face_count: faces,
            processing_ms: 40.0,
        }
    }

    #[test]
    fn test_empty_summary_is_none() {
        let diagnostics = StreamDiagnostics::new(Instant::now());
        assert!(diagnostics.summary_string(Instant::now()).is_none());
    }

    #[test]
    fn test_counts_batches_and_frames() {
        let mut diagnostics = StreamDiagnostics::new(Instant::now());
        diagnostics.record(&batch_event(2));
        diagnostics.record(&batch_event(1));
        diagnostics.record(&PipelineEvent::FrameSent { sequence: 0 });

        assert_eq!(diagnostics.batches(), 2);
        assert_eq!(diagnostics.frames_sent(), 1);
    }

    #[test]
    fn test_summary_contents() {
        let t0 = Instant::now();
        let mut diagnostics = StreamDiagnostics::new(t0);
        for _ in 0..10 {
            diagnostics.record(&batch_event(1));
        }
        for i in 0..4 {
            diagnostics.record(&PipelineEvent::FrameSent { sequence: i });
        }
        diagnostics.record(&PipelineEvent::RateAdjusted {
            fps: 2.0,
            source: RateSource::Server,
        });
        diagnostics.record(&PipelineEvent::FallbackActivated);

        let summary = diagnostics.summary_string(t0 + Duration::from_secs(5)).unwrap();
        assert!(summary.contains("frames sent : 4"));
        assert!(summary.contains("batches     : 10 (2.0/s, 10 faces)"));
        assert!(summary.contains("avg 40.0ms"));
        assert!(summary.contains("1 server adjustments"));
        assert!(summary.contains("synthetic detections"));
    }

    #[test]
    fn test_connection_churn_reported() {
        let t0 = Instant::now();
        let mut diagnostics = StreamDiagnostics::new(t0);
        diagnostics.record(&batch_event(1));
        for _ in 0..2 {
            diagnostics.record(&PipelineEvent::ConnectionChanged {
                state: ConnectionState::Connected,
                mode: TransportMode::WebSocket,
            });
            diagnostics.record(&PipelineEvent::Disconnected {
                kind: DisconnectKind::TransportClosed,
            });
        }

        let summary = diagnostics.summary_string(t0 + Duration::from_secs(1)).unwrap();
        assert!(summary.contains("2 drops, 2 connects"));
    }
}
