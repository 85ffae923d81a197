use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::protocol::messages::{DetectionBatch, FaceObservation};
use crate::shared::clock::unix_millis;
use crate::shared::constants::FALLBACK_INTERVAL;
use crate::shared::emotion::EmotionScore;
use crate::shared::resolution::Resolution;

/// Tracking identifier carried by every synthetic face.
const SYNTHETIC_TRACK_ID: &str = "demo_face";

const EMOTION_LABELS: [&str; 5] = ["neutral", "happy", "surprised", "sad", "angry"];

/// Synthetic detection source standing in for an unreachable service.
///
/// Emits one batch per interval with a single tracked face randomized
/// inside the capture bounds and a plausible emotion distribution. The
/// ingestion and overlay layers consume these through the same
/// `DetectionBatch` contract as live results, which is what makes the
/// degraded mode indistinguishable downstream.
pub struct SyntheticBatchSource {
    bounds: Resolution,
    interval: Duration,
    last_emit: Option<Instant>,
    next_frame_id: u64,
    rng: StdRng,
}

impl SyntheticBatchSource {
    pub fn new(bounds: Resolution) -> Self {
        Self {
            bounds,
            interval: FALLBACK_INTERVAL,
            last_emit: None,
            next_frame_id: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic variant for tests.
    pub fn with_seed(bounds: Resolution, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(bounds)
        }
    }

    /// The next synthetic batch, or `None` until the interval elapses.
    pub fn next_batch(&mut self, now: Instant) -> Option<DetectionBatch> {
        if self
            .last_emit
            .is_some_and(|t| now.duration_since(t) < self.interval)
        {
            return None;
        }
        self.last_emit = Some(now);

        let frame_id = self.next_frame_id;
        self.next_frame_id += 1;

        Some(DetectionBatch {
            frame_id,
            timestamp: unix_millis(),
            processing_time: self.rng.gen_range(20.0..60.0),
            face_detected: true,
            faces: vec![self.random_face()],
        })
    }

    fn random_face(&mut self) -> FaceObservation {
        let w = self.bounds.width as f64;
        let h = self.bounds.height as f64;
        let box_w = w * self.rng.gen_range(0.15..0.35);
        let box_h = h * self.rng.gen_range(0.2..0.45);
        let x = self.rng.gen_range(0.0..(w - box_w));
        let y = self.rng.gen_range(0.0..(h - box_h));

        FaceObservation {
            bbox: [x, y, box_w, box_h],
            tracking_id: Some(SYNTHETIC_TRACK_ID.to_string()),
            emotions: self.random_emotions(),
        }
    }

    /// Random weights normalized into percentages, sorted descending.
    fn random_emotions(&mut self) -> Vec<EmotionScore> {
        let weights: Vec<f64> = EMOTION_LABELS
            .iter()
            .map(|_| self.rng.gen_range(0.05..1.0))
            .collect();
        let total: f64 = weights.iter().sum();

        let mut emotions: Vec<EmotionScore> = EMOTION_LABELS
            .iter()
            .zip(&weights)
            .map(|(label, weight)| {
                let score = weight / total;
                EmotionScore::new(label, score, score * 100.0)
            })
            .collect();
        emotions.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        emotions
    }
}
