use std::fmt;
use std::time::{Duration, Instant};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::emotion::EmotionScore;

/// Identifier for a face under temporal tracking.
///
/// `Id` carries the server's stable tracking identifier. `Index` is the
/// positional fallback used when the service cannot maintain one:
/// matching by array position across batches can misattribute velocity
/// when faces appear or disappear between batches, so positional
/// identity is an approximation, never a contract.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackKey {
    Id(String),
    Index(usize),
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKey::Id(id) => write!(f, "{id}"),
            TrackKey::Index(i) => write!(f, "#{i}"),
        }
    }
}

/// A timestamped authoritative observation, used as an interpolation
/// endpoint.
#[derive(Clone, Copy, Debug)]
pub struct Keyframe {
    pub bbox: BoundingBox,
    pub at: Instant,
}

/// A face under temporal tracking: the two most recent keyframes plus
/// the velocity estimate derived between them.
///
/// Invariant: `current` is always at least as recent as `previous`;
/// velocity comes only from two keyframes of the same key separated by
/// a positive time delta.
#[derive(Clone, Debug)]
pub struct TrackedFace {
    pub key: TrackKey,
    pub current: Keyframe,
    pub previous: Option<Keyframe>,
    /// Ranked emotions, sorted by descending score; never empty.
    pub emotions: Vec<EmotionScore>,
    pub last_seen: Instant,
    /// Estimated motion in pixels per second.
    pub velocity: Option<(f64, f64)>,
}

impl TrackedFace {
    pub fn new(key: TrackKey, bbox: BoundingBox, emotions: Vec<EmotionScore>, now: Instant) -> Self {
        Self {
            key,
            current: Keyframe { bbox, at: now },
            previous: None,
            emotions,
            last_seen: now,
            velocity: None,
        }
    }

    /// Rotates the current keyframe into previous and installs a fresh
    /// observation. Velocity is recomputed only for a positive time
    /// delta; otherwise the prior estimate is kept.
    pub fn observe(&mut self, bbox: BoundingBox, emotions: Vec<EmotionScore>, now: Instant) {
        let prev = self.current;
        let dt = now.saturating_duration_since(prev.at).as_secs_f64();
        if dt > 0.0 {
            self.velocity = Some(((bbox.x - prev.bbox.x) / dt, (bbox.y - prev.bbox.y) / dt));
        }
        self.previous = Some(prev);
        self.current = Keyframe { bbox, at: now };
        self.emotions = emotions;
        self.last_seen = now;
    }

    /// The top-ranked emotion; ingestion guarantees a non-empty list.
    pub fn primary_emotion(&self) -> &EmotionScore {
        &self.emotions[0]
    }

    pub fn is_stale(&self, now: Instant, threshold: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn face_at(x: f64, y: f64, now: Instant) -> TrackedFace {
        TrackedFace::new(
            TrackKey::Id("face_1".to_string()),
            BoundingBox::new(x, y, 50.0, 50.0),
            vec![EmotionScore::new("happy", 0.9, 90.0)],
            now,
        )
    }

    #[test]
    fn test_new_face_has_no_previous_or_velocity() {
        let face = face_at(100.0, 100.0, Instant::now());
        assert!(face.previous.is_none());
        assert!(face.velocity.is_none());
    }

    #[test]
    fn test_observe_rotates_keyframes() {
        let t0 = Instant::now();
        let mut face = face_at(100.0, 100.0, t0);
        face.observe(
            BoundingBox::new(110.0, 100.0, 50.0, 50.0),
            vec![EmotionScore::new("happy", 0.9, 90.0)],
            t0 + Duration::from_millis(100),
        );

        let prev = face.previous.unwrap();
        assert_relative_eq!(prev.bbox.x, 100.0);
        assert_relative_eq!(face.current.bbox.x, 110.0);
        assert!(face.current.at >= prev.at);
    }

    #[test]
    fn test_velocity_from_keyframe_pair() {
        let t0 = Instant::now();
        let mut face = face_at(100.0, 200.0, t0);
        // +10px x, -20px y over 100ms → (100, -200) px/sec.
        face.observe(
            BoundingBox::new(110.0, 180.0, 50.0, 50.0),
            vec![EmotionScore::new("happy", 0.9, 90.0)],
            t0 + Duration::from_millis(100),
        );

        let (vx, vy) = face.velocity.unwrap();
        assert_relative_eq!(vx, 100.0, epsilon = 1e-6);
        assert_relative_eq!(vy, -200.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_time_delta_keeps_prior_velocity() {
        let t0 = Instant::now();
        let mut face = face_at(100.0, 100.0, t0);
        face.observe(
            BoundingBox::new(110.0, 100.0, 50.0, 50.0),
            vec![EmotionScore::new("happy", 0.9, 90.0)],
            t0 + Duration::from_millis(100),
        );
        let velocity_before = face.velocity;

        // Same timestamp as the current keyframe: velocity update skipped.
        face.observe(
            BoundingBox::new(500.0, 500.0, 50.0, 50.0),
            vec![EmotionScore::new("happy", 0.9, 90.0)],
            t0 + Duration::from_millis(100),
        );
        assert_eq!(face.velocity, velocity_before);
    }

    #[test]
    fn test_staleness() {
        let t0 = Instant::now();
        let face = face_at(100.0, 100.0, t0);
        let threshold = Duration::from_millis(500);
        assert!(!face.is_stale(t0 + Duration::from_millis(500), threshold));
        assert!(face.is_stale(t0 + Duration::from_millis(501), threshold));
    }

    #[test]
    fn test_track_key_display() {
        assert_eq!(TrackKey::Id("face_1".to_string()).to_string(), "face_1");
        assert_eq!(TrackKey::Index(2).to_string(), "#2");
    }
}
