use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::protocol::messages::DetectionBatch;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::TRACK_PRUNE_AFTER;
use crate::shared::emotion::normalize_emotions;
use crate::tracking::tracked_face::{TrackKey, TrackedFace};

/// Applies detection batches to the set of tracked faces.
///
/// Each batch replaces the matched faces' current keyframes wholesale.
/// Faces absent from a batch are not removed: they stay available to the
/// renderer as extrapolation candidates and are only pruned lazily once
/// they have gone unseen for well past the staleness window. Batches may
/// be dropped or arrive late; every update is treated as a fresh
/// keyframe with no plausibility checks, so a "teleporting" face simply
/// becomes the new truth.
pub struct TrackingTable {
    faces: HashMap<TrackKey, TrackedFace>,
    last_batch_at: Option<Instant>,
    prune_after: Duration,
}

impl TrackingTable {
    pub fn new() -> Self {
        Self {
            faces: HashMap::new(),
            last_batch_at: None,
            prune_after: TRACK_PRUNE_AFTER,
        }
    }

    #[cfg(test)]
    fn with_prune_after(mut self, prune_after: Duration) -> Self {
        self.prune_after = prune_after;
        self
    }

    pub fn apply(&mut self, batch: &DetectionBatch, now: Instant) {
        for (index, observation) in batch.faces.iter().enumerate() {
            let key = observation
                .tracking_id
                .clone()
                .map(TrackKey::Id)
                .unwrap_or(TrackKey::Index(index));
            let bbox = BoundingBox::from_array(observation.bbox);
            let emotions = normalize_emotions(observation.emotions.clone());

            match self.faces.get_mut(&key) {
                Some(face) => face.observe(bbox, emotions, now),
                None => {
                    self.faces
                        .insert(key.clone(), TrackedFace::new(key, bbox, emotions, now));
                }
            }
        }
        self.last_batch_at = Some(now);
        self.prune(now);
    }

    fn prune(&mut self, now: Instant) {
        let horizon = self.prune_after;
        self.faces
            .retain(|_, face| now.saturating_duration_since(face.last_seen) <= horizon);
    }

    /// When the most recent batch (of any content) arrived.
    pub fn last_batch_at(&self) -> Option<Instant> {
        self.last_batch_at
    }

    /// Faces in stable key order, for deterministic rendering.
    pub fn faces_ordered(&self) -> Vec<&TrackedFace> {
        let mut faces: Vec<&TrackedFace> = self.faces.values().collect();
        faces.sort_by(|a, b| a.key.cmp(&b.key));
        faces
    }

    pub fn get(&self, key: &TrackKey) -> Option<&TrackedFace> {
        self.faces.get(key)
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Drops all tracking state; used when streaming (re)starts.
    pub fn clear(&mut self) {
        self.faces.clear();
        self.last_batch_at = None;
    }
}

impl Default for TrackingTable {
    fn default() -> Self {
        Self::new()
    }
}
