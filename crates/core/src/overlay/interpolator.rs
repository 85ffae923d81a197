use std::time::{Duration, Instant};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{MAX_PREDICTION, STALENESS_THRESHOLD, TRANSITION_DURATION};
use crate::shared::resolution::Resolution;
use crate::tracking::tracked_face::TrackedFace;

/// Timing knobs for presenting a low-frequency, jittery detection
/// stream as smooth motion.
#[derive(Clone, Copy, Debug)]
pub struct DisplayParams {
    /// Time budget for settling a box at a freshly reported position.
    pub transition: Duration,
    /// Keyframe age past which interpolation gives way to extrapolation.
    pub staleness: Duration,
    /// Cap on how far velocity may carry a box beyond its last
    /// observation.
    pub max_prediction: Duration,
}

impl Default for DisplayParams {
    fn default() -> Self {
        Self {
            transition: TRANSITION_DURATION,
            staleness: STALENESS_THRESHOLD,
            max_prediction: MAX_PREDICTION,
        }
    }
}

/// Where a face should be drawn this refresh, in source units, or
/// `None` when nothing trustworthy remains.
///
/// The render cadence (display refresh) is deliberately decoupled from
/// the data cadence (batch arrival): for the transition window after an
/// update the box glides from the previous keyframe toward the current
/// one, and once updates go stale it coasts on estimated velocity
/// instead of freezing — clamped to frame bounds and capped so a lost
/// face cannot drift off indefinitely. A stale face with no velocity
/// estimate is treated as no longer present.
pub fn display_box(
    face: &TrackedFace,
    now: Instant,
    frame: Resolution,
    params: &DisplayParams,
) -> Option<BoundingBox> {
    let elapsed = now.saturating_duration_since(face.current.at);
    let progress = (elapsed.as_secs_f64() / params.transition.as_secs_f64()).min(1.0);

    if let Some(previous) = face.previous {
        if progress < 1.0 {
            return Some(previous.bbox.lerp(&face.current.bbox, progress));
        }
    }

    if face.is_stale(now, params.staleness) {
        return match face.velocity {
            Some((vx, vy)) => {
                let since_seen = now.saturating_duration_since(face.last_seen);
                let horizon = since_seen.min(params.max_prediction).as_secs_f64();
                Some(
                    face.current
                        .bbox
                        .translated(vx * horizon, vy * horizon)
                        .clamped_to(frame),
                )
            }
            None => None,
        };
    }

    Some(face.current.bbox)
}
