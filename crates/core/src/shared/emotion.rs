use serde::{Deserialize, Serialize};

/// Label substituted when the service omits emotion scores entirely.
pub const UNKNOWN_EMOTION: &str = "unknown";

/// One ranked emotion estimate for a face.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub emotion: String,
    pub score: f64,
    pub percentage: f64,
}

impl EmotionScore {
    pub fn new(emotion: &str, score: f64, percentage: f64) -> Self {
        Self {
            emotion: emotion.to_string(),
            score,
            percentage,
        }
    }

    /// The placeholder entry guaranteeing a non-empty emotion list.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_EMOTION, 1.0, 100.0)
    }
}

/// Sorts emotions by descending score so the primary emotion is always
/// at index 0, substituting a single "unknown" entry for an empty list.
pub fn normalize_emotions(mut emotions: Vec<EmotionScore>) -> Vec<EmotionScore> {
    if emotions.is_empty() {
        return vec![EmotionScore::unknown()];
    }
    emotions.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    emotions
}
