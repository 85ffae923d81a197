use serde::{Deserialize, Serialize};

use crate::shared::emotion::EmotionScore;

/// Server error code signaling capacity overload; carries a recommended
/// frame rate the client must apply.
pub const OVERLOAD_CODE: u32 = 429;

/// Detection parameters sent with the `initialize` handshake.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub video_source: String,
    pub detection_interval_ms: u64,
    pub min_face_size: u32,
    pub return_face_landmarks: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            video_source: "camera".to_string(),
            detection_interval_ms: 500,
            min_face_size: 60,
            return_face_landmarks: false,
        }
    }
}

/// Constraints returned by the server in the `initialized` acknowledgment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerConstraints {
    pub max_frame_rate: f64,
    pub max_resolution: [u32; 2],
}

/// The `initialized` handshake acknowledgment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionAck {
    pub session_id: String,
    pub timestamp: u64,
    pub config: ServerConstraints,
}

/// One face observation within a detection batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    /// `[x, y, width, height]` in source-capture pixel units.
    #[serde(rename = "box")]
    pub bbox: [f64; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(default)]
    pub emotions: Vec<EmotionScore>,
}

/// One `detection_result` message: a wholesale replacement of the
/// current keyframe set. Fed identically by the live channel and the
/// fallback generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionBatch {
    pub frame_id: u64,
    pub timestamp: u64,
    pub processing_time: f64,
    pub face_detected: bool,
    #[serde(default)]
    pub faces: Vec<FaceObservation>,
}

/// A server `error_message`. An overload code plus `recommended_value`
/// drives adaptive rate control.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    pub code: u32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_value: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Stop,
}

/// Outbound messages, tagged by a `type` field on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Initialize {
        client_id: String,
        config: DetectionConfig,
    },
    VideoFrame {
        timestamp: u64,
        resolution: [u32; 2],
        /// Base64-encoded JPEG payload.
        data: String,
    },
    Control {
        action: ControlAction,
        timestamp: u64,
    },
    Ping,
}

/// Inbound messages, tagged by a `type` field on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Initialized(SessionAck),
    DetectionResult(DetectionBatch),
    ErrorMessage(ServerError),
    Pong,
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerMessage {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
