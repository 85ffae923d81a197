use std::time::Duration;

/// Liveness probe interval while the channel is connected.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(20);

/// No inbound traffic for this long (two missed probes) classifies the
/// channel as dead and triggers an automatic reconnect.
pub const LIVENESS_TIMEOUT: Duration = Duration::from_secs(40);

/// Bounded wait for a connection attempt. The attempt resolves after this
/// long even when the service is unreachable, so the rest of the pipeline
/// can proceed in a degraded state instead of hanging.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Handshake silence window before the session self-resolves with
/// locally assumed defaults.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Reconnect backoff: base delay, doubled per failed attempt up to the cap.
pub const BACKOFF_BASE: Duration = Duration::from_secs(1);
pub const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Time budget for visually settling a box at a freshly reported position.
pub const TRANSITION_DURATION: Duration = Duration::from_millis(100);

/// Age past which a keyframe is no longer trusted for interpolation;
/// velocity extrapolation takes over.
pub const STALENESS_THRESHOLD: Duration = Duration::from_millis(500);

/// Cap on how far a box may be extrapolated beyond its last observation.
pub const MAX_PREDICTION: Duration = Duration::from_millis(500);

/// Tracked faces unseen for this long are pruned on the next batch apply.
pub const TRACK_PRUNE_AFTER: Duration = Duration::from_secs(5);

/// Frame upload rate bounds. The remote service rejects higher rates.
pub const MIN_FRAME_RATE: f64 = 1.0;
pub const MAX_FRAME_RATE: f64 = 5.0;
pub const DEFAULT_FRAME_RATE: f64 = 2.0;

/// Cadence of the synthetic detection source when the service is
/// unreachable.
pub const FALLBACK_INTERVAL: Duration = Duration::from_millis(200);

/// JPEG quality for uploaded frames.
pub const JPEG_QUALITY: u8 = 70;

/// Constraints assumed when the handshake self-resolves without a server
/// acknowledgment.
pub const DEFAULT_MAX_RESOLUTION: [u32; 2] = [1280, 720];
