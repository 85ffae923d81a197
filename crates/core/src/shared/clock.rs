use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, for wire-level timestamps.
///
/// Monotonic timing inside the pipeline uses `Instant`; wall-clock time
/// appears only in outbound protocol messages.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
