use std::time::Instant;

use crate::shared::resolution::Resolution;

/// An encoded outbound frame: JPEG payload plus capture metadata.
///
/// Ephemeral: created by the scheduler, consumed by the channel send,
/// never retained.
#[derive(Clone, Debug)]
pub struct Frame {
    sequence: u64,
    captured_at: Instant,
    wall_ms: u64,
    resolution: Resolution,
    jpeg: Vec<u8>,
}

impl Frame {
    pub fn new(
        sequence: u64,
        captured_at: Instant,
        wall_ms: u64,
        resolution: Resolution,
        jpeg: Vec<u8>,
    ) -> Self {
        Self {
            sequence,
            captured_at,
            wall_ms,
            resolution,
            jpeg,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn wall_ms(&self) -> u64 {
        self.wall_ms
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn jpeg(&self) -> &[u8] {
        &self.jpeg
    }
}
