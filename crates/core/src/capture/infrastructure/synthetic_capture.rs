use crate::capture::domain::capture_source::{CaptureError, CaptureSource};
use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::resolution::Resolution;

/// Deterministic capture source for demos and tests: a dark field with
/// a bright block sweeping horizontally, one fresh frame per call.
pub struct SyntheticCapture {
    resolution: Resolution,
    tick: u64,
    released: bool,
}

impl SyntheticCapture {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            tick: 0,
            released: false,
        }
    }

    fn render(&self) -> PixelBuffer {
        let w = self.resolution.width as usize;
        let h = self.resolution.height as usize;
        let mut data = vec![32u8; w * h * 3];

        // A w/8-wide bright block that wraps around once per 64 ticks.
        let block_w = (w / 8).max(1);
        let block_x = ((self.tick as usize * w) / 64) % w;
        for row in data.chunks_mut(w * 3) {
            for x in 0..block_w {
                let col = (block_x + x) % w;
                row[col * 3] = 220;
                row[col * 3 + 1] = 200;
                row[col * 3 + 2] = 180;
            }
        }
        PixelBuffer::new(data, self.resolution)
    }
}

impl CaptureSource for SyntheticCapture {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn latest_frame(&mut self) -> Result<Option<PixelBuffer>, CaptureError> {
        if self.released {
            return Err(CaptureError::Unavailable("capture released".to_string()));
        }
        self.tick += 1;
        Ok(Some(self.render()))
    }

    fn release(&mut self) {
        self.released = true;
    }
}
