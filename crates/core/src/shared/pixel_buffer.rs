use crate::shared::resolution::Resolution;

/// One captured camera sample: contiguous RGB bytes in row-major order.
///
/// Produced by a capture source and consumed immediately by the frame
/// encoder; never retained.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    data: Vec<u8>,
    resolution: Resolution,
}

impl PixelBuffer {
    pub fn new(data: Vec<u8>, resolution: Resolution) -> Self {
        debug_assert_eq!(
            data.len(),
            (resolution.width as usize) * (resolution.height as usize) * 3,
            "data length must equal width * height * 3"
        );
        Self { data, resolution }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.resolution.width
    }

    pub fn height(&self) -> u32 {
        self.resolution.height
    }
}
