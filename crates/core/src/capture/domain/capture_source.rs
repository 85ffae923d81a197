use thiserror::Error;

use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::resolution::Resolution;

/// Capture failures are fatal to the streaming attempt: the pipeline
/// reports them to the caller and does not start (or stops).
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture device unavailable: {0}")]
    Unavailable(String),
    #[error("capture access denied: {0}")]
    Denied(String),
}

/// Domain interface for a camera-like frame source.
///
/// The device is exclusively owned by whichever consumer last acquired
/// it; switching devices means releasing and reacquiring.
pub trait CaptureSource: Send {
    fn resolution(&self) -> Resolution;

    /// The most recent ready frame, or `None` when capture has not
    /// produced one since the last call.
    fn latest_frame(&mut self) -> Result<Option<PixelBuffer>, CaptureError>;

    /// Releases the underlying device. Safe to call more than once.
    fn release(&mut self);
}
