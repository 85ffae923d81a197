pub mod bounding_box;
pub mod clock;
pub mod constants;
pub mod emotion;
pub mod frame;
pub mod pixel_buffer;
pub mod resolution;
