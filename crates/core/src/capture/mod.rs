pub mod domain;
pub mod frame_encoder;
pub mod infrastructure;
pub mod scheduler;
