pub mod diagnostics;
pub mod pipeline_event;
pub mod streaming_pipeline;
