pub mod ingestion;
pub mod tracked_face;
