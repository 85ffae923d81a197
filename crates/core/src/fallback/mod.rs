pub mod synthetic_batches;
