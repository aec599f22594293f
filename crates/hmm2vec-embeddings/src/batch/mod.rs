//! Chunked parallel embedding of a whole corpus.
//!
//! - [`BatchOrchestrator`]: drives a [`crate::SampleEmbedder`] over chunks on a rayon pool
//! - [`BatchSummary`]: degraded counts, reasons, and timings for a run

mod orchestrator;
mod summary;

pub use orchestrator::{BatchOrchestrator, BatchOutput};
pub use summary::BatchSummary;
