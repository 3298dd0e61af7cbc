//! Batch Pipeline
//!
//! The core of the server: takes the pending subset of the image list,
//! bounds it into one batch, drives each record through the remote
//! extraction call strictly sequentially with per-item failure isolation,
//! and reconciles the results back into the registry and the store.

mod events;
mod runner;

pub use events::{BatchEvent, BatchSummary, NullSink, ProgressSink, RunProgress, RunSnapshot, RunState};
pub use runner::{BatchPipeline, PipelineError, RunOutcome, BATCH_SIZE};
