//! Batch execution engine
//!
//! Runs the job matrix under a bounded worker pool, one isolated pipeline
//! per job.

mod batch;
mod pipeline;

#[cfg(test)]
pub(crate) mod testutil;

pub use batch::BatchExecutor;
pub use pipeline::execute_job;
