//! Per-job record writing
//!
//! Exactly one `results.json` per job. The record is written twice on the
//! happy path: a provisional `Err(Timeout)` immediately before the artifact
//! launches, then the true outcome once classification completes. If the
//! batch process is killed externally in between, the provisional record is
//! the final, correct-by-convention result.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use tracing::debug;

use crate::models::{FailureKind, Job, JobRecord, WorkDirectory};

/// Writes result records into a job's working directory
pub struct ResultWriter;

impl ResultWriter {
    /// Persist `record`, replacing any previous record for the job.
    pub fn write(workdir: &WorkDirectory, record: &JobRecord) -> Result<()> {
        let path = workdir.result_file();
        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;

        serde_json::to_writer(BufWriter::new(file), record)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        debug!("wrote record to {}", path.display());
        Ok(())
    }

    /// Write the provisional record assumed until execution proves otherwise.
    pub fn write_provisional(workdir: &WorkDirectory, job: &Job) -> Result<JobRecord> {
        let record = JobRecord::failure(
            job.implementation.clone(),
            workdir.suite_file(),
            FailureKind::Timeout,
        );
        Self::write(workdir, &record)?;
        Ok(record)
    }
}
