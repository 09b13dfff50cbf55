//! Per-job pipeline
//!
//! Stages: create workdir → copy suite → resolve imports → lease cache →
//! compile → provisional record → run → classify → final record. Every
//! stage failure is absorbed here: the job degrades to an `Err` record and
//! the pool continues. The on-disk record moves through
//! `Pending → Compiling → Running → {Ok | Err(kind)}`, where `Running` is
//! represented by the provisional `Err(Timeout)` write.

use anyhow::{Context, Result};
use std::fs;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::BuildCache;
use crate::classifier::{self, Classification};
use crate::compiler::CompilerInvoker;
use crate::config::GraderConfig;
use crate::models::{FailureKind, Job, JobRecord, WorkDirectory, COPIED_SUITE};
use crate::resolver::fix_imports;
use crate::results::ResultWriter;
use crate::sandbox::ExecutionSandbox;

/// Run one job to a guaranteed record.
///
/// Never fails: unexpected errors become `Err(Unknown)` records, written
/// best-effort into the job's directory.
pub async fn execute_job(config: Arc<GraderConfig>, cache: Arc<BuildCache>, job: Job) -> JobRecord {
    match run_pipeline(&config, &cache, &job).await {
        Ok(record) => record,
        Err(err) => {
            warn!("job {} failed unexpectedly: {err:#}", job.dir_name);
            let record = unknown_record(&config, &job);
            write_fallback(&config, &job, &record);
            record
        }
    }
}

/// The record an unexpectedly-failed job reports.
pub fn unknown_record(config: &GraderConfig, job: &Job) -> JobRecord {
    let suite = config
        .layout
        .results
        .join(&job.dir_name)
        .join(COPIED_SUITE);
    JobRecord::failure(job.implementation.clone(), suite, FailureKind::Unknown)
}

/// Best-effort write of a fallback record; the job directory may not exist
/// or may itself be the reason the pipeline failed.
pub fn write_fallback(config: &GraderConfig, job: &Job, record: &JobRecord) {
    let dir = config.layout.results.join(&job.dir_name);
    if let Err(err) = fs::create_dir_all(&dir) {
        warn!("could not create {}: {err}", dir.display());
        return;
    }
    let workdir = WorkDirectory::open(dir);
    if let Err(err) = ResultWriter::write(&workdir, record) {
        warn!("could not write fallback record for {}: {err:#}", job.dir_name);
    }
}

async fn run_pipeline(
    config: &GraderConfig,
    cache: &BuildCache,
    job: &Job,
) -> Result<JobRecord> {
    let workdir = WorkDirectory::create(&config.layout.results, job)?;

    fs::copy(&job.test_suite, workdir.suite_file()).with_context(|| {
        format!(
            "Failed to copy {} into {}",
            job.test_suite.display(),
            workdir.path().display()
        )
    })?;

    fix_imports(
        &workdir.suite_file(),
        &config.layout.stencil,
        &job.implementation,
        &job.common_dir,
    )?;

    let lease = cache.lease(&job.common_dir).await?;

    let invoker = CompilerInvoker::new(config.toolchain.clone());
    match invoker.compile(&workdir, lease.dir()).await {
        Ok(artifact) => {
            lease.mark_warm();
            tracing::debug!("compiled {}", artifact.display());
        }
        Err(err) => {
            info!("compilation failed for {}: {err}", job.dir_name);
            let record = JobRecord::failure(
                job.implementation.clone(),
                workdir.suite_file(),
                FailureKind::Compilation,
            );
            ResultWriter::write(&workdir, &record)?;
            return Ok(record);
        }
    }

    // Assume a timeout until the run proves otherwise; an external kill
    // between here and the final write leaves this record authoritative.
    let provisional = ResultWriter::write_provisional(&workdir, job)?;

    let sandbox = ExecutionSandbox::new(&config.toolchain, config.execution.time_limit());
    let status = sandbox.run(&workdir).await?;
    if status.timed_out() {
        return Ok(provisional);
    }

    let record = match classifier::classify(&workdir)? {
        Classification::Suite(blocks) => {
            let record = JobRecord::suite(
                job.implementation.clone(),
                workdir.suite_file(),
                blocks,
            );
            ResultWriter::write(&workdir, &record)?;
            classifier::cleanup(&workdir)?;
            record
        }
        Classification::Failed(kind) => {
            let record =
                JobRecord::failure(job.implementation.clone(), workdir.suite_file(), kind);
            ResultWriter::write(&workdir, &record)?;
            record
        }
        Classification::ProvisionalStands => {
            // A run that exits with no output and no error is not a real
            // timeout; surface it for investigation.
            warn!(
                "job {} produced no output and no error; provisional timeout stands",
                job.dir_name
            );
            provisional
        }
    };

    Ok(record)
}
