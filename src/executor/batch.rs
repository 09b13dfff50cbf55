//! Batch scheduler
//!
//! Fans the per-job pipeline out across a fixed-size worker pool. Jobs are
//! independent: no ordering guarantees, no retries, and no job touches
//! another job's working directory. A worker that dies still yields a
//! record for its job, so a batch always finishes with one record per job.

use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use std::fs;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::cache::BuildCache;
use crate::config::GraderConfig;
use crate::models::Job;
use crate::results::BatchSummary;

use super::pipeline::{execute_job, unknown_record, write_fallback};

/// Executes one batch of jobs
pub struct BatchExecutor {
    config: Arc<GraderConfig>,
    cache: Arc<BuildCache>,
}

impl BatchExecutor {
    pub fn new(config: GraderConfig) -> Self {
        let cache = Arc::new(BuildCache::new(config.layout.cache.clone()));
        Self {
            config: Arc::new(config),
            cache,
        }
    }

    /// Run every job and return the batch summary.
    ///
    /// The results tree is cleared and recreated first; whatever records are
    /// on disk afterwards are the batch's authoritative output.
    pub async fn run(&self, jobs: Vec<Job>) -> Result<BatchSummary> {
        self.reset_results()?;
        fs::create_dir_all(self.cache.root()).context("Failed to create cache directory")?;

        let workers = self.config.execution.worker_count();
        let started_at = Utc::now();
        info!("running {} jobs on {} workers", jobs.len(), workers);

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut fallbacks = Vec::with_capacity(jobs.len());
        let mut handles = Vec::with_capacity(jobs.len());

        for job in jobs {
            let semaphore = semaphore.clone();
            let config = self.config.clone();
            let cache = self.cache.clone();
            fallbacks.push(job.clone());

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("worker semaphore closed");
                execute_job(config, cache, job).await
            }));
        }

        let mut records = Vec::with_capacity(handles.len());
        for (fallback, outcome) in fallbacks.into_iter().zip(join_all(handles).await) {
            match outcome {
                Ok(record) => records.push(record),
                Err(err) => {
                    // A panicked worker must not cost the batch its record.
                    warn!("worker for {} died: {err}", fallback.dir_name);
                    let record = unknown_record(&self.config, &fallback);
                    write_fallback(&self.config, &fallback, &record);
                    records.push(record);
                }
            }
        }

        let summary = BatchSummary::new(started_at, Utc::now(), records);
        info!(
            "batch {} finished: {}/{} ok in {}ms",
            summary.id,
            summary.ok_count(),
            summary.total(),
            summary.duration_ms()
        );
        Ok(summary)
    }

    fn reset_results(&self) -> Result<()> {
        let results = &self.config.layout.results;
        if results.exists() {
            fs::remove_dir_all(results)
                .with_context(|| format!("Failed to clear {}", results.display()))?;
        }
        fs::create_dir_all(results)
            .with_context(|| format!("Failed to create {}", results.display()))?;
        Ok(())
    }
}
