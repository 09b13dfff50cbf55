//! Job matrix construction
//!
//! Enumerates the three job categories of a batch (submission against
//! instructor suites, wheats against the submission's suite, chaffs against
//! the submission's suite) and pre-resolves the implementation files every
//! category depends on.

#![allow(dead_code)]

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::GraderConfig;
use crate::models::{Job, JobCategory, Submission};
use crate::resolver::fix_imports;
use crate::utils::fs::{basename, sorted_files};

/// Documentation marker file skipped in every corpus directory
pub const DOC_MARKER: &str = "README";

/// Builds the job list for one batch
pub struct MatrixBuilder<'a> {
    config: &'a GraderConfig,
    submission: &'a Submission,
}

impl<'a> MatrixBuilder<'a> {
    pub fn new(config: &'a GraderConfig, submission: &'a Submission) -> Self {
        Self { config, submission }
    }

    /// Enumerate the matrix without touching any file.
    ///
    /// instructor-tests × {submission} ∪ (wheats × {submission tests}, if
    /// enabled) ∪ (allow-listed chaffs × {submission tests}), with pairwise
    /// distinct working-directory names.
    pub fn plan(&self) -> Result<Vec<Job>> {
        let layout = &self.config.layout;
        let selection = &self.config.selection;
        let common_dir = self.submission.common_dir();

        let mut jobs = Vec::new();

        for suite in corpus_files(&layout.tests_dir())? {
            jobs.push(Job::new(
                &self.submission.code,
                suite,
                &common_dir,
                JobCategory::Functionality,
            ));
        }

        if selection.use_wheats {
            let wheats = corpus_files(&layout.wheats_dir())?;
            if !wheats.is_empty() {
                let suite = self.submission_suite()?;
                for wheat in wheats {
                    jobs.push(Job::new(wheat, suite, &common_dir, JobCategory::Wheat));
                }
            }
        }

        let chaffs: Vec<PathBuf> = corpus_files(&layout.chaffs_dir())?
            .into_iter()
            .filter(|chaff| selection.includes_chaff(&basename(chaff)))
            .collect();
        if !chaffs.is_empty() {
            let suite = self.submission_suite()?;
            for chaff in chaffs {
                jobs.push(Job::new(chaff, suite, &common_dir, JobCategory::Chaff));
            }
        }

        disambiguate(&mut jobs);

        info!(
            "planned {} jobs ({} functionality, {} wheat, {} chaff)",
            jobs.len(),
            count(&jobs, JobCategory::Functionality),
            count(&jobs, JobCategory::Wheat),
            count(&jobs, JobCategory::Chaff),
        );

        Ok(jobs)
    }

    /// Resolve the submission and every planned implementation, then return
    /// the matrix ready for execution.
    pub fn build(&self) -> Result<Vec<Job>> {
        self.prepare_submission()?;

        let jobs = self.plan()?;
        for job in &jobs {
            if job.category == JobCategory::Functionality {
                continue;
            }
            // Wheats and chaffs resolve against their own directory.
            let own_dir = job.implementation.parent().unwrap_or(Path::new("."));
            debug!("resolving imports of {}", job.implementation.display());
            fix_imports(
                &job.implementation,
                &self.config.layout.stencil,
                &job.implementation,
                own_dir,
            )?;
        }

        Ok(jobs)
    }

    /// Resolve the student's common and code files against the submission
    /// directory.
    fn prepare_submission(&self) -> Result<()> {
        let stencil = &self.config.layout.stencil;
        let submission_dir = &self.config.layout.submission;

        if let Some(common) = &self.submission.common {
            fix_imports(common, stencil, &self.submission.code, submission_dir)
                .context("Failed to resolve submission common file")?;
        }

        fix_imports(
            &self.submission.code,
            stencil,
            &self.submission.code,
            submission_dir,
        )
        .context("Failed to resolve submission code file")?;

        Ok(())
    }

    fn submission_suite(&self) -> Result<&PathBuf> {
        match &self.submission.tests {
            Some(suite) => Ok(suite),
            None => bail!("Submission has no test suite but wheat/chaff jobs are selected"),
        }
    }
}

/// Files of one corpus directory, sorted, with the documentation marker
/// skipped. A missing directory is an empty category.
fn corpus_files(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(sorted_files(dir)?
        .into_iter()
        .filter(|path| basename(path) != DOC_MARKER)
        .collect())
}

/// Make working-directory names pairwise distinct by suffixing collisions.
fn disambiguate(jobs: &mut [Job]) {
    let mut seen: HashSet<String> = HashSet::new();

    for job in jobs.iter_mut() {
        if seen.insert(job.dir_name.clone()) {
            continue;
        }

        let mut n = 2;
        loop {
            let candidate = format!("{}~{}", job.dir_name, n);
            if seen.insert(candidate.clone()) {
                job.dir_name = candidate;
                break;
            }
            n += 1;
        }
    }
}

fn count(jobs: &[Job], category: JobCategory) -> usize {
    jobs.iter().filter(|j| j.category == category).count()
}
