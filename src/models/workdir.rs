//! Per-job working directory
//!
//! An ephemeral, job-exclusive directory under the results root. Owns the
//! copied suite, the compiled artifact, both captured streams, and the
//! result record; never shared between jobs or reused across batches.

#![allow(dead_code)]

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::Job;

/// Name the suite file is copied to inside the working directory
pub const COPIED_SUITE: &str = "tests.arr";

/// Name of the compiled standalone artifact
pub const ARTIFACT_FILE: &str = "tests.js";

/// Captured stderr of both the toolchain and the run
pub const ERROR_LOG: &str = "error.txt";

/// Captured stdout of the run
pub const RAW_OUTPUT: &str = "raw.json";

/// The persisted result record
pub const RESULT_FILE: &str = "results.json";

/// Filesystem scope owned by exactly one job
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkDirectory {
    root: PathBuf,
}

impl WorkDirectory {
    /// Create the directory for `job` under `results_root`.
    ///
    /// Fails if the directory already exists; workdir names are unique
    /// within a batch and the results tree is cleared at batch start.
    pub fn create(results_root: &Path, job: &Job) -> Result<Self> {
        let root = results_root.join(&job.dir_name);
        fs::create_dir(&root)
            .with_context(|| format!("Failed to create work directory {}", root.display()))?;
        Ok(Self { root })
    }

    /// Wrap an existing directory (used when scanning results back in).
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn suite_file(&self) -> PathBuf {
        self.root.join(COPIED_SUITE)
    }

    pub fn artifact(&self) -> PathBuf {
        self.root.join(ARTIFACT_FILE)
    }

    pub fn error_log(&self) -> PathBuf {
        self.root.join(ERROR_LOG)
    }

    pub fn raw_output(&self) -> PathBuf {
        self.root.join(RAW_OUTPUT)
    }

    pub fn result_file(&self) -> PathBuf {
        self.root.join(RESULT_FILE)
    }
}
