//! Grading job and submission models
//!
//! A job pairs one implementation with one test suite.

#![allow(dead_code)]

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::utils::fs::{basename, walk_files};

/// The three disjoint job categories of a grading batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobCategory {
    /// Submission implementation against instructor test suites
    Functionality,
    /// Reference-correct implementation against the submission's tests
    Wheat,
    /// Intentionally-buggy implementation against the submission's tests
    Chaff,
}

impl JobCategory {
    pub fn name(&self) -> &'static str {
        match self {
            JobCategory::Functionality => "Functionality",
            JobCategory::Wheat => "Wheat",
            JobCategory::Chaff => "Chaff",
        }
    }

    pub fn all() -> Vec<JobCategory> {
        vec![
            JobCategory::Functionality,
            JobCategory::Wheat,
            JobCategory::Chaff,
        ]
    }
}

impl fmt::Display for JobCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One unit of grading work
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// The primary implementation file, already import-resolved
    pub implementation: PathBuf,

    /// The test-suite file to copy into the working directory
    pub test_suite: PathBuf,

    /// Directory against which the suite's common references resolve
    pub common_dir: PathBuf,

    /// Which matrix category this job belongs to
    pub category: JobCategory,

    /// Working-directory name; unique within a batch
    pub dir_name: String,
}

impl Job {
    /// Create a job; the directory name joins the two basenames with `;`.
    pub fn new(
        implementation: impl Into<PathBuf>,
        test_suite: impl Into<PathBuf>,
        common_dir: impl Into<PathBuf>,
        category: JobCategory,
    ) -> Self {
        let implementation = implementation.into();
        let test_suite = test_suite.into();
        let dir_name = format!("{};{}", basename(&implementation), basename(&test_suite));
        Self {
            implementation,
            test_suite,
            common_dir: common_dir.into(),
            category,
            dir_name,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} x {}",
            self.category,
            basename(&self.implementation),
            basename(&self.test_suite)
        )
    }
}

/// The student artifacts a batch grades, materialized by an external
/// collaborator.
///
/// One operating mode ships a single code file; the other adds separate
/// common-support and test-suite files.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// The submitted implementation file
    pub code: PathBuf,

    /// Separate common-support file, when the assignment uses one
    pub common: Option<PathBuf>,

    /// The submission's own test suite, required for wheat/chaff jobs
    pub tests: Option<PathBuf>,
}

impl Submission {
    pub fn new(code: impl Into<PathBuf>) -> Self {
        Self {
            code: code.into(),
            common: None,
            tests: None,
        }
    }

    pub fn with_common(mut self, common: impl Into<PathBuf>) -> Self {
        self.common = Some(common.into());
        self
    }

    pub fn with_tests(mut self, tests: impl Into<PathBuf>) -> Self {
        self.tests = Some(tests.into());
        self
    }

    /// Directory used to resolve common references in every suite copy.
    pub fn common_dir(&self) -> PathBuf {
        let anchor = self.common.as_deref().unwrap_or(&self.code);
        anchor.parent().unwrap_or(Path::new(".")).to_path_buf()
    }

    /// Locate submission files under `dir` by filename convention.
    ///
    /// Thin convenience wrapper over the directory walk; the engine itself
    /// only ever sees the resolved paths.
    pub fn discover(dir: &Path) -> Result<Self> {
        let mut code = None;
        let mut common = None;
        let mut tests = None;

        for path in walk_files(dir)? {
            let name = basename(&path);
            if name.contains("common") {
                common = Some(path);
            } else if name.contains("tests") {
                tests = Some(path);
            } else if name.contains("code") {
                code = Some(path);
            }
        }

        let Some(code) = code else {
            bail!("No code file found under {}", dir.display());
        };

        Ok(Self {
            code,
            common,
            tests,
        })
    }
}
