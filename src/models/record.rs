//! Result records
//!
//! The wire format persisted as `results.json`, one record per job, consumed
//! downstream by the reporting pipeline.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One test assertion, attributed to a source location
#[derive(Clone, Debug, Serialize, Deserialize, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct TestEntry {
    pub loc: String,
    pub passed: bool,
}

/// One check block from the runner's structured output
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestBlock {
    pub name: String,
    pub loc: String,
    pub error: bool,
    pub tests: Vec<TestEntry>,
}

impl TestBlock {
    /// (passed, total) across this block's assertions.
    pub fn tally(&self) -> (usize, usize) {
        let passed = self.tests.iter().filter(|t| t.passed).count();
        (passed, self.tests.len())
    }
}

/// Failure taxonomy for a job that produced no usable test output
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Unexpected pipeline failure; never produced by classification itself
    Unknown,
    /// Toolchain failed or emitted an empty artifact
    Compilation,
    /// Error log carries the memory-exhaustion marker
    OutOfMemory,
    /// Provisional default; final only when nothing overwrote it
    Timeout,
    /// Any other non-empty error log
    Runtime,
}

impl FailureKind {
    pub fn name(&self) -> &'static str {
        match self {
            FailureKind::Unknown => "Unknown",
            FailureKind::Compilation => "Compilation",
            FailureKind::OutOfMemory => "OutOfMemory",
            FailureKind::Timeout => "Timeout",
            FailureKind::Runtime => "Runtime",
        }
    }

    pub fn all() -> Vec<FailureKind> {
        vec![
            FailureKind::Unknown,
            FailureKind::Compilation,
            FailureKind::OutOfMemory,
            FailureKind::Timeout,
            FailureKind::Runtime,
        ]
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The persisted result record for one job
///
/// Serializes as `{"code": …, "tests": …, "result": {"Ok": […]}}` or
/// `{"result": {"Err": "<kind>"}}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobRecord {
    #[serde(rename = "code")]
    pub implementation: PathBuf,

    #[serde(rename = "tests")]
    pub test_suite: PathBuf,

    pub result: Result<Vec<TestBlock>, FailureKind>,
}

impl JobRecord {
    /// Successful record carrying the suite-attributed blocks.
    pub fn suite(
        implementation: impl Into<PathBuf>,
        test_suite: impl Into<PathBuf>,
        blocks: Vec<TestBlock>,
    ) -> Self {
        Self {
            implementation: implementation.into(),
            test_suite: test_suite.into(),
            result: Ok(blocks),
        }
    }

    /// Failure record of the given kind.
    pub fn failure(
        implementation: impl Into<PathBuf>,
        test_suite: impl Into<PathBuf>,
        kind: FailureKind,
    ) -> Self {
        Self {
            implementation: implementation.into(),
            test_suite: test_suite.into(),
            result: Err(kind),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.result.as_ref().err().copied()
    }

    /// (passed, total) across all blocks; (0, 0) for failures.
    pub fn tally(&self) -> (usize, usize) {
        match &self.result {
            Ok(blocks) => blocks.iter().fold((0, 0), |(p, t), block| {
                let (bp, bt) = block.tally();
                (p + bp, t + bt)
            }),
            Err(_) => (0, 0),
        }
    }

    /// Whether every assertion in every block passed and none errored.
    pub fn all_passed(&self) -> bool {
        match &self.result {
            Ok(blocks) => blocks
                .iter()
                .all(|b| !b.error && b.tests.iter().all(|t| t.passed)),
            Err(_) => false,
        }
    }

    /// Category probes on the implementation path, matching the downstream
    /// reporting convention.
    pub fn is_wheat(&self) -> bool {
        self.implementation.to_string_lossy().contains("wheat")
    }

    pub fn is_chaff(&self) -> bool {
        self.implementation.to_string_lossy().contains("chaff")
    }
}

impl fmt::Display for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let impl_name = self
            .implementation
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match &self.result {
            Ok(_) => {
                let (passed, total) = self.tally();
                write!(f, "✓ {impl_name}: {passed}/{total} passed")
            }
            Err(kind) => write!(f, "✗ {impl_name}: {kind}"),
        }
    }
}
