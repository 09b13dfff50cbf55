//! Outcome classification
//!
//! Turns a job's captured streams into exactly one taxonomy outcome. The
//! error log takes priority: any content there means the run failed, with a
//! memory-exhaustion marker distinguishing OutOfMemory from Runtime. A
//! non-empty raw-output file becomes the Ok outcome, filtered down to the
//! blocks attributable to the copied suite file. When both streams are
//! empty the provisional Timeout record on disk stands.

#![allow(dead_code)]

use anyhow::{Context, Result};
use std::fs;
use tracing::debug;

use crate::models::{FailureKind, TestBlock, WorkDirectory, COPIED_SUITE};
use crate::utils::fs::nonempty;

/// Substring of the error log marking memory exhaustion
pub const MEMORY_MARKER: &str = "memory";

/// Classification of a completed (non-killed) run
#[derive(Debug, PartialEq, Eq)]
pub enum Classification {
    /// Suite-attributed blocks parsed from the raw output
    Suite(Vec<TestBlock>),
    /// The run failed; the record becomes `Err(kind)`
    Failed(FailureKind),
    /// Neither stream has content; the provisional record is not replaced
    ProvisionalStands,
}

/// Classify the streams captured in `workdir`.
///
/// Malformed raw output is an error and degrades at the pipeline boundary;
/// everything else maps onto the taxonomy.
pub fn classify(workdir: &WorkDirectory) -> Result<Classification> {
    let error_log = workdir.error_log();
    if nonempty(&error_log) {
        let text = fs::read_to_string(&error_log)
            .with_context(|| format!("Failed to read {}", error_log.display()))?;

        let kind = if text.contains(MEMORY_MARKER) {
            FailureKind::OutOfMemory
        } else {
            FailureKind::Runtime
        };
        return Ok(Classification::Failed(kind));
    }

    let raw_output = workdir.raw_output();
    if nonempty(&raw_output) {
        let text = fs::read_to_string(&raw_output)
            .with_context(|| format!("Failed to read {}", raw_output.display()))?;
        let mut blocks: Vec<TestBlock> = serde_json::from_str(&text)
            .with_context(|| format!("Malformed raw output in {}", raw_output.display()))?;

        // Keep only blocks located in the copied suite; assertions raised
        // from included implementation or library code are not the suite's.
        let before = blocks.len();
        blocks.retain(|block| block.loc.contains(COPIED_SUITE));
        debug!(
            "kept {}/{} blocks from {}",
            blocks.len(),
            before,
            raw_output.display()
        );

        return Ok(Classification::Suite(blocks));
    }

    Ok(Classification::ProvisionalStands)
}

/// Delete the error log and compiled artifact after a clean Ok outcome.
///
/// Err outcomes keep both for diagnosis.
pub fn cleanup(workdir: &WorkDirectory) -> Result<()> {
    for path in [workdir.error_log(), workdir.artifact()] {
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
    }
    Ok(())
}
