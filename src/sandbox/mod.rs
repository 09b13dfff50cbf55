//! Execution sandbox
//!
//! Runs a compiled artifact as a subprocess inside its job's working
//! directory, with stdout captured to the raw-output file and stderr
//! appended to the error log.
//!
//! Cancellation contract: the pipeline writes the provisional
//! `Err(Timeout)` record before this component launches anything, so
//! whatever record is on disk when an external supervisor kills the batch is
//! authoritative. When a time limit is configured the sandbox additionally
//! enforces it in-engine, killing the child and leaving that provisional
//! record as the detected outcome.

#![allow(dead_code)]

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ToolchainConfig;
use crate::models::WorkDirectory;

/// How a sandboxed run ended
#[derive(Debug)]
pub enum RunStatus {
    /// The subprocess ran to completion; streams are ready to classify
    Exited(std::process::ExitStatus),
    /// The in-engine deadline fired and the subprocess was killed
    DeadlineExceeded,
}

impl RunStatus {
    pub fn timed_out(&self) -> bool {
        matches!(self, RunStatus::DeadlineExceeded)
    }
}

/// Runs one compiled artifact per call
pub struct ExecutionSandbox {
    node: String,
    node_modules: std::path::PathBuf,
    time_limit: Option<Duration>,
}

impl ExecutionSandbox {
    pub fn new(toolchain: &ToolchainConfig, time_limit: Option<Duration>) -> Self {
        Self {
            node: toolchain.node.clone(),
            node_modules: toolchain.node_modules.clone(),
            time_limit,
        }
    }

    /// Run the work directory's artifact.
    ///
    /// The exit status is not inspected here; classification is based
    /// entirely on the captured streams.
    pub async fn run(&self, workdir: &WorkDirectory) -> Result<RunStatus> {
        let raw_output = File::create(workdir.raw_output())
            .with_context(|| format!("Failed to create {}", workdir.raw_output().display()))?;
        let error_log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(workdir.error_log())
            .with_context(|| format!("Failed to open {}", workdir.error_log().display()))?;

        debug!("running artifact {}", workdir.artifact().display());

        let mut child = Command::new(&self.node)
            .arg(workdir.artifact())
            .current_dir(workdir.path())
            .env("NODE_PATH", &self.node_modules)
            .stdin(Stdio::null())
            .stdout(Stdio::from(raw_output))
            .stderr(Stdio::from(error_log))
            .spawn()
            .context("Failed to launch artifact")?;

        let Some(limit) = self.time_limit else {
            let status = child.wait().await.context("Failed to wait for artifact")?;
            return Ok(RunStatus::Exited(status));
        };

        match timeout(limit, child.wait()).await {
            Ok(status) => Ok(RunStatus::Exited(
                status.context("Failed to wait for artifact")?,
            )),
            Err(_) => {
                warn!(
                    "run exceeded {}s limit in {}; killing",
                    limit.as_secs(),
                    workdir.path().display()
                );
                child.start_kill().ok();
                let _ = child.wait().await;
                Ok(RunStatus::DeadlineExceeded)
            }
        }
    }
}
