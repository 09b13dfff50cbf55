//! Compiler invocation
//!
//! Drives the external Pyret toolchain to turn a resolved test-suite file
//! into a standalone runnable artifact inside the job's working directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::config::ToolchainConfig;
use crate::models::WorkDirectory;
use crate::utils::fs::nonempty;

/// Ways a compilation fails
///
/// Every variant downgrades the owning job to `Err(Compilation)`; none of
/// them aborts the batch.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Failed to launch toolchain: {0}")]
    Launch(#[source] std::io::Error),

    #[error("Toolchain exited with {0}")]
    Toolchain(std::process::ExitStatus),

    /// The toolchain does not always signal failure via exit status, so an
    /// absent or zero-length artifact is an independent failure.
    #[error("Compiled artifact missing or empty: {}", .0.display())]
    EmptyArtifact(PathBuf),

    #[error("Could not open error log: {0}")]
    ErrorLog(#[source] std::io::Error),
}

/// Invokes the external toolchain for one job at a time
pub struct CompilerInvoker {
    toolchain: ToolchainConfig,
}

impl CompilerInvoker {
    pub fn new(toolchain: ToolchainConfig) -> Self {
        Self { toolchain }
    }

    /// Compile the work directory's suite file into its artifact.
    ///
    /// Toolchain stderr is appended to the job's error log; intermediate
    /// artifacts of shared modules go to `cache_dir`.
    pub async fn compile(
        &self,
        workdir: &WorkDirectory,
        cache_dir: &Path,
    ) -> Result<PathBuf, CompileError> {
        let t = &self.toolchain;
        let artifact = workdir.artifact();

        let error_log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(workdir.error_log())
            .map_err(CompileError::ErrorLog)?;

        debug!(
            "compiling {} -> {}",
            workdir.suite_file().display(),
            artifact.display()
        );

        let status = Command::new(&t.node)
            .arg(t.compiler_path())
            .arg("-no-display-progress")
            .arg("--build-runnable")
            .arg(workdir.suite_file())
            .arg("--outfile")
            .arg(&artifact)
            .arg("--standalone-file")
            .arg(&t.runner)
            .arg("--builtin-js-dir")
            .arg(&t.builtin_js_dir)
            .arg("--builtin-arr-dir")
            .arg(&t.builtin_arr_dir)
            .arg("--compiled-dir")
            .arg(cache_dir)
            .arg("--require-config")
            .arg(&t.require_config)
            .current_dir(&t.pyret_dir)
            .env("NODE_PATH", &t.node_modules)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(error_log))
            .status()
            .await
            .map_err(CompileError::Launch)?;

        if !status.success() {
            return Err(CompileError::Toolchain(status));
        }

        if !nonempty(&artifact) {
            return Err(CompileError::EmptyArtifact(artifact));
        }

        Ok(artifact)
    }
}


#[cfg(test)]
mod tests {
    use super::stubs::stub_toolchain;
    use super::*;
    use crate::models::{Job, JobCategory};
    use std::fs;

    fn fixture() -> (tempfile::TempDir, WorkDirectory) {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        fs::create_dir_all(&results).unwrap();

        let job = Job::new("/s/x-code.arr", "/i/t1.arr", "/s", JobCategory::Functionality);
        let workdir = WorkDirectory::create(&results, &job).unwrap();
        fs::write(workdir.suite_file(), "check: 1 is 1 end\n").unwrap();

        (dir, workdir)
    }

    #[tokio::test]
    async fn test_compile_success_produces_artifact() {
        let (dir, workdir) = fixture();
        let toolchain = stub_toolchain(dir.path(), "cp \"$src\" \"$out\"");
        let cache = dir.path().join("cache");
        fs::create_dir_all(&cache).unwrap();

        let invoker = CompilerInvoker::new(toolchain);
        let artifact = invoker.compile(&workdir, &cache).await.unwrap();

        assert_eq!(artifact, workdir.artifact());
        assert!(nonempty(&artifact));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_compile_error() {
        let (dir, workdir) = fixture();
        let toolchain = stub_toolchain(dir.path(), "echo 'parse error' >&2; exit 1");
        let cache = dir.path().join("cache");
        fs::create_dir_all(&cache).unwrap();

        let invoker = CompilerInvoker::new(toolchain);
        let err = invoker.compile(&workdir, &cache).await.unwrap_err();

        assert!(matches!(err, CompileError::Toolchain(_)));
        assert!(nonempty(&workdir.error_log()));
        assert!(!workdir.raw_output().exists());
    }

    #[tokio::test]
    async fn test_empty_artifact_is_compile_error() {
        let (dir, workdir) = fixture();
        // Clean exit without writing the artifact; the independent check
        // must still flag it.
        let toolchain = stub_toolchain(dir.path(), "exit 0");
        let cache = dir.path().join("cache");
        fs::create_dir_all(&cache).unwrap();

        let invoker = CompilerInvoker::new(toolchain);
        let err = invoker.compile(&workdir, &cache).await.unwrap_err();

        assert!(matches!(err, CompileError::EmptyArtifact(_)));
    }

    #[tokio::test]
    async fn test_missing_toolchain_is_launch_error() {
        let (dir, workdir) = fixture();
        let mut toolchain = stub_toolchain(dir.path(), "exit 0");
        toolchain.node = "/nonexistent/node".to_string();
        let cache = dir.path().join("cache");
        fs::create_dir_all(&cache).unwrap();

        let invoker = CompilerInvoker::new(toolchain);
        let err = invoker.compile(&workdir, &cache).await.unwrap_err();

        assert!(matches!(err, CompileError::Launch(_)));
    }
}
