//! Configuration module
//!
//! Every path and limit the engine uses is carried by one explicit
//! `GraderConfig` value constructed at startup and passed into the
//! components; there is no ambient global state.

#![allow(dead_code)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file locations (in order of precedence)
const CONFIG_LOCATIONS: &[&str] = &[
    "./pyret-grader.yaml",
    "./pyret-grader.yml",
    "./pyret-grader.json",
];

/// Complete grader configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct GraderConfig {
    /// Directory layout of the grading environment
    #[serde(default)]
    pub layout: LayoutConfig,

    /// External toolchain invocation
    #[serde(default)]
    pub toolchain: ToolchainConfig,

    /// Which wheat/chaff jobs to include
    #[serde(default)]
    pub selection: JobSelection,

    /// Parallelism and deadlines
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl GraderConfig {
    /// Load configuration from file, by extension (YAML or JSON).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Self = if is_yaml(path.as_ref()) {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        Ok(config)
    }

    /// Save configuration to file, by extension (YAML or JSON).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = if is_yaml(path.as_ref()) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Find a configuration file in the standard locations.
    pub fn find() -> Option<PathBuf> {
        for location in CONFIG_LOCATIONS {
            let path = PathBuf::from(location);
            if path.exists() {
                return Some(path);
            }
        }

        dirs::config_dir()
            .map(|d| d.join("pyret-grader").join("config.yaml"))
            .filter(|p| p.exists())
    }

    /// Load from the first discovered file, falling back to defaults.
    pub fn load_default() -> Result<Self> {
        match Self::find() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

/// Directory layout of the grading environment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Student submission directory
    pub submission: PathBuf,

    /// Distributed starter-code template directory
    pub stencil: PathBuf,

    /// Instructor corpus root (tests/, impls/wheat/, impls/chaff/)
    pub instructor: PathBuf,

    /// Results tree, cleared and recreated at batch start
    pub results: PathBuf,

    /// Shared build cache root
    pub cache: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let root = PathBuf::from("/autograder");
        let source = root.join("source").join("autograder");
        Self {
            submission: root.join("submission"),
            stencil: source.join("stencil"),
            instructor: source.join("instructor"),
            results: root.join("results"),
            cache: source.join("cache"),
        }
    }
}

impl LayoutConfig {
    pub fn tests_dir(&self) -> PathBuf {
        self.instructor.join("tests")
    }

    pub fn wheats_dir(&self) -> PathBuf {
        self.instructor.join("impls").join("wheat")
    }

    pub fn chaffs_dir(&self) -> PathBuf {
        self.instructor.join("impls").join("chaff")
    }
}

/// External Pyret toolchain invocation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Node binary
    pub node: String,

    /// Pyret compiler checkout; the compiler resolves its resource paths
    /// relative to this directory
    pub pyret_dir: PathBuf,

    /// Compiler entry point, relative to `pyret_dir` unless absolute
    pub compiler: PathBuf,

    /// Standalone runner file linked into every compiled artifact
    pub runner: PathBuf,

    /// Builtin JS module directory, relative to `pyret_dir`
    pub builtin_js_dir: String,

    /// Builtin Pyret module directory, relative to `pyret_dir`
    pub builtin_arr_dir: String,

    /// Standalone require configuration, relative to `pyret_dir`
    pub require_config: String,

    /// NODE_PATH for both compilation and execution
    pub node_modules: PathBuf,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        let pyret_dir = PathBuf::from("/autograder/pyret-lang");
        Self {
            node: "node".to_string(),
            node_modules: pyret_dir.join("node_modules"),
            pyret_dir,
            compiler: PathBuf::from("build/phaseA/pyret.jarr"),
            runner: PathBuf::from("/autograder/source/autograder/runner.js"),
            builtin_js_dir: "src/js/trove/".to_string(),
            builtin_arr_dir: "src/arr/trove".to_string(),
            require_config: "src/scripts/standalone-configA.json".to_string(),
        }
    }
}

impl ToolchainConfig {
    /// Absolute compiler entry point.
    pub fn compiler_path(&self) -> PathBuf {
        if self.compiler.is_absolute() {
            self.compiler.clone()
        } else {
            self.pyret_dir.join(&self.compiler)
        }
    }
}

/// Which wheat/chaff jobs a batch includes
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobSelection {
    /// Run wheats against the submission's tests
    pub use_wheats: bool,

    /// Allow-list of chaff file names; `None` runs all chaffs
    pub chaffs: Option<Vec<String>>,
}

impl Default for JobSelection {
    fn default() -> Self {
        Self {
            use_wheats: true,
            chaffs: None,
        }
    }
}

impl JobSelection {
    /// Whether the chaff named `name` is selected.
    pub fn includes_chaff(&self, name: &str) -> bool {
        match &self.chaffs {
            Some(allowed) => allowed.iter().any(|c| c == name),
            None => true,
        }
    }
}

/// Parallelism and deadline settings
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ExecutionConfig {
    /// Worker pool size; defaults to the host's available parallelism
    pub max_concurrent: Option<usize>,

    /// In-engine wall-clock limit per job run; `None` defers cancellation
    /// entirely to an external supervisor kill
    pub time_limit_secs: Option<u64>,
}

impl ExecutionConfig {
    pub fn worker_count(&self) -> usize {
        self.max_concurrent.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs)
    }
}
