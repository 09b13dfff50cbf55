//! Shared fixtures for executor tests: a tempdir grading layout wired to a
//! stub shell toolchain.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::BuildCache;
use crate::compiler::stubs::stub_toolchain;
use crate::config::GraderConfig;

pub(crate) struct Fixture {
    pub _dir: tempfile::TempDir,
    pub config: Arc<GraderConfig>,
    pub cache: Arc<BuildCache>,
    pub submission_dir: PathBuf,
}

/// A config whose toolchain is a stub shell compiler running `compiler_body`
/// with `$src` and `$out` bound.
pub(crate) fn fixture(compiler_body: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let submission_dir = root.join("submission");
    fs::create_dir_all(&submission_dir).unwrap();
    fs::create_dir_all(root.join("stencil")).unwrap();
    fs::create_dir_all(root.join("results")).unwrap();

    let mut config = GraderConfig::default();
    config.layout.submission = submission_dir.clone();
    config.layout.stencil = root.join("stencil");
    config.layout.instructor = root.join("instructor");
    config.layout.results = root.join("results");
    config.layout.cache = root.join("cache");
    config.toolchain = stub_toolchain(root, compiler_body);

    let cache = Arc::new(BuildCache::new(config.layout.cache.clone()));

    Fixture {
        _dir: dir,
        config: Arc::new(config),
        cache,
        submission_dir,
    }
}

/// A suite file with one unresolved code import and one check.
pub(crate) fn write_suite(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(
        &path,
        "import my-gdrive(\"hw-code.arr\") as C\ncheck: 1 is 1 end\n",
    )
    .unwrap();
    path
}

/// Compiler stub body producing an artifact that emits `json` on stdout.
pub(crate) fn emitting_compiler(json: &str) -> String {
    String::from("cat > \"$out\" <<'ART'\n#!/bin/sh\ncat <<'JSON'\n") + json + "\nJSON\nART"
}
