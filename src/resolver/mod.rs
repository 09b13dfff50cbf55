//! Import resolution
//!
//! Rewrites symbolic gdrive-style imports in Pyret source text into direct
//! `file("…")` references. Rewriting is structural: each occurrence is parsed
//! into a tagged reference and replaced span-by-span, so every byte outside a
//! match is preserved and re-resolving an already-resolved file is a no-op
//! (the output form matches none of the input forms).

#![allow(dead_code)]

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::fs::{basename, relative_path};

/// Source extension the legacy script form translates to
pub const SOURCE_EXT: &str = ".arr";

/// Extension carried by legacy shared-script references
pub const SCRIPT_EXT: &str = ".js";

const MODULE_OPENER: &str = "my-gdrive(";
const SHARED_OPENER: &str = "shared-gdrive(";
const LEGACY_OPENER: &str = "gdrive-js(";

/// Which module reference a `my-gdrive` import names
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleKind {
    /// The counterpart implementation file (`*-code.arr`)
    Code,
    /// The common support module (`*-common.arr`)
    Common,
}

impl ModuleKind {
    fn suffix(&self) -> &'static str {
        match self {
            ModuleKind::Code => "-code.arr",
            ModuleKind::Common => "-common.arr",
        }
    }
}

/// Rewrites the imports of one source file
///
/// `resolve` handles module references against a caller-chosen directory;
/// `finalize` handles shared and legacy-script references against the stencil
/// directory and writes the file back.
pub struct ImportResolver {
    path: PathBuf,
    dir: PathBuf,
    stencil_dir: PathBuf,
    content: String,
}

impl ImportResolver {
    /// Read `path` and prepare to resolve against `stencil_dir`.
    pub fn open(path: impl Into<PathBuf>, stencil_dir: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        Ok(Self {
            path,
            dir,
            stencil_dir: stencil_dir.into(),
            content,
        })
    }

    /// Rewrite every `my-gdrive` reference of `kind` to a direct reference
    /// into `target_dir`.
    ///
    /// With `filename` the direct reference names that file; without it the
    /// matched filename is reused verbatim. Absent patterns are a no-op.
    pub fn resolve(
        &mut self,
        kind: ModuleKind,
        target_dir: &Path,
        filename: Option<&str>,
    ) -> &mut Self {
        let rel = relative_path(&self.dir, target_dir);
        self.content = rewrite(&self.content, MODULE_OPENER, parse_module, |matched| {
            if !matched.ends_with(kind.suffix()) {
                return None;
            }
            let name = filename.unwrap_or(matched);
            Some(direct_reference(&rel, name))
        });
        self
    }

    /// Rewrite shared and legacy-script references into the stencil
    /// directory, then write the file back.
    pub fn finalize(mut self) -> Result<()> {
        let rel = relative_path(&self.dir, &self.stencil_dir);

        self.content = rewrite(&self.content, SHARED_OPENER, parse_with_metadata, |id| {
            Some(direct_reference(&rel, id))
        });

        self.content = rewrite(&self.content, LEGACY_OPENER, parse_with_metadata, |id| {
            let stem = id.strip_suffix(SCRIPT_EXT)?;
            Some(direct_reference(&rel, &format!("{stem}{SOURCE_EXT}")))
        });

        fs::write(&self.path, &self.content)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }

    /// Resolved text without writing; used by callers that only inspect.
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Standard resolution for one file: code references to `code_path`, common
/// references to `common_dir`, then shared/legacy finalization.
pub fn fix_imports(
    path: &Path,
    stencil_dir: &Path,
    code_path: &Path,
    common_dir: &Path,
) -> Result<()> {
    let code_dir = code_path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let code_name = basename(code_path);

    let mut resolver = ImportResolver::open(path, stencil_dir)?;
    resolver
        .resolve(ModuleKind::Code, &code_dir, Some(&code_name))
        .resolve(ModuleKind::Common, common_dir, None);
    resolver.finalize()
}

fn direct_reference(rel_dir: &Path, filename: &str) -> String {
    format!("file(\"{}/{}\")", rel_dir.display(), filename)
}

/// Replace every parsed occurrence of `opener` in `content`.
///
/// `parse` receives the text starting at the opener and returns the consumed
/// length plus the reference's first argument; `replace` returns the
/// replacement text, or `None` to leave the occurrence untouched.
fn rewrite<P, R>(content: &str, opener: &str, parse: P, replace: R) -> String
where
    P: Fn(&str, &str) -> Option<(usize, String)>,
    R: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(idx) = rest.find(opener) {
        let (before, tail) = rest.split_at(idx);
        out.push_str(before);

        match parse(tail, opener) {
            Some((consumed, argument)) => {
                match replace(&argument) {
                    Some(replacement) => out.push_str(&replacement),
                    None => out.push_str(&tail[..consumed]),
                }
                rest = &tail[consumed..];
            }
            None => {
                out.push_str(opener);
                rest = &tail[opener.len()..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Parse `my-gdrive("<filename>")`; the quote must close on the same line
/// and be followed directly by the closing paren.
fn parse_module(tail: &str, opener: &str) -> Option<(usize, String)> {
    let (quoted_len, filename) = parse_quoted(&tail[opener.len()..])?;
    let after = opener.len() + quoted_len;
    if !tail[after..].starts_with(')') {
        return None;
    }
    Some((after + 1, filename))
}

/// Parse `<opener>"<first>" …metadata…)`, where the metadata may span at most
/// one newline before the closing paren.
fn parse_with_metadata(tail: &str, opener: &str) -> Option<(usize, String)> {
    let (quoted_len, first) = parse_quoted(&tail[opener.len()..])?;
    let mut newlines = 0;

    for (offset, ch) in tail[opener.len() + quoted_len..].char_indices() {
        match ch {
            ')' => return Some((opener.len() + quoted_len + offset + 1, first)),
            '\n' => {
                newlines += 1;
                if newlines > 1 {
                    return None;
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a single-line quoted string at the start of `s`.
fn parse_quoted(s: &str) -> Option<(usize, String)> {
    let mut chars = s.char_indices();
    let (_, quote) = chars.next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }

    for (idx, ch) in chars {
        if ch == quote {
            return Some((idx + 1, s[1..idx].to_string()));
        }
        if ch == '\n' {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_resolve_code_reference_with_filename() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        let sub = dir.path().join("sub");
        fs::create_dir_all(&work).unwrap();
        fs::create_dir_all(&sub).unwrap();

        let file = write_file(&work, "tests.arr", "import my-gdrive(\"hw-code.arr\") as C\n");
        let mut resolver = ImportResolver::open(&file, dir.path()).unwrap();
        resolver.resolve(ModuleKind::Code, &sub, Some("solution.arr"));

        assert_eq!(
            resolver.content(),
            "import file(\"../sub/solution.arr\") as C\n"
        );
    }

    #[test]
    fn test_resolve_common_reuses_matched_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "tests.arr",
            "import my-gdrive('hw-common.arr') as L\n",
        );

        let mut resolver = ImportResolver::open(&file, dir.path()).unwrap();
        resolver.resolve(ModuleKind::Common, dir.path(), None);

        assert_eq!(resolver.content(), "import file(\"./hw-common.arr\") as L\n");
    }

    #[test]
    fn test_resolve_skips_other_kind() {
        let dir = tempfile::tempdir().unwrap();
        let content = "import my-gdrive(\"hw-common.arr\") as L\n";
        let file = write_file(dir.path(), "tests.arr", content);

        let mut resolver = ImportResolver::open(&file, dir.path()).unwrap();
        resolver.resolve(ModuleKind::Code, dir.path(), Some("x.arr"));

        assert_eq!(resolver.content(), content);
    }

    #[test]
    fn test_finalize_shared_across_newline() {
        let dir = tempfile::tempdir().unwrap();
        let stencil = dir.path().join("stencil");
        fs::create_dir_all(&stencil).unwrap();

        let file = write_file(
            dir.path(),
            "tests.arr",
            "import shared-gdrive(\"dcic-2021\",\n  \"1wyQZj_L0qqV9Ekgr9au6RX2iqt\") as dcic\n",
        );

        ImportResolver::open(&file, &stencil).unwrap().finalize().unwrap();

        let resolved = fs::read_to_string(&file).unwrap();
        assert_eq!(resolved, "import file(\"stencil/dcic-2021\") as dcic\n");
    }

    #[test]
    fn test_finalize_shared_gives_up_after_two_newlines() {
        let dir = tempfile::tempdir().unwrap();
        let content = "import shared-gdrive(\"a\",\n\"b\",\n\"c\" as x\n";
        let file = write_file(dir.path(), "tests.arr", content);

        ImportResolver::open(&file, dir.path()).unwrap().finalize().unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), content);
    }

    #[test]
    fn test_finalize_legacy_script_extension() {
        let dir = tempfile::tempdir().unwrap();
        let stencil = dir.path().join("stencil");
        fs::create_dir_all(&stencil).unwrap();

        let file = write_file(
            dir.path(),
            "tests.arr",
            "import gdrive-js(\"helpers.js\", \"1aBcD\") as H\n",
        );

        ImportResolver::open(&file, &stencil).unwrap().finalize().unwrap();

        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "import file(\"stencil/helpers.arr\") as H\n"
        );
    }

    #[test]
    fn test_absent_pattern_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let content = "# a comment\nfun double(x): x * 2 end\n";
        let file = write_file(dir.path(), "code.arr", content);

        fix_imports(&file, dir.path(), &file, dir.path()).unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), content);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let stencil = dir.path().join("stencil");
        let sub = dir.path().join("sub");
        fs::create_dir_all(&stencil).unwrap();
        fs::create_dir_all(&sub).unwrap();

        let code = write_file(&sub, "hw-code.arr", "fun f(x): x end\n");
        let file = write_file(
            dir.path(),
            "tests.arr",
            "import my-gdrive(\"hw-code.arr\") as C\n\
             import my-gdrive(\"hw-common.arr\") as L\n\
             import shared-gdrive(\"lists\", \"1xyz\") as S\n\
             import gdrive-js(\"img.js\", \"1abc\") as I\n",
        );

        fix_imports(&file, &stencil, &code, &sub).unwrap();
        let once = fs::read_to_string(&file).unwrap();

        fix_imports(&file, &stencil, &code, &sub).unwrap();
        let twice = fs::read_to_string(&file).unwrap();

        assert_eq!(once, twice);
        assert!(!once.contains("gdrive"));
    }

    #[test]
    fn test_surrounding_bytes_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "tests.arr",
            "# header comment\t \nimport my-gdrive(\"a-common.arr\") as L # trailing\n\ncheck:\n  1 is 1\nend\n",
        );

        let mut resolver = ImportResolver::open(&file, dir.path()).unwrap();
        resolver.resolve(ModuleKind::Common, dir.path(), None);

        assert_eq!(
            resolver.content(),
            "# header comment\t \nimport file(\"./a-common.arr\") as L # trailing\n\ncheck:\n  1 is 1\nend\n"
        );
    }

    #[test]
    fn test_multiple_occurrences() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(
            dir.path(),
            "tests.arr",
            "import my-gdrive(\"a-common.arr\") as L1\nimport my-gdrive(\"b-common.arr\") as L2\n",
        );

        let mut resolver = ImportResolver::open(&file, dir.path()).unwrap();
        resolver.resolve(ModuleKind::Common, dir.path(), None);

        assert_eq!(
            resolver.content(),
            "import file(\"./a-common.arr\") as L1\nimport file(\"./b-common.arr\") as L2\n"
        );
    }

    #[test]
    fn test_unterminated_call_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let content = "import my-gdrive(\"a-common.arr\" as broken\n";
        let file = write_file(dir.path(), "tests.arr", content);

        let mut resolver = ImportResolver::open(&file, dir.path()).unwrap();
        resolver.resolve(ModuleKind::Common, dir.path(), None);
        assert_eq!(resolver.content(), content);
    }
}
