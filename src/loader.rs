//! Grammar loader
//!
//! Produces a fresh [`Grammar`] on every call, either by re-reading a
//! precompiled artifact or by invoking the external grammar compiler against
//! a raw source file. There is no caching here: each load observes the
//! current on-disk content, and the caller owns the atomic swap into the
//! engine's current-grammar slot.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::NamedTempFile;

use crate::config::GrammarSource;
use crate::engine::Grammar;
use crate::error::{ParselyError, ParselyResult};

enum Mode {
    /// The grammar path already refers to a loadable artifact.
    Compiled(PathBuf),
    /// Compile the source with `<compiler> <source> -o <artifact>` first.
    /// The temp artifact lives for the loader's lifetime and is removed on
    /// drop, which covers both normal exit and ctrl-c (the interrupt handler
    /// only flips the running flag; the loop unwinds normally).
    Raw {
        source: PathBuf,
        compiler: String,
        artifact: NamedTempFile,
    },
}

pub struct GrammarLoader {
    mode: Mode,
}

impl GrammarLoader {
    pub fn new(source: GrammarSource) -> ParselyResult<Self> {
        let mode = match source {
            GrammarSource::Compiled(path) => Mode::Compiled(path),
            GrammarSource::Raw { source, compiler } => {
                // next to the source, so compiler-relative includes resolve
                let dir = source.parent().filter(|p| !p.as_os_str().is_empty());
                let artifact = tempfile::Builder::new()
                    .prefix("parsely-grammar-")
                    .suffix(".json")
                    .tempfile_in(dir.unwrap_or_else(|| Path::new(".")))?;
                Mode::Raw {
                    source,
                    compiler,
                    artifact,
                }
            }
        };
        Ok(Self { mode })
    }

    /// The on-disk path whose changes mean "the grammar changed".
    pub fn watch_path(&self) -> &Path {
        match &self.mode {
            Mode::Compiled(path) => path,
            Mode::Raw { source, .. } => source,
        }
    }

    /// Load a brand-new grammar binding from the current on-disk state.
    pub fn load(&self) -> ParselyResult<Grammar> {
        match &self.mode {
            Mode::Compiled(path) => Grammar::from_artifact(path),
            Mode::Raw {
                source,
                compiler,
                artifact,
            } => {
                let output = Command::new(compiler)
                    .arg(source)
                    .arg("-o")
                    .arg(artifact.path())
                    .output()?;
                if !output.status.success() {
                    return Err(ParselyError::Compilation {
                        status: output.status.code().unwrap_or(-1),
                        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    });
                }
                Grammar::from_artifact(artifact.path())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const GOOD_ARTIFACT: &str = r#"{
        "start": "main",
        "rules": [{"name": "main", "symbols": [{"literal": "ok"}]}]
    }"#;

    #[test]
    fn test_precompiled_load_observes_current_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grammar.json");
        fs::write(&path, GOOD_ARTIFACT).unwrap();

        let loader = GrammarLoader::new(GrammarSource::Compiled(path.clone())).unwrap();
        let first = loader.load().unwrap();
        assert_eq!(first.start, "main");

        // rewrite the artifact; a fresh load must not return a stale value
        fs::write(
            &path,
            r#"{"start": "other", "rules": [{"name": "other", "symbols": []}]}"#,
        )
        .unwrap();
        let second = loader.load().unwrap();
        assert_eq!(second.start, "other");
        // the old binding is untouched
        assert_eq!(first.start, "main");
    }

    #[test]
    fn test_precompiled_missing_artifact_is_load_error() {
        let loader =
            GrammarLoader::new(GrammarSource::Compiled(PathBuf::from("/nope/g.json"))).unwrap();
        assert!(matches!(loader.load(), Err(ParselyError::Load { .. })));
    }

    #[test]
    fn test_watch_path_points_at_source_in_raw_mode() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("grammar.g");
        fs::write(&source, "main -> 'ok'").unwrap();

        let loader = GrammarLoader::new(GrammarSource::Raw {
            source: source.clone(),
            compiler: "true".to_string(),
        })
        .unwrap();
        assert_eq!(loader.watch_path(), source.as_path());
    }

    #[cfg(unix)]
    fn fake_compiler(dir: &Path, script_body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-compiler");
        fs::write(&path, format!("#!/bin/sh\n{script_body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[cfg(unix)]
    #[test]
    fn test_raw_mode_compiles_then_loads() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("grammar.g");
        fs::write(&source, "main -> 'ok'").unwrap();

        // the "compiler" writes a fixed artifact to the -o path ($3)
        let compiler = fake_compiler(
            dir.path(),
            &format!("printf '%s' '{}' > \"$3\"", GOOD_ARTIFACT.replace('\n', " ")),
        );

        let loader = GrammarLoader::new(GrammarSource::Raw { source, compiler }).unwrap();
        let grammar = loader.load().unwrap();
        assert_eq!(grammar.start, "main");
    }

    #[cfg(unix)]
    #[test]
    fn test_raw_mode_nonzero_exit_is_compilation_error() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("grammar.g");
        fs::write(&source, "main -> ???").unwrap();

        let compiler = fake_compiler(dir.path(), "echo 'unexpected token' >&2; exit 3");
        let loader = GrammarLoader::new(GrammarSource::Raw { source, compiler }).unwrap();

        match loader.load() {
            Err(ParselyError::Compilation { status, stderr }) => {
                assert_eq!(status, 3);
                assert_eq!(stderr, "unexpected token");
            }
            other => panic!("expected Compilation error, got {other:?}"),
        }
    }

    #[test]
    fn test_temp_artifact_removed_on_drop() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("grammar.g");
        fs::write(&source, "main -> 'ok'").unwrap();

        let tmp_path;
        {
            let loader = GrammarLoader::new(GrammarSource::Raw {
                source,
                compiler: "true".to_string(),
            })
            .unwrap();
            tmp_path = match &loader.mode {
                Mode::Raw { artifact, .. } => artifact.path().to_path_buf(),
                Mode::Compiled(_) => unreachable!(),
            };
            assert!(tmp_path.exists());
        }
        assert!(!tmp_path.exists());
    }
}
