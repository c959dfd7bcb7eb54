//! Runner configuration
//!
//! Validates the command surface into a `RunnerConfig` before anything
//! starts. Configuration problems are the only fatal errors in parsely:
//! everything after the watch loop starts is reported and survived.

use std::path::PathBuf;

use crate::error::{ParselyError, ParselyResult};
use crate::reporter::OutputFormat;
use crate::testfile::{compile_delimiter, DEFAULT_TEST_NAME_PATTERN};

/// Where the grammar comes from; fixed for the process lifetime
#[derive(Debug, Clone)]
pub enum GrammarSource {
    /// Path to an already-compiled artifact
    Compiled(PathBuf),
    /// Path to raw grammar source plus the compiler executable to invoke
    Raw { source: PathBuf, compiler: String },
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub tests_glob: String,
    pub grammar: GrammarSource,
    pub test_name_pattern: String,
    pub watch_globs: Vec<String>,
    pub format: OutputFormat,
}

impl RunnerConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tests_glob: String,
        grammar: Option<PathBuf>,
        raw_grammar: Option<PathBuf>,
        compiler: Option<String>,
        test_name_pattern: Option<String>,
        watch_globs: Vec<String>,
        raw_output: bool,
    ) -> ParselyResult<Self> {
        let grammar = match (grammar, raw_grammar) {
            (Some(_), Some(_)) => {
                return Err(ParselyError::Configuration(
                    "compiled grammar and raw grammar are mutually exclusive".to_string(),
                ))
            }
            (Some(path), None) => GrammarSource::Compiled(path),
            (None, Some(source)) => {
                let compiler = compiler.ok_or_else(|| {
                    ParselyError::Configuration(
                        "raw grammar mode requires --compiler".to_string(),
                    )
                })?;
                GrammarSource::Raw { source, compiler }
            }
            (None, None) => {
                return Err(ParselyError::Configuration(
                    "must provide a compiled grammar file or a raw grammar file".to_string(),
                ))
            }
        };

        if tests_glob.trim().is_empty() {
            return Err(ParselyError::Configuration(
                "must provide a glob pattern for tests".to_string(),
            ));
        }

        let test_name_pattern =
            test_name_pattern.unwrap_or_else(|| DEFAULT_TEST_NAME_PATTERN.to_string());
        // fail fast on a bad delimiter; the watcher recompiles it later
        compile_delimiter(&test_name_pattern)?;

        Ok(Self {
            tests_glob,
            grammar,
            test_name_pattern,
            watch_globs,
            format: if raw_output {
                OutputFormat::Raw
            } else {
                OutputFormat::Pretty
            },
        })
    }
}
