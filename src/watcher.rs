//! Watch orchestrator
//!
//! Owns the two process-wide cells (current grammar, current corpus),
//! classifies filesystem change notifications, and sequences each
//! reconciliation: load/reparse, corpus update, full rerun. Every
//! reconciliation takes a monotonically increasing generation token; the run
//! reporter drops output from superseded generations.
//!
//! The loop is single-threaded and cooperative: the notify backend's thread
//! only forwards paths into a channel, and reconciliations run to completion
//! one at a time. Graceful ctrl-c shutdown comes from the shared running
//! flag, exactly like any other loop exit.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use regex::Regex;

use crate::config::RunnerConfig;
use crate::corpus::{Corpus, Selection};
use crate::engine::Grammar;
use crate::error::{ParselyError, ParselyResult};
use crate::loader::GrammarLoader;
use crate::reporter::{run_all, OutputFormat};
use crate::testfile::{compile_delimiter, split_test_cases};

/// Everything the runner reports, for human or NDJSON output
#[derive(Debug, Clone)]
pub enum RunnerEvent {
    Started { grammar: String, tests: String },
    GrammarLoaded { generation: u64 },
    GrammarError { generation: u64, message: String },
    TestFileUpdated { path: String, cases: usize },
    TestFileRemoved { path: String },
    FileError { path: String, message: String },
    RunStarted { generation: u64, cases: usize },
    CaseResult { generation: u64, file: String, name: String, rendered: String },
    CaseFailed { generation: u64, file: String, name: String, message: String },
    RunSkipped { generation: u64 },
    RunComplete { generation: u64, executed: usize, failures: usize },
    Shutdown,
}

/// Serialize as a quoted JSON string; covers every control character,
/// not just the common ones.
fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

impl RunnerEvent {
    pub fn to_json(&self) -> String {
        match self {
            RunnerEvent::Started { grammar, tests } => format!(
                r#"{{"event":"started","grammar":{},"tests":{}}}"#,
                json_string(grammar),
                json_string(tests)
            ),
            RunnerEvent::GrammarLoaded { generation } => {
                format!(r#"{{"event":"grammar_loaded","generation":{generation}}}"#)
            }
            RunnerEvent::GrammarError { generation, message } => format!(
                r#"{{"event":"grammar_error","generation":{generation},"message":{}}}"#,
                json_string(message)
            ),
            RunnerEvent::TestFileUpdated { path, cases } => format!(
                r#"{{"event":"test_file_updated","path":{},"cases":{cases}}}"#,
                json_string(path)
            ),
            RunnerEvent::TestFileRemoved { path } => format!(
                r#"{{"event":"test_file_removed","path":{}}}"#,
                json_string(path)
            ),
            RunnerEvent::FileError { path, message } => format!(
                r#"{{"event":"file_error","path":{},"message":{}}}"#,
                json_string(path),
                json_string(message)
            ),
            RunnerEvent::RunStarted { generation, cases } => {
                format!(r#"{{"event":"run_started","generation":{generation},"cases":{cases}}}"#)
            }
            RunnerEvent::CaseResult { generation, file, name, rendered } => format!(
                r#"{{"event":"case_result","generation":{generation},"file":{},"name":{},"results":{}}}"#,
                json_string(file),
                json_string(name),
                rendered
            ),
            RunnerEvent::CaseFailed { generation, file, name, message } => format!(
                r#"{{"event":"case_failed","generation":{generation},"file":{},"name":{},"message":{}}}"#,
                json_string(file),
                json_string(name),
                json_string(message)
            ),
            RunnerEvent::RunSkipped { generation } => {
                format!(r#"{{"event":"run_skipped","generation":{generation}}}"#)
            }
            RunnerEvent::RunComplete { generation, executed, failures } => format!(
                r#"{{"event":"run_complete","generation":{generation},"executed":{executed},"failures":{failures}}}"#
            ),
            RunnerEvent::Shutdown => r#"{"event":"shutdown"}"#.to_string(),
        }
    }
}

/// Owns the current grammar and corpus cells and drives reconciliations
pub struct Orchestrator {
    loader: GrammarLoader,
    grammar_path: PathBuf,
    selection: Selection,
    watch_roots: Vec<Selection>,
    delimiter: Regex,
    format: OutputFormat,
    // the two process-wide cells; replaced wholesale, never mutated in place
    grammar: Option<Grammar>,
    corpus: Corpus,
    generation: AtomicU64,
}

impl Orchestrator {
    pub fn new(config: RunnerConfig) -> ParselyResult<Self> {
        let delimiter = compile_delimiter(&config.test_name_pattern)?;
        let selection = Selection::new(&config.tests_glob)?;
        let watch_roots = config
            .watch_globs
            .iter()
            .map(|g| Selection::new(g))
            .collect::<ParselyResult<Vec<_>>>()?;
        let loader = GrammarLoader::new(config.grammar)?;
        let grammar_path = normalize(loader.watch_path());

        Ok(Self {
            loader,
            grammar_path,
            selection,
            watch_roots,
            delimiter,
            format: config.format,
            grammar: None,
            corpus: Corpus::new(),
            generation: AtomicU64::new(0),
        })
    }

    /// The current grammar artifact, if any load has ever succeeded.
    pub fn grammar(&self) -> Option<&Grammar> {
        self.grammar.as_ref()
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Directories the filesystem watcher should register.
    pub fn watch_targets(&self) -> Vec<PathBuf> {
        let mut targets = vec![self.selection.watch_root().to_path_buf()];
        for root in &self.watch_roots {
            targets.push(root.watch_root().to_path_buf());
        }
        if let Some(parent) = self.grammar_path.parent() {
            targets.push(parent.to_path_buf());
        }
        targets.sort();
        targets.dedup();
        targets
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Cold run: load the grammar, parse the whole selection, run everything.
    pub fn bootstrap(&mut self, emit: &impl Fn(RunnerEvent)) {
        emit(RunnerEvent::Started {
            grammar: self.grammar_path.display().to_string(),
            tests: self.selection.pattern().to_string(),
        });

        let generation = self.next_generation();
        self.reload_grammar(generation, emit);

        match self.selection.resolve() {
            Ok(paths) => {
                for path in paths {
                    self.reparse_file(&path, emit);
                }
            }
            Err(e) => emit(RunnerEvent::FileError {
                path: self.selection.pattern().to_string(),
                message: e.to_string(),
            }),
        }

        self.rerun(generation, emit);
    }

    /// Classify one change notification and perform its reconciliation.
    pub fn handle_change(&mut self, path: &Path, emit: &impl Fn(RunnerEvent)) {
        let path = normalize(path);

        if path == self.grammar_path || self.watch_roots.iter().any(|s| s.contains(&path)) {
            let generation = self.next_generation();
            self.reload_grammar(generation, emit);
            // rerun even after a failed reload: users still see current
            // behavior under the last-good grammar, next to the new error
            self.rerun(generation, emit);
        } else if self.selection.contains(&path) {
            let generation = self.next_generation();
            if path.exists() {
                if !self.reparse_file(&path, emit) {
                    return; // reconciliation abandoned, prior state retained
                }
            } else {
                self.corpus.remove(&path);
                emit(RunnerEvent::TestFileRemoved {
                    path: path.display().to_string(),
                });
            }
            self.rerun(generation, emit);
        }
    }

    /// Load a fresh artifact and swap it in only on success.
    fn reload_grammar(&mut self, generation: u64, emit: &impl Fn(RunnerEvent)) {
        match self.loader.load() {
            Ok(grammar) => {
                self.grammar = Some(grammar);
                emit(RunnerEvent::GrammarLoaded { generation });
            }
            Err(e) => emit(RunnerEvent::GrammarError {
                generation,
                message: e.to_string(),
            }),
        }
    }

    /// Reparse one test file and replace its corpus entry wholesale.
    fn reparse_file(&mut self, path: &Path, emit: &impl Fn(RunnerEvent)) -> bool {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cases = split_test_cases(&content, &self.delimiter);
                emit(RunnerEvent::TestFileUpdated {
                    path: path.display().to_string(),
                    cases: cases.len(),
                });
                self.corpus.replace(path.to_path_buf(), cases);
                true
            }
            Err(e) => {
                emit(RunnerEvent::FileError {
                    path: path.display().to_string(),
                    message: e.to_string(),
                });
                false
            }
        }
    }

    fn rerun(&self, generation: u64, emit: &impl Fn(RunnerEvent)) {
        match &self.grammar {
            Some(grammar) => run_all(
                grammar,
                &self.corpus,
                self.format,
                generation,
                &self.generation,
                emit,
            ),
            None => emit(RunnerEvent::RunSkipped { generation }),
        }
    }
}

/// Canonicalize when possible so watcher-reported paths compare equal to
/// configured ones; deleted files fall back to the absolute form.
fn normalize(path: &Path) -> PathBuf {
    let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    abs.canonicalize().unwrap_or(abs)
}

/// Start watching for file changes. Performs the cold run first, then
/// processes notifications until `running` is cleared.
pub fn watch(
    mut orchestrator: Orchestrator,
    running: Arc<AtomicBool>,
    emit: impl Fn(RunnerEvent),
) -> ParselyResult<()> {
    orchestrator.bootstrap(&emit);

    let (tx, rx) = channel();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
        },
        Config::default(),
    )
    .map_err(watch_error)?;

    for target in orchestrator.watch_targets() {
        watcher
            .watch(&target, RecursiveMode::Recursive)
            .map_err(watch_error)?;
    }

    while running.load(Ordering::SeqCst) {
        // poll with a timeout so ctrl-c is noticed promptly
        if let Ok(path) = rx.recv_timeout(Duration::from_millis(50)) {
            orchestrator.handle_change(&path, &emit);
        }
    }

    emit(RunnerEvent::Shutdown);
    Ok(())
}

fn watch_error(e: notify::Error) -> ParselyError {
    ParselyError::Io(std::io::Error::other(e.to_string()))
}
