//! Run reporter and output formatting
//!
//! Iterates the whole corpus, executes every case, and emits one event per
//! case. Display-only: nothing here feeds back into grammar or corpus state.
//! A failing case never stops the iteration. Output is suppressed once the
//! run's generation has been superseded by a newer reconciliation.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::corpus::Corpus;
use crate::engine::Grammar;
use crate::executor::{execute, ParseOutcome};
use crate::watcher::RunnerEvent;

/// How parse results are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable, indented
    Pretty,
    /// Compact, round-trippable JSON
    Raw,
}

/// Render a result sequence to text.
pub fn render(results: &[Value], format: OutputFormat) -> String {
    let value = Value::Array(results.to_vec());
    match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(&value).unwrap_or_default(),
        OutputFormat::Raw => serde_json::to_string(&value).unwrap_or_default(),
    }
}

/// Execute every case in the corpus against the grammar, in order.
///
/// `generation` tags this run; `current` is the orchestrator's live
/// generation cell. When a newer reconciliation starts mid-run, remaining
/// output is dropped rather than interleaved with the newer run's.
pub fn run_all(
    grammar: &Grammar,
    corpus: &Corpus,
    format: OutputFormat,
    generation: u64,
    current: &AtomicU64,
    emit: &impl Fn(RunnerEvent),
) {
    if current.load(Ordering::SeqCst) != generation {
        return;
    }
    emit(RunnerEvent::RunStarted {
        generation,
        cases: corpus.case_count(),
    });

    let mut executed = 0usize;
    let mut failures = 0usize;
    for file in corpus.files() {
        for case in &file.cases {
            if current.load(Ordering::SeqCst) != generation {
                return; // superseded
            }
            let file_display = file.path.display().to_string();
            match execute(grammar, &case.code) {
                ParseOutcome::Success(results) => emit(RunnerEvent::CaseResult {
                    generation,
                    file: file_display,
                    name: case.name.clone(),
                    rendered: render(&results, format),
                }),
                ParseOutcome::Failure(message) => {
                    failures += 1;
                    emit(RunnerEvent::CaseFailed {
                        generation,
                        file: file_display,
                        name: case.name.clone(),
                        message,
                    });
                }
            }
            executed += 1;
        }
    }

    emit(RunnerEvent::RunComplete {
        generation,
        executed,
        failures,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Rule, Symbol};
    use crate::testfile::TestCase;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn grammar() -> Grammar {
        Grammar::new(
            "main",
            vec![Rule {
                name: "main".to_string(),
                symbols: vec![Symbol::Pattern("[a-z]".to_string())],
            }],
        )
        .unwrap()
    }

    fn case(name: &str, code: &str) -> TestCase {
        TestCase {
            name: name.to_string(),
            code: code.to_string(),
        }
    }

    fn collect_events(
        corpus: &Corpus,
        generation: u64,
        current: &AtomicU64,
    ) -> Vec<RunnerEvent> {
        let events = Mutex::new(Vec::new());
        run_all(
            &grammar(),
            corpus,
            OutputFormat::Raw,
            generation,
            current,
            &|event| events.lock().unwrap().push(event),
        );
        events.into_inner().unwrap()
    }

    #[test]
    fn test_render_raw_round_trips() {
        let results = vec![json!(["a", ["b"]]), json!(["c"])];
        let rendered = render(&results, OutputFormat::Raw);
        let back: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(back, Value::Array(results));
    }

    #[test]
    fn test_render_pretty_and_raw_agree_structurally() {
        let results = vec![json!(["x"])];
        let pretty: Value =
            serde_json::from_str(&render(&results, OutputFormat::Pretty)).unwrap();
        let raw: Value = serde_json::from_str(&render(&results, OutputFormat::Raw)).unwrap();
        assert_eq!(pretty, raw);
    }

    #[test]
    fn test_failure_does_not_stop_the_run() {
        let mut corpus = Corpus::new();
        corpus.replace(
            PathBuf::from("/t/a.test"),
            vec![case("good", "a"), case("bad", "1"), case("after", "b")],
        );
        corpus.replace(PathBuf::from("/t/b.test"), vec![case("later", "c")]);

        let current = AtomicU64::new(7);
        let events = collect_events(&corpus, 7, &current);

        let names: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                RunnerEvent::CaseResult { name, .. } => Some(name.as_str()),
                RunnerEvent::CaseFailed { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["good", "bad", "after", "later"]);

        let complete = events.last().unwrap();
        match complete {
            RunnerEvent::RunComplete {
                executed, failures, ..
            } => {
                assert_eq!(*executed, 4);
                assert_eq!(*failures, 1);
            }
            other => panic!("expected RunComplete, got {other:?}"),
        }
    }

    #[test]
    fn test_superseded_generation_emits_nothing() {
        let mut corpus = Corpus::new();
        corpus.replace(PathBuf::from("/t/a.test"), vec![case("x", "a")]);

        let current = AtomicU64::new(9);
        let events = collect_events(&corpus, 8, &current);
        assert!(events.is_empty());
    }

    #[test]
    fn test_empty_corpus_still_reports_run() {
        let corpus = Corpus::new();
        let current = AtomicU64::new(1);
        let events = collect_events(&corpus, 1, &current);
        assert!(matches!(events[0], RunnerEvent::RunStarted { cases: 0, .. }));
        assert!(matches!(
            events[1],
            RunnerEvent::RunComplete {
                executed: 0,
                failures: 0,
                ..
            }
        ));
    }
}
