//! parsely - live test runner for grammar definitions
//!
//! parsely watches a grammar (compiled artifact or raw source) and a corpus
//! of delimiter-separated test files. On any relevant change it reloads the
//! grammar, reparses what changed, and re-executes every test case, printing
//! each parse result. It displays output only: no assertions, no pass/fail.

pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod executor;
pub mod loader;
pub mod reporter;
pub mod testfile;
pub mod watcher;

// Re-exports for convenience
pub use config::{GrammarSource, RunnerConfig};
pub use corpus::{Corpus, Selection, TestFile};
pub use engine::{Grammar, ParseError, Parser, Rule, Symbol};
pub use error::{ParselyError, ParselyResult};
pub use executor::{execute, ParseOutcome};
pub use loader::GrammarLoader;
pub use reporter::{render, run_all, OutputFormat};
pub use testfile::{compile_delimiter, split_test_cases, TestCase, DEFAULT_TEST_NAME_PATTERN};
pub use watcher::{watch, Orchestrator, RunnerEvent};
