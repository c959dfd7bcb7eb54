//! Parse executor
//!
//! Drives the parsing engine for one test case. A fresh parser is built per
//! invocation; parser instances carry chart state incompatible with reuse.

use serde_json::Value;

use crate::engine::{Grammar, Parser};

/// Outcome of running one test case's input through the grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Every valid derivation, in engine order. May be empty (the input
    /// matched zero complete derivations) or hold several (ambiguity).
    Success(Vec<Value>),
    /// The input has no valid derivation. Expected and non-fatal.
    Failure(String),
}

/// Execute one test case against the current grammar.
pub fn execute(grammar: &Grammar, code: &str) -> ParseOutcome {
    let parser = Parser::new(grammar);
    match parser.feed(code) {
        Ok(results) => ParseOutcome::Success(results),
        Err(e) => ParseOutcome::Failure(e.to_string()),
    }
}
