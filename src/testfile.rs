//! Test block parser
//!
//! Splits raw test-file text into named test cases by a delimiter line.
//! The delimiter is a configurable regex with exactly one capture group;
//! the captured text is the test name and everything up to the next
//! delimiter (or end of file) is the test body.

use regex::Regex;

use crate::error::{ParselyError, ParselyResult};

/// Default delimiter: a line starting with two dashes, optional space,
/// capturing the rest of the line up to (not including) the newline.
pub const DEFAULT_TEST_NAME_PATTERN: &str = r"(?m)^-- ?(.*)\n";

/// A named test case extracted from a test file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    pub code: String,
}

/// Compile a test-name delimiter pattern.
///
/// The pattern must contain exactly one capture group (the test name).
pub fn compile_delimiter(pattern: &str) -> ParselyResult<Regex> {
    let re = Regex::new(pattern).map_err(|e| ParselyError::Pattern {
        message: e.to_string(),
    })?;

    // captures_len() counts the implicit whole-match group 0
    let groups = re.captures_len() - 1;
    if groups != 1 {
        return Err(ParselyError::Pattern {
            message: format!("expected exactly one capture group, found {groups}"),
        });
    }

    Ok(re)
}

/// Split file content into an ordered sequence of test cases.
///
/// Text before the first delimiter (the preamble) is discarded; there is
/// no "default" unnamed test. Each body has exactly one leading and one
/// trailing newline stripped, if present. Total over all inputs: no
/// content string produces an error.
pub fn split_test_cases(content: &str, delimiter: &Regex) -> Vec<TestCase> {
    let mut marks: Vec<(String, usize, usize)> = Vec::new();
    for caps in delimiter.captures_iter(content) {
        if let Some(whole) = caps.get(0) {
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or("").to_string();
            marks.push((name, whole.start(), whole.end()));
        }
    }

    let mut cases = Vec::with_capacity(marks.len());
    for (i, (name, _, body_start)) in marks.iter().enumerate() {
        let body_end = marks.get(i + 1).map_or(content.len(), |next| next.1);
        let mut code = &content[*body_start..body_end];
        code = code.strip_prefix('\n').unwrap_or(code);
        code = code.strip_suffix('\n').unwrap_or(code);
        cases.push(TestCase {
            name: name.clone(),
            code: code.to_string(),
        });
    }

    cases
}
