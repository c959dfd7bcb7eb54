//! Test corpus store and file selection
//!
//! The corpus maps absolute test-file paths to their parsed case lists.
//! Entries are replaced wholesale when a file changes; per-case diffing
//! never happens. Selection resolves a glob pattern to concrete files and
//! answers membership questions for watch events, so files created or
//! removed under the pattern enter and leave the corpus.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ignore::overrides::{Override, OverrideBuilder};
use ignore::WalkBuilder;

use crate::error::{ParselyError, ParselyResult};
use crate::testfile::TestCase;

/// One test file's parsed cases, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestFile {
    pub path: PathBuf,
    pub cases: Vec<TestCase>,
}

/// The full set of watched test files, keyed by absolute path
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    files: BTreeMap<PathBuf, TestFile>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a file's entry wholesale.
    pub fn replace(&mut self, path: PathBuf, cases: Vec<TestCase>) {
        self.files.insert(path.clone(), TestFile { path, cases });
    }

    pub fn remove(&mut self, path: &Path) -> Option<TestFile> {
        self.files.remove(path)
    }

    pub fn get(&self, path: &Path) -> Option<&TestFile> {
        self.files.get(path)
    }

    /// Iterate files in stable (path) order.
    pub fn files(&self) -> impl Iterator<Item = &TestFile> {
        self.files.values()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn case_count(&self) -> usize {
        self.files.values().map(|f| f.cases.len()).sum()
    }
}

/// A glob-based test file selection rooted at the pattern's literal prefix
#[derive(Debug)]
pub struct Selection {
    pattern: String,
    root: PathBuf,
    glob: String,
    matcher: Override,
}

fn has_glob_meta(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

impl Selection {
    pub fn new(pattern: &str) -> ParselyResult<Self> {
        let glob_err = |message: String| ParselyError::Glob {
            pattern: pattern.to_string(),
            message,
        };

        // split into a literal directory prefix and the glob remainder
        let mut literal = if pattern.starts_with('/') {
            PathBuf::from("/")
        } else {
            PathBuf::new()
        };
        let mut glob_parts: Vec<&str> = Vec::new();
        for part in pattern.split('/') {
            if part.is_empty() {
                continue;
            }
            if !glob_parts.is_empty() || has_glob_meta(part) {
                glob_parts.push(part);
            } else {
                literal.push(part);
            }
        }

        let (root, glob) = if glob_parts.is_empty() {
            // plain file path: select exactly that file
            let file = literal
                .file_name()
                .ok_or_else(|| glob_err("pattern selects no files".to_string()))?
                .to_string_lossy()
                .into_owned();
            let parent = literal.parent().map(Path::to_path_buf).unwrap_or_default();
            (parent, file)
        } else {
            (literal, glob_parts.join("/"))
        };

        let root = if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root
        };
        let root = root.canonicalize().map_err(|e| glob_err(e.to_string()))?;

        let matcher = OverrideBuilder::new(&root)
            .add(&glob)
            .map_err(|e| glob_err(e.to_string()))?
            .build()
            .map_err(|e| glob_err(e.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            root,
            glob,
            matcher,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Directory to register with the filesystem watcher.
    pub fn watch_root(&self) -> &Path {
        &self.root
    }

    /// Resolve the pattern to the current set of matching files, sorted.
    pub fn resolve(&self) -> ParselyResult<Vec<PathBuf>> {
        let glob_err = |message: String| ParselyError::Glob {
            pattern: self.pattern.clone(),
            message,
        };

        let overrides = OverrideBuilder::new(&self.root)
            .add(&self.glob)
            .map_err(|e| glob_err(e.to_string()))?
            .build()
            .map_err(|e| glob_err(e.to_string()))?;

        let mut paths = Vec::new();
        for entry in WalkBuilder::new(&self.root)
            .standard_filters(false)
            .overrides(overrides)
            .build()
        {
            let entry = entry.map_err(|e| glob_err(e.to_string()))?;
            if entry.file_type().is_some_and(|t| t.is_file()) {
                let path = entry
                    .path()
                    .canonicalize()
                    .unwrap_or_else(|_| entry.path().to_path_buf());
                paths.push(path);
            }
        }
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// Whether an (absolute) path falls under this selection.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root) && self.matcher.matched(path, false).is_whitelist()
    }
}
