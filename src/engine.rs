//! Parsing engine boundary
//!
//! A grammar artifact is a JSON rules table; [`Grammar::from_artifact`] is the
//! engine's standard loader function. [`Parser`] is an Earley-style parser
//! constructed fresh per input (parser instances carry chart state and are
//! not reused across test cases). `feed` returns every derivation of the
//! input as a JSON value: a rule node is the array of its children's values,
//! a matched terminal is the matched text. Zero derivations (the input is a
//! valid prefix with no complete parse) and multiple derivations (ambiguous
//! grammar) are both ordinary outcomes; a stuck position is a syntax error.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::{ParselyError, ParselyResult};

/// One symbol on a rule's right-hand side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbol {
    /// Reference to another rule by name
    Nonterminal(String),
    /// Exact text
    Literal(String),
    /// Single-character class, e.g. "[0-9]"
    Pattern(String),
}

/// One production rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub symbols: Vec<Symbol>,
}

/// A loaded, ready-to-use grammar. Immutable once loaded; reloads produce a
/// brand-new value, never mutate one in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grammar {
    pub start: String,
    pub rules: Vec<Rule>,
    #[serde(skip)]
    by_name: HashMap<String, Vec<usize>>,
    #[serde(skip)]
    patterns: HashMap<String, Regex>,
}

impl Grammar {
    /// Build a grammar from parts, validating rule references and patterns.
    pub fn new(start: impl Into<String>, rules: Vec<Rule>) -> ParselyResult<Self> {
        let mut grammar = Grammar {
            start: start.into(),
            rules,
            by_name: HashMap::new(),
            patterns: HashMap::new(),
        };
        grammar.link().map_err(|message| ParselyError::Load {
            path: "<inline>".into(),
            message,
        })?;
        Ok(grammar)
    }

    /// Load a compiled grammar artifact, re-reading the file fresh.
    pub fn from_artifact(path: &Path) -> ParselyResult<Self> {
        let load_err = |message: String| ParselyError::Load {
            path: path.to_path_buf(),
            message,
        };
        let text = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let mut grammar: Grammar =
            serde_json::from_str(&text).map_err(|e| load_err(e.to_string()))?;
        grammar.link().map_err(load_err)?;
        Ok(grammar)
    }

    /// Index rules by name, compile terminal patterns, check references.
    fn link(&mut self) -> Result<(), String> {
        self.by_name.clear();
        self.patterns.clear();

        for (idx, rule) in self.rules.iter().enumerate() {
            self.by_name.entry(rule.name.clone()).or_default().push(idx);
        }

        if !self.by_name.contains_key(&self.start) {
            return Err(format!("start symbol '{}' has no rules", self.start));
        }

        for rule in &self.rules {
            for symbol in &rule.symbols {
                match symbol {
                    Symbol::Nonterminal(nt) => {
                        if !self.by_name.contains_key(nt) {
                            return Err(format!(
                                "rule '{}' references undefined symbol '{nt}'",
                                rule.name
                            ));
                        }
                    }
                    Symbol::Pattern(p) => {
                        if !self.patterns.contains_key(p) {
                            // anchored so the pattern must cover the whole character
                            let re = Regex::new(&format!("^(?:{p})$"))
                                .map_err(|e| format!("bad pattern '{p}': {e}"))?;
                            self.patterns.insert(p.clone(), re);
                        }
                    }
                    Symbol::Literal(_) => {}
                }
            }
        }

        Ok(())
    }

    fn pattern_matches(&self, pattern: &str, c: char) -> bool {
        let mut buf = [0u8; 4];
        self.patterns
            .get(pattern)
            .is_some_and(|re| re.is_match(c.encode_utf8(&mut buf)))
    }
}

/// Syntax error: no rule could consume the input at `offset`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at character {offset} (near {found:?})")]
pub struct ParseError {
    pub offset: usize,
    pub found: char,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Item {
    rule: usize,
    dot: usize,
    origin: usize,
}

type Completed = HashMap<(usize, String), Vec<(usize, usize)>>;

/// A single-use parser over one grammar
pub struct Parser<'g> {
    grammar: &'g Grammar,
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    /// Feed the entire input, returning all derivations of the start symbol.
    pub fn feed(&self, input: &str) -> Result<Vec<Value>, ParseError> {
        let chars: Vec<char> = input.chars().collect();
        let n = chars.len();
        let rules = &self.grammar.rules;

        let mut sets: Vec<Vec<Item>> = vec![Vec::new(); n + 1];
        let mut seen: Vec<HashSet<Item>> = vec![HashSet::new(); n + 1];
        let mut completed: Completed = HashMap::new();

        fn add(sets: &mut [Vec<Item>], seen: &mut [HashSet<Item>], at: usize, item: Item) {
            if seen[at].insert(item) {
                sets[at].push(item);
            }
        }

        if let Some(starts) = self.grammar.by_name.get(&self.grammar.start) {
            for &rule in starts {
                add(&mut sets, &mut seen, 0, Item { rule, dot: 0, origin: 0 });
            }
        }

        for i in 0..=n {
            // nonterminals completed with zero width inside this set; items
            // added after such a completion advance over them at predict time
            let mut nulled: HashSet<String> = HashSet::new();

            let mut idx = 0;
            while idx < sets[i].len() {
                let item = sets[i][idx];
                idx += 1;
                let rule = &rules[item.rule];

                if item.dot == rule.symbols.len() {
                    completed
                        .entry((item.origin, rule.name.clone()))
                        .or_default()
                        .push((i, item.rule));

                    let waiting: Vec<Item> = sets[item.origin]
                        .iter()
                        .copied()
                        .filter(|it| {
                            let r = &rules[it.rule];
                            it.dot < r.symbols.len()
                                && matches!(&r.symbols[it.dot],
                                    Symbol::Nonterminal(nt) if nt == &rule.name)
                        })
                        .collect();
                    for it in waiting {
                        add(
                            &mut sets,
                            &mut seen,
                            i,
                            Item { rule: it.rule, dot: it.dot + 1, origin: it.origin },
                        );
                    }

                    if item.origin == i {
                        nulled.insert(rule.name.clone());
                    }
                    continue;
                }

                match &rule.symbols[item.dot] {
                    Symbol::Nonterminal(nt) => {
                        if let Some(candidates) = self.grammar.by_name.get(nt) {
                            for &r in candidates {
                                add(&mut sets, &mut seen, i, Item { rule: r, dot: 0, origin: i });
                            }
                        }
                        if nulled.contains(nt.as_str()) {
                            add(
                                &mut sets,
                                &mut seen,
                                i,
                                Item { rule: item.rule, dot: item.dot + 1, origin: item.origin },
                            );
                        }
                    }
                    Symbol::Literal(text) => {
                        let width = text.chars().count();
                        let advanced =
                            Item { rule: item.rule, dot: item.dot + 1, origin: item.origin };
                        if width == 0 {
                            add(&mut sets, &mut seen, i, advanced);
                        } else if i + width <= n
                            && chars[i..i + width].iter().copied().eq(text.chars())
                        {
                            add(&mut sets, &mut seen, i + width, advanced);
                        }
                    }
                    Symbol::Pattern(p) => {
                        if i < n && self.grammar.pattern_matches(p, chars[i]) {
                            add(
                                &mut sets,
                                &mut seen,
                                i + 1,
                                Item { rule: item.rule, dot: item.dot + 1, origin: item.origin },
                            );
                        }
                    }
                }
            }
        }

        let reached = (0..=n).rev().find(|&i| !sets[i].is_empty()).unwrap_or(0);
        if reached < n {
            return Err(ParseError { offset: reached, found: chars[reached] });
        }

        let mut memo: HashMap<(String, usize, usize), Vec<Value>> = HashMap::new();
        Ok(self.trees(&self.grammar.start, 0, n, &chars, &completed, &mut memo))
    }

    /// All derivation trees of `name` spanning `[i, j)`.
    fn trees(
        &self,
        name: &str,
        i: usize,
        j: usize,
        chars: &[char],
        completed: &Completed,
        memo: &mut HashMap<(String, usize, usize), Vec<Value>>,
    ) -> Vec<Value> {
        let key = (name.to_string(), i, j);
        if let Some(cached) = memo.get(&key) {
            return cached.clone();
        }
        // in-progress marker; cuts cyclic (infinitely ambiguous) derivations
        memo.insert(key.clone(), Vec::new());

        let mut out = Vec::new();
        if let Some(entries) = completed.get(&(i, name.to_string())) {
            for &(end, rule_idx) in entries {
                if end != j {
                    continue;
                }
                let rule = &self.grammar.rules[rule_idx];
                for children in self.walk(&rule.symbols, i, j, chars, completed, memo) {
                    out.push(Value::Array(children));
                }
            }
        }

        memo.insert(key, out.clone());
        out
    }

    /// All ways `symbols` can cover `[pos, end)`, as child-value sequences.
    fn walk(
        &self,
        symbols: &[Symbol],
        pos: usize,
        end: usize,
        chars: &[char],
        completed: &Completed,
        memo: &mut HashMap<(String, usize, usize), Vec<Value>>,
    ) -> Vec<Vec<Value>> {
        let Some((first, rest)) = symbols.split_first() else {
            return if pos == end { vec![Vec::new()] } else { Vec::new() };
        };

        let mut out = Vec::new();
        match first {
            Symbol::Literal(text) => {
                let width = text.chars().count();
                if pos + width <= end && chars[pos..pos + width].iter().copied().eq(text.chars())
                {
                    for mut tail in self.walk(rest, pos + width, end, chars, completed, memo) {
                        tail.insert(0, Value::String(text.clone()));
                        out.push(tail);
                    }
                }
            }
            Symbol::Pattern(p) => {
                if pos < end && self.grammar.pattern_matches(p, chars[pos]) {
                    for mut tail in self.walk(rest, pos + 1, end, chars, completed, memo) {
                        tail.insert(0, Value::String(chars[pos].to_string()));
                        out.push(tail);
                    }
                }
            }
            Symbol::Nonterminal(nt) => {
                let ends: BTreeSet<usize> = completed
                    .get(&(pos, nt.clone()))
                    .map(|entries| {
                        entries.iter().map(|&(e, _)| e).filter(|&e| e <= end).collect()
                    })
                    .unwrap_or_default();
                for e in ends {
                    let subtrees = self.trees(nt, pos, e, chars, completed, memo);
                    if subtrees.is_empty() {
                        continue;
                    }
                    let tails = self.walk(rest, e, end, chars, completed, memo);
                    for tree in &subtrees {
                        for tail in &tails {
                            let mut children = Vec::with_capacity(1 + tail.len());
                            children.push(tree.clone());
                            children.extend(tail.iter().cloned());
                            out.push(children);
                        }
                    }
                }
            }
        }
        out
    }
}
