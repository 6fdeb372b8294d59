//! Pattern store: a prefix trie over compacted expressions.
//!
//! One trie exists per abstraction level. It is built single-threaded from a
//! training corpus and is read-only afterwards, so scanner threads share it
//! through plain `&Trie` references.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::compacter::ExpressionCompacter;
use crate::config::Level;
use crate::corpus;
use crate::error::FlagError;
use crate::read_file_lossy;
use crate::search::SymmetricDeleteIndex;

/// Training-corpus line number that produced a pattern.
pub type ContributorId = usize;

/// contributor → number of times it produced this exact expression.
pub type PatternContributors = BTreeMap<ContributorId, usize>;

// ─── Nodes ───────────────────────────────────────────────────────────

/// One character position shared by every stored expression with this prefix.
/// Each node exclusively owns its children.
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct TrieNode {
    ch: char,
    children: BTreeMap<char, TrieNode>,
    terminal: bool,
    occurrences: usize,
    contributors: PatternContributors,
}

impl TrieNode {
    fn new(ch: char) -> Self {
        Self { ch, ..Self::default() }
    }

    pub fn ch(&self) -> char {
        self.ch
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Number of inserts whose path visited this node.
    pub fn occurrences(&self) -> usize {
        self.occurrences
    }

    pub fn contributors(&self) -> &PatternContributors {
        &self.contributors
    }

    pub fn child(&self, ch: char) -> Option<&TrieNode> {
        self.children.get(&ch)
    }
}

// ─── Query results ───────────────────────────────────────────────────

/// Result of an exact [`Trie::lookup`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookupHit {
    pub occurrences: usize,
    /// Share of all training inserts that produced exactly this expression.
    pub confidence: f32,
    /// Number of distinct contributors of this expression.
    pub contributors: usize,
}

/// A stored expression materialized by [`Trie::leaf_paths`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafPath {
    pub expression: String,
    pub occurrences: usize,
    pub contributors: usize,
}

/// One row of [`Trie::dump`], with the expression expanded back to tokens.
#[derive(Debug, Clone, Serialize)]
pub struct DumpRow {
    pub expression: String,
    pub occurrences: usize,
    pub contributors: Vec<(ContributorId, usize)>,
}

// ─── Trie ────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug)]
pub struct Trie {
    level: Level,
    root: TrieNode,
    /// Distinct characters seen in any stored expression.
    alphabet: BTreeSet<char>,
    /// Total inserts (including repeats).
    total_inserts: usize,
    /// Distinct stored expressions.
    distinct: usize,
    /// Symmetric-delete index depth requested at build time, if any.
    delete_index_depth: Option<usize>,
    #[serde(skip)]
    leaf_paths: OnceLock<Vec<LeafPath>>,
    #[serde(skip)]
    delete_index: OnceLock<SymmetricDeleteIndex>,
}

impl Trie {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            root: TrieNode::new('\0'),
            alphabet: BTreeSet::new(),
            total_inserts: 0,
            distinct: 0,
            delete_index_depth: None,
            leaf_paths: OnceLock::new(),
            delete_index: OnceLock::new(),
        }
    }

    /// Build the trie for `level` from a training corpus.
    pub fn build(
        path: &Path,
        level: Level,
        compacter: &ExpressionCompacter,
    ) -> Result<Trie, FlagError> {
        let not_found = || FlagError::TrainingFileNotFound {
            path: path.display().to_string(),
        };
        // Source lines between the markers may be in any encoding.
        let (contents, was_lossy) = read_file_lossy(path).map_err(|_| not_found())?;
        if was_lossy {
            debug!(path = %path.display(), "Training corpus is not valid UTF-8, decoded lossily");
        }
        let start = Instant::now();

        let mut trie = Trie::new(level);
        for (idx, line) in contents.lines().enumerate() {
            if let Some(expression) = corpus::training_payload(line, level) {
                trie.insert(expression, idx + 1, compacter);
            }
        }

        info!(
            level = %level,
            expressions = trie.total_inserts,
            distinct = trie.distinct,
            alphabet = trie.alphabet.len(),
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "Trie build complete"
        );
        Ok(trie)
    }

    /// Store `expression` (uncompacted) on behalf of `contributor`.
    ///
    /// Every node on the path, the terminal included, has its occurrence
    /// count bumped once. Training is single-writer; `&mut self` enforces it.
    pub fn insert(
        &mut self,
        expression: &str,
        contributor: ContributorId,
        compacter: &ExpressionCompacter,
    ) {
        let compacted = compacter.compact(expression);
        self.insert_compacted(&compacted, contributor);
    }

    pub fn insert_compacted(&mut self, compacted: &str, contributor: ContributorId) {
        self.leaf_paths.take();
        self.delete_index.take();

        let mut node = &mut self.root;
        for ch in compacted.chars() {
            node.occurrences += 1;
            node = node.children.entry(ch).or_insert_with(|| TrieNode::new(ch));
            self.alphabet.insert(ch);
        }
        node.occurrences += 1;
        if !node.terminal {
            node.terminal = true;
            self.distinct += 1;
        }
        *node.contributors.entry(contributor).or_insert(0) += 1;
        self.total_inserts += 1;
    }

    /// Exact lookup of a compacted expression.
    pub fn lookup(&self, compacted: &str) -> Option<LookupHit> {
        let mut node = &self.root;
        for ch in compacted.chars() {
            node = node.children.get(&ch)?;
        }
        if !node.terminal {
            return None;
        }
        let exact: usize = node.contributors.values().sum();
        let confidence = if self.total_inserts == 0 {
            0.0
        } else {
            exact as f32 / self.total_inserts as f32
        };
        Some(LookupHit {
            occurrences: node.occurrences,
            confidence,
            contributors: node.contributors.len(),
        })
    }

    /// Breadth-first walk over every stored expression.
    pub fn visit_all_leaf_nodes<F>(&self, mut visit: F)
    where
        F: FnMut(&str, usize, &PatternContributors),
    {
        let mut queue: VecDeque<(&TrieNode, String)> = VecDeque::new();
        queue.push_back((&self.root, String::new()));
        while let Some((node, prefix)) = queue.pop_front() {
            if node.terminal {
                visit(&prefix, node.occurrences, &node.contributors);
            }
            for child in node.children.values() {
                let mut path = String::with_capacity(prefix.len() + child.ch.len_utf8());
                path.push_str(&prefix);
                path.push(child.ch);
                queue.push_back((child, path));
            }
        }
    }

    /// Every stored expression, materialized once and reused by later searches.
    pub fn leaf_paths(&self) -> &[LeafPath] {
        self.leaf_paths.get_or_init(|| {
            let mut paths = Vec::with_capacity(self.distinct);
            self.visit_all_leaf_nodes(|expression, occurrences, contributors| {
                paths.push(LeafPath {
                    expression: expression.to_string(),
                    occurrences,
                    contributors: contributors.len(),
                });
            });
            paths
        })
    }

    /// Request a symmetric-delete index of `max_cost` deletions and build it now.
    pub fn prepare_symmetric_delete(&mut self, max_cost: usize) {
        self.delete_index_depth = Some(max_cost);
        self.delete_index.take();
        let _ = self.symmetric_delete_index(max_cost);
    }

    /// The symmetric-delete index, built on first use. The depth fixed at
    /// build time wins over the `max_cost` of later queries.
    pub(crate) fn symmetric_delete_index(&self, max_cost: usize) -> &SymmetricDeleteIndex {
        self.delete_index.get_or_init(|| {
            let depth = self.delete_index_depth.unwrap_or(max_cost);
            SymmetricDeleteIndex::build(self, depth)
        })
    }

    /// All stored expressions with their contributors, expanded for display.
    pub fn dump(
        &self,
        sorted: bool,
        compacter: &ExpressionCompacter,
    ) -> Result<Vec<DumpRow>, FlagError> {
        let mut rows = Vec::with_capacity(self.distinct);
        let mut failure = None;
        self.visit_all_leaf_nodes(|expression, occurrences, contributors| {
            if failure.is_some() {
                return;
            }
            match compacter.expand(expression) {
                Ok(expanded) => rows.push(DumpRow {
                    expression: expanded,
                    occurrences,
                    contributors: contributors.iter().map(|(&c, &n)| (c, n)).collect(),
                }),
                Err(e) => failure = Some(e),
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        if sorted {
            rows.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
        }
        Ok(rows)
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    pub fn alphabet(&self) -> &BTreeSet<char> {
        &self.alphabet
    }

    pub fn total_inserts(&self) -> usize {
        self.total_inserts
    }

    /// Number of distinct stored expressions.
    pub fn len(&self) -> usize {
        self.distinct
    }

    pub fn is_empty(&self) -> bool {
        self.distinct == 0
    }
}

#[cfg(test)]
#[path = "trie_tests.rs"]
mod tests;
