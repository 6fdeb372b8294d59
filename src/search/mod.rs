//! Nearest-expression search: every stored expression within a bounded edit
//! distance of a query.
//!
//! Three interchangeable algorithms sit behind [`Trie::search_nearest_expressions`]:
//!
//! * [`SearchAlgorithm::TrieTraversal`]: Levenshtein distance against every
//!   stored expression, fanned out over a short-lived worker pool. Cost is
//!   linear in training-set size, independent of query length.
//! * [`SearchAlgorithm::CandidateGeneration`]: generate every string within
//!   `max_cost` single-character edits over the trie's alphabet and keep the
//!   ones the trie contains. Independent of training-set size, exponential in
//!   `max_cost`.
//! * [`SearchAlgorithm::SymmetricDelete`]: intersect the query's deletion-only
//!   reductions with a precomputed index of the training set's reductions.
//!   Fastest at query time; only finds matches reachable through deletions on
//!   either side (see [`symmetric_delete`]).

mod candidates;
mod edit_distance;
mod symmetric_delete;
mod traversal;

pub use candidates::generate_candidate_expressions;
pub use edit_distance::edit_distance;
pub use symmetric_delete::{delete_combinations, SymmetricDeleteIndex};

use serde::{Deserialize, Serialize};

use crate::trie::Trie;

/// Edit distance between two compacted expressions.
pub type Cost = usize;

/// A stored expression near a query.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct NearestExpression {
    /// Compacted form; expand with the run's compacter for display.
    pub expression: String,
    pub cost: Cost,
    pub occurrences: usize,
    /// Distinct training contributors of this expression.
    pub contributors: usize,
}

impl NearestExpression {
    pub fn new(expression: impl Into<String>, cost: Cost, occurrences: usize) -> Self {
        Self {
            expression: expression.into(),
            cost,
            occurrences,
            contributors: 0,
        }
    }
}

/// Static choice of search algorithm.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SearchAlgorithm {
    #[default]
    TrieTraversal,
    CandidateGeneration,
    SymmetricDelete,
}

impl SearchAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrieTraversal => "trie-traversal",
            Self::CandidateGeneration => "candidate-generation",
            Self::SymmetricDelete => "symmetric-delete",
        }
    }
}

impl std::fmt::Display for SearchAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SearchAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "trie-traversal" | "traversal" => Ok(Self::TrieTraversal),
            "candidate-generation" | "norvig" => Ok(Self::CandidateGeneration),
            "symmetric-delete" | "symspell" => Ok(Self::SymmetricDelete),
            _ => Err(format!("Unknown search algorithm: {}", s)),
        }
    }
}

impl Trie {
    /// Every stored expression within `max_cost` edits of `target` (compacted).
    ///
    /// `max_threads` bounds the fan-out of the traversal algorithm; the other
    /// algorithms run on the calling thread.
    pub fn search_nearest_expressions(
        &self,
        target: &str,
        max_cost: Cost,
        max_threads: usize,
        algorithm: SearchAlgorithm,
    ) -> Vec<NearestExpression> {
        match algorithm {
            SearchAlgorithm::TrieTraversal => {
                self.search_using_trie_traversal(target, max_cost, max_threads)
            }
            SearchAlgorithm::CandidateGeneration => {
                self.search_using_candidate_generation(target, max_cost)
            }
            SearchAlgorithm::SymmetricDelete => {
                self.search_using_symmetric_delete(target, max_cost)
            }
        }
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
