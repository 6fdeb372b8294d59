//! Symmetric-delete search (SymSpell-style).
//!
//! Every stored expression is reduced by up to `depth` single-character
//! deletions and each reduction is indexed. A query is reduced the same way;
//! a stored expression reached with `d` deletions on its side and `c` on the
//! query side is reported at cost `c + d`.
//!
//! `c + d` is the insert/delete distance, which is never below the
//! Levenshtein distance: a substitution costs 2 here. A match therefore never
//! shows up cheaper than it is, and a stored expression that differs from the
//! query only by substitutions is found only if twice their count fits in
//! `max_cost`.

use std::collections::HashMap;

use super::{Cost, NearestExpression};
use crate::trie::Trie;

/// Every string obtained from `target` by deleting up to `max_cost` chars,
/// tagged with the smallest number of deletions that produces it.
/// `target` itself is included at cost 0.
pub fn delete_combinations(target: &str, max_cost: Cost) -> HashMap<String, Cost> {
    let mut reductions: HashMap<String, Cost> = HashMap::new();
    reductions.insert(target.to_string(), 0);
    let mut frontier = vec![target.to_string()];

    for cost in 1..=max_cost {
        let mut next = Vec::new();
        for expression in &frontier {
            let chars: Vec<char> = expression.chars().collect();
            for skip in 0..chars.len() {
                let reduced: String = chars
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| i != skip)
                    .map(|(_, c)| c)
                    .collect();
                if !reductions.contains_key(&reduced) {
                    reductions.insert(reduced.clone(), cost);
                    next.push(reduced);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    reductions
}

#[derive(Debug, Clone)]
struct IndexedExpression {
    expression: String,
    occurrences: usize,
    contributors: usize,
}

/// Reduction → stored expressions reaching it, precomputed from one trie.
#[derive(Debug, Default)]
pub struct SymmetricDeleteIndex {
    depth: Cost,
    expressions: Vec<IndexedExpression>,
    /// reduction → (index into `expressions`, deletions on the stored side)
    reductions: HashMap<String, Vec<(u32, Cost)>>,
}

impl SymmetricDeleteIndex {
    pub fn build(trie: &Trie, depth: Cost) -> Self {
        let mut index = Self {
            depth,
            ..Self::default()
        };
        for path in trie.leaf_paths() {
            let id = index.expressions.len() as u32;
            index.expressions.push(IndexedExpression {
                expression: path.expression.clone(),
                occurrences: path.occurrences,
                contributors: path.contributors,
            });
            for (reduction, deletions) in delete_combinations(&path.expression, depth) {
                index.reductions.entry(reduction).or_default().push((id, deletions));
            }
        }
        index
    }

    /// Deletions precomputed on the stored side.
    pub fn depth(&self) -> Cost {
        self.depth
    }

    /// Number of distinct reductions indexed.
    pub fn len(&self) -> usize {
        self.reductions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reductions.is_empty()
    }

    fn query(&self, target: &str, max_cost: Cost) -> Vec<NearestExpression> {
        let mut best: HashMap<u32, Cost> = HashMap::new();
        for (reduction, query_deletions) in delete_combinations(target, max_cost) {
            let Some(hits) = self.reductions.get(&reduction) else {
                continue;
            };
            for &(id, stored_deletions) in hits {
                let cost = query_deletions + stored_deletions;
                if cost > max_cost {
                    continue;
                }
                best.entry(id)
                    .and_modify(|c| *c = (*c).min(cost))
                    .or_insert(cost);
            }
        }

        let mut result: Vec<NearestExpression> = best
            .into_iter()
            .map(|(id, cost)| {
                let entry = &self.expressions[id as usize];
                NearestExpression {
                    expression: entry.expression.clone(),
                    cost,
                    occurrences: entry.occurrences,
                    contributors: entry.contributors,
                }
            })
            .collect();
        result.sort_by(|a, b| a.cost.cmp(&b.cost).then_with(|| a.expression.cmp(&b.expression)));
        result
    }
}

impl Trie {
    pub(crate) fn search_using_symmetric_delete(
        &self,
        target: &str,
        max_cost: Cost,
    ) -> Vec<NearestExpression> {
        self.symmetric_delete_index(max_cost).query(target, max_cost)
    }
}
