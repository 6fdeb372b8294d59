//! Candidate generation (Norvig-style): enumerate edits, keep dictionary hits.

use std::collections::{BTreeSet, HashMap};

use super::{Cost, NearestExpression};
use crate::trie::Trie;

/// Every string within `max_cost` single-character edits of `target`, tagged
/// with the cost at which it was first produced (its exact edit distance).
///
/// Level k is derived only from strings first produced at level k-1.
/// Substitutions and insertions draw from `alphabet`.
pub fn generate_candidate_expressions(
    target: &str,
    max_cost: Cost,
    alphabet: &BTreeSet<char>,
) -> HashMap<String, Cost> {
    let mut generated: HashMap<String, Cost> = HashMap::new();
    generated.insert(target.to_string(), 0);
    let mut frontier = vec![target.to_string()];

    for cost in 1..=max_cost {
        let mut next = Vec::new();
        let mut record = |candidate: String| {
            if !generated.contains_key(&candidate) {
                generated.insert(candidate.clone(), cost);
                next.push(candidate);
            }
        };

        for expression in &frontier {
            let chars: Vec<char> = expression.chars().collect();
            for i in 0..=chars.len() {
                for &c in alphabet {
                    record(splice(&chars, i, 0, Some(c)));
                }
                if i == chars.len() {
                    continue;
                }
                for &c in alphabet {
                    if c != chars[i] {
                        record(splice(&chars, i, 1, Some(c)));
                    }
                }
                record(splice(&chars, i, 1, None));
            }
        }
        frontier = next;
    }
    generated
}

/// `chars` with `remove` chars at `at` replaced by `insert`.
fn splice(chars: &[char], at: usize, remove: usize, insert: Option<char>) -> String {
    let mut out = String::with_capacity(chars.len() + 1);
    out.extend(&chars[..at]);
    if let Some(c) = insert {
        out.push(c);
    }
    out.extend(&chars[at + remove..]);
    out
}

impl Trie {
    pub(crate) fn search_using_candidate_generation(
        &self,
        target: &str,
        max_cost: Cost,
    ) -> Vec<NearestExpression> {
        let candidates = generate_candidate_expressions(target, max_cost, self.alphabet());
        let mut result: Vec<NearestExpression> = candidates
            .into_iter()
            .filter_map(|(expression, cost)| {
                let hit = self.lookup(&expression)?;
                Some(NearestExpression {
                    expression,
                    cost,
                    occurrences: hit.occurrences,
                    contributors: hit.contributors,
                })
            })
            .collect();
        result.sort_by(|a, b| a.cost.cmp(&b.cost).then_with(|| a.expression.cmp(&b.expression)));
        result
    }
}
