//! Full-trie traversal: Levenshtein against every stored expression.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::edit_distance::edit_distance_to;
use super::{Cost, NearestExpression};
use crate::trie::Trie;

impl Trie {
    pub(crate) fn search_using_trie_traversal(
        &self,
        target: &str,
        max_cost: Cost,
        max_threads: usize,
    ) -> Vec<NearestExpression> {
        let paths = self.leaf_paths();
        let target_chars: Vec<char> = target.chars().collect();

        // Workers claim the next unclaimed path; the lock is only taken to append a match.
        let cursor = AtomicUsize::new(0);
        let matches: Mutex<Vec<(usize, NearestExpression)>> = Mutex::new(Vec::new());

        let work = || loop {
            let idx = cursor.fetch_add(1, Ordering::Relaxed);
            let Some(path) = paths.get(idx) else { break };
            let cost = edit_distance_to(&path.expression, &target_chars);
            if cost <= max_cost {
                matches.lock().unwrap_or_else(|e| e.into_inner()).push((
                    idx,
                    NearestExpression {
                        expression: path.expression.clone(),
                        cost,
                        occurrences: path.occurrences,
                        contributors: path.contributors,
                    },
                ));
            }
        };

        let workers = max_threads.clamp(1, paths.len().max(1));
        if workers == 1 {
            work();
        } else {
            std::thread::scope(|s| {
                for _ in 0..workers {
                    s.spawn(&work);
                }
            });
        }

        let mut matches = matches.into_inner().unwrap_or_else(|e| e.into_inner());
        // Completion order depends on scheduling; report in trie order.
        matches.sort_unstable_by_key(|(idx, _)| *idx);
        matches.into_iter().map(|(_, m)| m).collect()
    }
}
