//! Ranking of nearest expressions and the anomaly rule.

use std::collections::BTreeMap;

use crate::search::{Cost, NearestExpression};

/// Order suggestions by edit cost ascending, then by occurrences descending.
/// Stable: equal entries keep their search order.
pub fn sort_and_rank_results(results: &mut [NearestExpression]) {
    results.sort_by(|a, b| {
        a.cost
            .cmp(&b.cost)
            .then_with(|| b.occurrences.cmp(&a.occurrences))
    });
}

/// Whether an expression with these nearest neighbours looks like a rare
/// variant of a common pattern.
///
/// The most frequent expression at each cost is weighted (full weight for
/// costs 0 and 1, `1/(cost+1)` beyond) and the cost-0 share of the weighted
/// total is compared against `threshold` (a percentage). The expression is
/// anomalous when an exact match exists, its share is below the threshold,
/// and no other cost has a strictly smaller share.
pub fn is_potential_anomaly(results: &[NearestExpression], threshold: f64) -> bool {
    let mut max_at_cost: BTreeMap<Cost, usize> = BTreeMap::new();
    for r in results {
        let entry = max_at_cost.entry(r.cost).or_insert(0);
        *entry = (*entry).max(r.occurrences);
    }
    let Some(&exact) = max_at_cost.get(&0) else {
        return false;
    };

    let total: f64 = max_at_cost
        .iter()
        .map(|(&cost, &occurrences)| cost_weight(cost) * occurrences as f64)
        .sum();
    if total <= 0.0 {
        return false;
    }

    let percent = |occurrences: usize| occurrences as f64 * 100.0 / total;
    let exact_percent = percent(exact);
    let lowest = max_at_cost
        .values()
        .map(|&o| percent(o))
        .fold(f64::INFINITY, f64::min);

    exact_percent < threshold && exact_percent <= lowest
}

fn cost_weight(cost: Cost) -> f64 {
    if cost <= 1 { 1.0 } else { 1.0 / (cost as f64 + 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ne(expression: &str, cost: Cost, occurrences: usize) -> NearestExpression {
        NearestExpression::new(expression, cost, occurrences)
    }

    fn key(results: &[NearestExpression]) -> Vec<(Cost, usize)> {
        results.iter().map(|r| (r.cost, r.occurrences)).collect()
    }

    #[test]
    fn test_rank_by_cost_then_occurrences() {
        let mut results = vec![ne("a", 2, 5), ne("b", 1, 1), ne("c", 1, 9)];
        sort_and_rank_results(&mut results);
        assert_eq!(key(&results), vec![(1, 9), (1, 1), (2, 5)]);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let mut results = vec![ne("x", 1, 4), ne("y", 1, 4), ne("z", 0, 1)];
        sort_and_rank_results(&mut results);
        let order: Vec<_> = results.iter().map(|r| r.expression.as_str()).collect();
        assert_eq!(order, vec!["z", "x", "y"]);
    }

    #[test]
    fn test_rank_empty() {
        let mut results: Vec<NearestExpression> = Vec::new();
        sort_and_rank_results(&mut results);
        assert!(results.is_empty());
    }

    #[test]
    fn test_rare_exact_match_is_anomaly() {
        let results = vec![ne("(x)", 0, 1), ne("(y)", 1, 100)];
        assert!(is_potential_anomaly(&results, 5.0));
    }

    #[test]
    fn test_common_exact_match_is_not_anomaly() {
        let results = vec![ne("(x)", 0, 100), ne("(y)", 1, 1)];
        assert!(!is_potential_anomaly(&results, 5.0));
    }

    #[test]
    fn test_no_exact_match_is_not_anomaly() {
        let results = vec![ne("(y)", 1, 1), ne("(z)", 2, 100)];
        assert!(!is_potential_anomaly(&results, 50.0));
    }

    #[test]
    fn test_empty_results_not_anomaly() {
        assert!(!is_potential_anomaly(&[], 5.0));
    }

    #[test]
    fn test_only_exact_match_is_not_anomaly() {
        // 100% share is never below a sane threshold.
        assert!(!is_potential_anomaly(&[ne("(x)", 0, 3)], 5.0));
    }

    #[test]
    fn test_tie_with_lowest_counts_as_anomaly() {
        // cost0 = 2, cost1 = 2, cost2 = 120 (weight 1/3 → 40): total 44.
        // Both cost 0 and cost 1 sit at 4.5%, the lowest share.
        let results = vec![ne("a", 0, 2), ne("b", 1, 2), ne("c", 2, 120)];
        assert!(is_potential_anomaly(&results, 5.0));
    }

    #[test]
    fn test_exact_not_lowest_is_not_anomaly() {
        // cost0 = 2, cost1 = 1, cost2 = 150 (weight 1/3 → 50): cost 1 is lower.
        let results = vec![ne("a", 0, 2), ne("b", 1, 1), ne("c", 2, 150)];
        assert!(!is_potential_anomaly(&results, 5.0));
    }

    #[test]
    fn test_uses_max_occurrence_per_cost() {
        // Only the largest cost-1 bucket counts: 1 vs 100, the 3 is ignored.
        let results = vec![ne("a", 0, 1), ne("b", 1, 3), ne("c", 1, 100)];
        assert!(is_potential_anomaly(&results, 5.0));
    }

    #[test]
    fn test_threshold_is_strict() {
        // cost0 share is exactly 50%.
        let results = vec![ne("a", 0, 10), ne("b", 1, 10)];
        assert!(!is_potential_anomaly(&results, 50.0));
        assert!(is_potential_anomaly(&results, 50.1));
    }
}
