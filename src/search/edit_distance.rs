//! Classic Levenshtein distance with a two-row table.

use super::Cost;

const REPLACE_COST: Cost = 1;
const INSERT_COST: Cost = 1;
const DELETE_COST: Cost = 1;

/// Levenshtein distance between `source` and `target`, counted in chars.
///
/// Full O(len(source)·len(target)) table, no early exit once the distance
/// exceeds any bound: expressions are short.
pub fn edit_distance(source: &str, target: &str) -> Cost {
    let target: Vec<char> = target.chars().collect();
    edit_distance_to(source, &target)
}

/// Same as [`edit_distance`] with the target already split into chars, so
/// one query can be compared against many stored expressions cheaply.
pub(crate) fn edit_distance_to(source: &str, target: &[char]) -> Cost {
    // Row i holds the distances between source[..i] and every target prefix.
    let mut previous: Vec<Cost> = (0..=target.len()).collect();
    let mut current: Vec<Cost> = vec![0; target.len() + 1];

    for (i, source_char) in source.chars().enumerate() {
        current[0] = i + 1;
        for j in 1..=target.len() {
            let substitution = if source_char == target[j - 1] { 0 } else { REPLACE_COST };
            current[j] = (current[j - 1] + INSERT_COST)
                .min(previous[j] + DELETE_COST)
                .min(previous[j - 1] + substitution);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[target.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kitten_sitting() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_equal_strings() {
        assert_eq!(edit_distance("(0 (1))", "(0 (1))"), 0);
        assert_eq!(edit_distance("", ""), 0);
    }

    #[test]
    fn test_empty_side() {
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abcd", ""), 4);
    }

    #[test]
    fn test_single_edits() {
        assert_eq!(edit_distance("(1)", "(2)"), 1);
        assert_eq!(edit_distance("(1)", "(12)"), 1);
        assert_eq!(edit_distance("(12)", "(1)"), 1);
    }

    #[test]
    fn test_transposition_costs_two() {
        assert_eq!(edit_distance("ab", "ba"), 2);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        assert_eq!(edit_distance("é", "e"), 1);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn distance_is_symmetric(a in "[a-d() ]{0,12}", b in "[a-d() ]{0,12}") {
            prop_assert_eq!(edit_distance(&a, &b), edit_distance(&b, &a));
        }

        #[test]
        fn distance_to_self_is_zero(a in "\\PC{0,30}") {
            prop_assert_eq!(edit_distance(&a, &a), 0);
        }

        #[test]
        fn distance_bounded_by_lengths(a in "[a-c]{0,10}", b in "[a-c]{0,10}") {
            let d = edit_distance(&a, &b);
            let (la, lb) = (a.chars().count(), b.chars().count());
            prop_assert!(d >= la.abs_diff(lb));
            prop_assert!(d <= la.max(lb));
        }

        #[test]
        fn triangle_inequality(
            a in "[a-c]{0,8}", b in "[a-c]{0,8}", c in "[a-c]{0,8}"
        ) {
            prop_assert!(edit_distance(&a, &c) <= edit_distance(&a, &b) + edit_distance(&b, &c));
        }
    }
}
