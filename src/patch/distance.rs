//! Weighted edit distance between two lines.

use crate::config::LevenshteinWeights;

/// Levenshtein distance from `a` to `b` with per-operation costs.
///
/// Insertion adds a character of `b`, deletion removes a character of `a`.
/// Unit weights take the `strsim` fast path.
pub fn weighted_levenshtein(a: &str, b: &str, weights: LevenshteinWeights) -> usize {
    if weights == LevenshteinWeights::UNIT {
        return strsim::levenshtein(a, b);
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).map(|j| j * weights.insertion).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = (i + 1) * weights.deletion;
        for (j, cb) in b.iter().enumerate() {
            let substitute = if ca == cb {
                prev[j]
            } else {
                prev[j] + weights.substitution
            };
            curr[j + 1] = substitute
                .min(prev[j + 1] + weights.deletion)
                .min(curr[j] + weights.insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: LevenshteinWeights = LevenshteinWeights {
        insertion: 1,
        deletion: 1,
        substitution: 3,
    };

    #[test]
    fn identical_lines_are_free() {
        assert_eq!(weighted_levenshtein("    return x", "    return x", DEFAULT), 0);
        assert_eq!(weighted_levenshtein("", "", DEFAULT), 0);
    }

    #[test]
    fn substitution_is_replaced_by_delete_plus_insert() {
        // One substitution costs 3, a delete plus an insert costs 2.
        assert_eq!(weighted_levenshtein("cat", "cut", DEFAULT), 2);
        assert_eq!(weighted_levenshtein("cat", "cut", LevenshteinWeights::UNIT), 1);
    }

    #[test]
    fn empty_side_costs_length() {
        assert_eq!(weighted_levenshtein("", "abcd", DEFAULT), 4);
        assert_eq!(weighted_levenshtein("abcd", "", DEFAULT), 4);
    }

    #[test]
    fn unit_weights_match_strsim() {
        let expensive_unit = LevenshteinWeights {
            insertion: 1,
            deletion: 1,
            substitution: 2,
        };
        assert_eq!(weighted_levenshtein("kitten", "sitting", LevenshteinWeights::UNIT), 3);
        assert_eq!(weighted_levenshtein("kitten", "sitting", expensive_unit), 5);
    }

    #[test]
    fn asymmetric_weights() {
        let weights = LevenshteinWeights {
            insertion: 5,
            deletion: 1,
            substitution: 10,
        };
        assert_eq!(weighted_levenshtein("ab", "a", weights), 1);
        assert_eq!(weighted_levenshtein("a", "ab", weights), 5);
    }
}
