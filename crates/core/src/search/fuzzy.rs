//! Approximate substring matching.
//!
//! Scores a search term against a title by the cheapest way to turn the term
//! into some substring of the title, penalised by how far into the title that
//! substring starts.

use serde::{Deserialize, Serialize};

/// Default acceptance threshold. A title matches when its score is below it.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Default location scale. A match starting `DEFAULT_DISTANCE` characters into
/// the title costs as much as a fully mismatched term.
pub const DEFAULT_DISTANCE: usize = 100;

/// Tuning knobs for fuzzy matching.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuzzyOptions {
    /// Scores at or above this are rejected (0.0 exact .. 1.0 anything).
    pub threshold: f64,
    /// Characters of offset that add 1.0 to the score. 0 ignores location.
    pub distance: usize,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            distance: DEFAULT_DISTANCE,
        }
    }
}

/// Best approximate occurrence of a pattern inside a text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch {
    /// Edits needed to turn the pattern into the matched substring.
    pub errors: usize,
    /// Character offset where the matched substring starts.
    pub start: usize,
    /// Combined score, capped at 1.0.
    pub score: f64,
}

impl FuzzyOptions {
    pub fn score(&self, errors: usize, start: usize, pattern_len: usize) -> f64 {
        if pattern_len == 0 {
            return 0.0;
        }
        let accuracy = errors as f64 / pattern_len as f64;
        let proximity = if self.distance == 0 {
            0.0
        } else {
            start as f64 / self.distance as f64
        };
        (accuracy + proximity).min(1.0)
    }

    /// Best-scoring occurrence of `pattern` in `text`. Both must already be
    /// case-folded.
    pub fn best_match(&self, pattern: &[char], text: &[char]) -> FuzzyMatch {
        let m = pattern.len();
        let n = text.len();

        if m == 0 {
            return FuzzyMatch {
                errors: 0,
                start: 0,
                score: 0.0,
            };
        }

        // Semi-global alignment: the pattern must be consumed entirely, the
        // text may be entered and left anywhere. Each cell carries the cost
        // and the text offset where its alignment began.
        let mut prev: Vec<(usize, usize)> = (0..=n).map(|j| (0, j)).collect();
        let mut curr = vec![(0usize, 0usize); n + 1];

        for i in 1..=m {
            curr[0] = (i, 0);
            for j in 1..=n {
                let sub_cost = usize::from(pattern[i - 1] != text[j - 1]);
                let diag = (prev[j - 1].0 + sub_cost, prev[j - 1].1);
                let skip_pattern = (prev[j].0 + 1, prev[j].1);
                let skip_text = (curr[j - 1].0 + 1, curr[j - 1].1);
                curr[j] = diag.min(skip_pattern).min(skip_text);
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        prev.iter()
            .map(|&(errors, start)| FuzzyMatch {
                errors,
                start,
                score: self.score(errors, start, m),
            })
            .min_by(|a, b| {
                a.score
                    .total_cmp(&b.score)
                    .then(a.errors.cmp(&b.errors))
                    .then(a.start.cmp(&b.start))
            })
            .unwrap_or(FuzzyMatch {
                errors: m,
                start: 0,
                score: 1.0,
            })
    }

    pub fn is_accepted(&self, score: f64) -> bool {
        score < self.threshold
    }
}

/// Lowercase a string into characters for matching.
pub fn fold(s: &str) -> Vec<char> {
    s.chars().flat_map(char::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn best(pattern: &str, text: &str) -> FuzzyMatch {
        FuzzyOptions::default().best_match(&fold(pattern), &fold(text))
    }

    #[test]
    fn test_exact_prefix_scores_zero() {
        let m = best("star", "Star Wars");
        assert_eq!(m.errors, 0);
        assert_eq!(m.start, 0);
        assert_eq!(m.score, 0.0);
    }

    #[test]
    fn test_transposition_costs_two() {
        let m = best("Star Wras", "Star Wars: The Last Jedi");
        assert_eq!(m.errors, 2);
        assert_eq!(m.start, 0);
        assert!((m.score - 2.0 / 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_location_penalty() {
        let m = best("jedi", "Star Wars: The Last Jedi");
        assert_eq!(m.errors, 0);
        assert_eq!(m.start, 20);
        assert!((m.score - 0.2).abs() < 1e-9);

        let no_location = FuzzyOptions {
            distance: 0,
            ..Default::default()
        };
        let m = no_location.best_match(&fold("jedi"), &fold("Star Wars: The Last Jedi"));
        assert_eq!(m.score, 0.0);
    }

    #[test]
    fn test_score_is_capped() {
        let m = best("zzzz", "ab");
        assert_eq!(m.errors, 4);
        assert_eq!(m.score, 1.0);
        assert!(!FuzzyOptions::default().is_accepted(m.score));
    }

    #[test]
    fn test_pattern_longer_than_text() {
        let m = best("heats", "Heat");
        assert_eq!(m.errors, 1);
        assert!(FuzzyOptions::default().is_accepted(m.score));
    }

    #[test]
    fn test_fold_is_case_insensitive() {
        assert_eq!(fold("ÉCLAIR"), fold("éclair"));
    }
}
