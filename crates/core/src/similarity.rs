//! Relevance of a result title to the search query.
//!
//! Scores run from 0 to 100. Both strings are accent-folded, lowercased and
//! whitespace-collapsed first, then ranked in tiers:
//!
//! | match            | score                       |
//! |------------------|-----------------------------|
//! | exact            | 100                         |
//! | title starts with query | 80 + 20 × ratio      |
//! | title contains query    | 60 + 20 × ratio      |
//! | otherwise        | 60 × ratio                  |
//!
//! where `ratio = 1 - levenshtein / max_len`. The numbers are a ranking aid,
//! not a stable contract.

use crate::normalize::{collapse_whitespace, fold};

/// Scores `title` against `query`, 0–100, rounded to one decimal.
///
/// ```rust
/// use tebeo_core::similarity::similarity;
///
/// assert_eq!(similarity("valerian", "VALERIAN"), 100.0);
/// assert!(similarity("valerian", "VALERIAN (1978, GRIJALBO)") > similarity("valerian", "LAUREL"));
/// ```
pub fn similarity(query: &str, title: &str) -> f64 {
    let query = collapse_whitespace(&fold(query));
    let title = collapse_whitespace(&fold(title));

    if query.is_empty() || title.is_empty() {
        return 0.0;
    }

    let ratio = ratio(&query, &title);
    let score = if query == title {
        100.0
    } else if title.starts_with(&query) {
        80.0 + 20.0 * ratio
    } else if title.contains(&query) {
        60.0 + 20.0 * ratio
    } else {
        60.0 * ratio
    };

    (score * 10.0).round() / 10.0
}

/// Normalized edit similarity: 1.0 for equal strings, 0.0 for disjoint ones.
fn ratio(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut dp: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut prev = dp[0];
        dp[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let temp = dp[j + 1];
            dp[j + 1] = if ca == *cb { prev } else { 1 + prev.min(dp[j]).min(dp[j + 1]) };
            prev = temp;
        }
    }
    dp[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("guión", "guion"), 1);
    }

    #[test]
    fn test_exact_ignores_case_and_accents() {
        assert_eq!(similarity("Mortadelo  y Filemón", "MORTADELO Y FILEMON"), 100.0);
    }

    #[test]
    fn test_tiers_are_ordered() {
        let prefix = similarity("valerian", "VALERIAN (1978, GRIJALBO)");
        let contains = similarity("valerian", "LAS AVENTURAS DE VALERIAN");
        let fuzzy = similarity("valerian", "VALERIAM");
        let unrelated = similarity("valerian", "ZIPI Y ZAPE");

        assert!(prefix >= 80.0 && prefix < 100.0);
        assert!(contains >= 60.0 && contains < 80.0);
        assert!(fuzzy < 60.0 && fuzzy > unrelated);
    }

    #[test]
    fn test_empty_inputs_score_zero() {
        assert_eq!(similarity("", "VALERIAN"), 0.0);
        assert_eq!(similarity("valerian", "  "), 0.0);
    }
}
