//! Token-set similarity primitives.
//!
//! Used by the coordination detector to flag copy-paste summaries within
//! a same-coldkey response group. Word-level Jaccard is crude but cheap,
//! and coordinated operators rarely bother rewording their output.

use std::collections::HashSet;

/// Jaccard similarity between two texts over lowercase whitespace tokens.
///
/// Two empty texts are considered identical (1.0); one empty and one
/// non-empty share nothing (0.0).
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<String> = a.split_whitespace().map(str::to_lowercase).collect();
    let tokens_b: HashSet<String> = b.split_whitespace().map(str::to_lowercase).collect();

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Mean Jaccard similarity over all unordered pairs of `texts`.
///
/// Returns 0.0 when fewer than two non-empty texts are supplied; a group
/// that said nothing carries no similarity signal.
pub fn pairwise_mean_similarity<S: AsRef<str>>(texts: &[S]) -> f64 {
    let non_empty = texts
        .iter()
        .filter(|t| !t.as_ref().trim().is_empty())
        .count();
    if non_empty < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..texts.len() {
        for j in (i + 1)..texts.len() {
            total += jaccard_similarity(texts[i].as_ref(), texts[j].as_ref());
            pairs += 1;
        }
    }

    if pairs == 0 {
        0.0
    } else {
        total / pairs as f64
    }
}
