//! Fuzzy text similarity used to flag claims that copy their source.
//!
//! `token_set_ratio` compares the shared token set against each side's
//! remainder, so reordered or padded sentences still score high.

use std::collections::BTreeSet;

/// Collapses runs of whitespace to single spaces and trims.
pub fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Indel similarity of two strings in `[0, 100]`.
///
/// `2 * lcs / (len_a + len_b) * 100`, counted in chars.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    let lcs = lcs_len(&a, &b);
    (2.0 * lcs as f64 / total as f64) * 100.0
}

/// Token-set similarity of two strings in `[0, 100]`.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let diff_ab: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let diff_ba: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    // One side is a subset of the other.
    if !intersection.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let sect = intersection.join(" ");
    let rest_a = diff_ab.join(" ");
    let rest_b = diff_ba.join(" ");
    let combined_a = join_nonempty(&sect, &rest_a);
    let combined_b = join_nonempty(&sect, &rest_b);

    let mut best = ratio(&combined_a, &combined_b);
    if !sect.is_empty() {
        best = best
            .max(ratio(&sect, &combined_a))
            .max(ratio(&sect, &combined_b));
    }
    best
}

/// Similarity of a claim to its source text in `[0, 1]`.
///
/// Returns `None` when there is no source text to compare against.
pub fn similarity(claim: &str, source_text: Option<&str>) -> Option<f64> {
    let source_text = source_text.filter(|text| !text.trim().is_empty())?;
    Some(token_set_ratio(&normalize_ws(claim), &normalize_ws(source_text)) / 100.0)
}

fn join_nonempty(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{head} {tail}"),
    }
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ch_a in a {
        for (j, ch_b) in b.iter().enumerate() {
            curr[j + 1] = if ch_a == ch_b {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
