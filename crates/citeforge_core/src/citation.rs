//! Inline `[S#]` citation hygiene.
//!
//! # Responsibility
//! - Link, strip and sanitize inline source tags in generated text.
//! - Repair model output so every paragraph carries an approved citation.
//!
//! # Invariants
//! - Only tags of the exact form `[S<digits>]` are treated as citations.
//! - Key order is the order of first appearance; duplicates are dropped.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{BTreeMap, HashSet};

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(S\d+)\]").expect("valid tag regex"));
static LINKED_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[S\d+\]\([^)]+\)").expect("valid linked tag regex"));
static BARE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bS\d+\b").expect("valid bare key regex"));
static PARAGRAPH_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n+").expect("valid paragraph split regex"));

/// Literal placeholder models sometimes emit instead of a real key.
pub const PLACEHOLDER_TAG: &str = "[S#]";

/// Returns unique `S#` keys cited with `[S#]` tags, in order of appearance.
pub fn source_keys(text: &str) -> Vec<String> {
    dedup_in_order(TAG_RE.captures_iter(text).map(|caps| caps[1].to_string()))
}

/// Returns whether the text contains at least one `[S#]` tag.
pub fn has_citation(text: &str) -> bool {
    TAG_RE.is_match(text)
}

/// Rewrites `[S1]` to `[S1](url)` for keys present in `mapping`.
///
/// Unmapped tags are left as they are.
pub fn link_sources(text: &str, mapping: &BTreeMap<String, String>) -> String {
    if mapping.is_empty() {
        return text.to_string();
    }
    TAG_RE
        .replace_all(text, |caps: &Captures<'_>| match mapping.get(&caps[1]) {
            Some(url) => format!("[{}]({url})", &caps[1]),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Removes linked and bare `[S#]` tags, then collapses whitespace.
pub fn strip_sources(text: &str) -> String {
    let without_links = LINKED_TAG_RE.replace_all(text, "");
    let without_tags = TAG_RE.replace_all(&without_links, "");
    without_tags.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops any `[S#]` tag whose key is not in `allowed`.
pub fn sanitize_citations(text: &str, allowed: &[String]) -> String {
    if text.is_empty() {
        return String::new();
    }
    let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
    TAG_RE
        .replace_all(text, |caps: &Captures<'_>| {
            if allowed.contains(&caps[1]) {
                caps[0].to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Replaces literal `[S#]` placeholders with `[key]`.
pub fn replace_placeholders(text: &str, key: &str) -> String {
    text.replace(PLACEHOLDER_TAG, &format!("[{key}]"))
}

/// Appends `[first key]` to every paragraph without a citation.
///
/// No-op when `keys` is empty or the text is empty.
pub fn ensure_citation_per_paragraph(text: &str, keys: &[String]) -> String {
    let Some(first) = keys.first() else {
        return text.to_string();
    };
    if text.trim().is_empty() {
        return text.to_string();
    }

    PARAGRAPH_SPLIT_RE
        .split(text.trim())
        .map(|paragraph| {
            if has_citation(paragraph) {
                paragraph.to_string()
            } else {
                format!("{} [{first}]", paragraph.trim_end())
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Parses bare `S#` tokens (e.g. a model's `S1,S3` answer), unique and ordered.
pub fn parse_selected_keys(text: &str) -> Vec<String> {
    dedup_in_order(BARE_KEY_RE.find_iter(text).map(|m| m.as_str().to_string()))
}

/// Splits text into blank-line separated paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    PARAGRAPH_SPLIT_RE
        .split(text)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(str::to_string)
        .collect()
}

fn dedup_in_order(keys: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.filter(|key| seen.insert(key.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn source_keys_are_unique_and_ordered() {
        assert_eq!(
            source_keys("a [S2] b [S1] c [S2] [S10]"),
            keys(&["S2", "S1", "S10"])
        );
    }

    #[test]
    fn link_sources_only_touches_mapped_keys() {
        let mut mapping = BTreeMap::new();
        mapping.insert("S1".to_string(), "https://example.org/1".to_string());
        assert_eq!(
            link_sources("x [S1] y [S2]", &mapping),
            "x [S1](https://example.org/1) y [S2]"
        );
        assert_eq!(link_sources("x [S1]", &BTreeMap::new()), "x [S1]");
    }

    #[test]
    fn strip_sources_removes_tags_and_collapses_whitespace() {
        let text = "Dopamine rises [S1](https://e.org/a) with novelty [S2].\n\nNext";
        assert_eq!(strip_sources(text), "Dopamine rises with novelty . Next");
    }

    #[test]
    fn sanitize_drops_unapproved_keys() {
        assert_eq!(
            sanitize_citations("a [S1] b [S7] c", &keys(&["S1"])),
            "a [S1] b  c"
        );
    }

    #[test]
    fn ensure_citation_appends_first_key_where_missing() {
        let text = "First [S2].\n\nSecond without cite.";
        assert_eq!(
            ensure_citation_per_paragraph(text, &keys(&["S3", "S2"])),
            "First [S2].\n\nSecond without cite. [S3]"
        );
        assert_eq!(ensure_citation_per_paragraph("plain", &[]), "plain");
    }

    #[test]
    fn placeholder_is_rewritten() {
        assert_eq!(replace_placeholders("claim [S#].", "S4"), "claim [S4].");
    }

    #[test]
    fn parse_selected_keys_reads_comma_lists() {
        assert_eq!(parse_selected_keys("S1, S3,S1 and S12"), keys(&["S1", "S3", "S12"]));
        assert!(parse_selected_keys("none").is_empty());
    }
}
