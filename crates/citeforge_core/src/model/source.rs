//! Bibliographic source record shared by discovery, generation and ledger.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One citable source, addressed in text by its key (`S1`, `S2`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub key: String,
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default, rename = "oa")]
    pub open_access: bool,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
}

fn untitled() -> String {
    "Untitled".to_string()
}

impl Source {
    /// Best link for the source: DOI resolver first, then the landing URL.
    pub fn link(&self) -> Option<String> {
        match (self.doi.as_deref(), self.url.as_deref()) {
            (Some(doi), _) if !doi.is_empty() => Some(format!("https://doi.org/{doi}")),
            (_, Some(url)) if !url.is_empty() => Some(url.to_string()),
            _ => None,
        }
    }

    /// Landing URL first, DOI resolver second. Used for prompt source blocks.
    pub fn display_link(&self) -> String {
        match (self.url.as_deref(), self.doi.as_deref()) {
            (Some(url), _) if !url.is_empty() => url.to_string(),
            (_, Some(doi)) if !doi.is_empty() => format!("https://doi.org/{doi}"),
            _ => String::new(),
        }
    }
}

/// Orders `S2` before `S10`. Keys without a numeric suffix sort last.
pub fn compare_source_keys(left: &str, right: &str) -> Ordering {
    match (key_number(left), key_number(right)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => left.cmp(right),
    }
}

/// Numeric part of an `S#` key.
pub fn key_number(key: &str) -> Option<u32> {
    key.trim()
        .strip_prefix(['S', 's'])
        .and_then(|digits| digits.parse().ok())
}
