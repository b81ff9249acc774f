//! Open-access source discovery and bibliography formatting.
//!
//! # Responsibility
//! - Query literature providers and turn hits into keyed [`Source`]s.
//! - Format sources for prompts, reference lists and the claim ledger.
//! - Read and write `sources.json` files and link maps.
//!
//! # Invariants
//! - Keys are assigned `S1..Sn` in pick order.
//! - A failing provider never aborts discovery; it is logged and skipped.

mod europe_pmc;
mod files;
mod http;
mod pubmed;

pub use europe_pmc::EuropePmcProvider;
pub use files::{load_link_map, load_sources_json, write_sources_json};
pub use pubmed::PubMedProvider;

use crate::model::source::Source;
use crate::similarity::normalize_ws;
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Words of chunk text kept when it is used as a search topic.
const MAX_TOPIC_WORDS: usize = 32;

#[derive(Debug)]
pub enum SourceError {
    /// Transport failure or non-success HTTP status.
    Request {
        provider: &'static str,
        message: String,
    },
    /// Provider answered with a body that could not be decoded.
    Decode {
        provider: &'static str,
        message: String,
    },
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request { provider, message } => {
                write!(f, "{provider} request failed: {message}")
            }
            Self::Decode { provider, message } => {
                write!(f, "{provider} response could not be decoded: {message}")
            }
            Self::Io(err) => write!(f, "sources file error: {err}"),
            Self::Json(err) => write!(f, "sources json error: {err}"),
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SourceError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Provider hit before a key is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCandidate {
    pub title: String,
    pub url: Option<String>,
    pub doi: Option<String>,
    pub year: Option<i32>,
    pub open_access: bool,
    pub abstract_text: Option<String>,
}

impl SourceCandidate {
    fn into_source(self, key: String) -> Source {
        Source {
            key,
            title: self.title,
            url: self.url,
            doi: self.doi,
            year: self.year,
            open_access: self.open_access,
            abstract_text: self.abstract_text,
        }
    }
}

/// Literature search backend.
pub trait SourceProvider {
    /// Short stable name used in logs and errors.
    fn name(&self) -> &'static str;
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SourceCandidate>, SourceError>;
}

/// Europe PMC (open access only) followed by PubMed.
pub fn default_providers() -> Vec<Box<dyn SourceProvider>> {
    vec![
        Box::new(EuropePmcProvider::default()),
        Box::new(PubMedProvider::default()),
    ]
}

/// Condenses chunk text into a search topic.
pub fn search_topic(text: &str) -> String {
    normalize_ws(text)
        .split(' ')
        .take(MAX_TOPIC_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collects up to `need` sources for `topic`, querying providers in order.
///
/// Each provider receives `"{topic} {domain}"`.
pub fn build_sources(
    topic: &str,
    domain: &str,
    need: usize,
    providers: &[Box<dyn SourceProvider>],
) -> Vec<Source> {
    let query = format!("{} {}", search_topic(topic), domain.trim())
        .trim()
        .to_string();
    let mut picked: Vec<Source> = Vec::new();

    for provider in providers {
        if picked.len() >= need {
            break;
        }
        let started_at = Instant::now();
        match provider.search(&query, need.saturating_mul(3).max(10)) {
            Ok(candidates) => {
                let before = picked.len();
                for candidate in candidates {
                    if picked.len() >= need {
                        break;
                    }
                    if candidate.title.trim().is_empty() {
                        continue;
                    }
                    let key = format!("S{}", picked.len() + 1);
                    picked.push(candidate.into_source(key));
                }
                info!(
                    "event=source_search module=sources status=ok provider={} picked={} duration_ms={}",
                    provider.name(),
                    picked.len() - before,
                    started_at.elapsed().as_millis()
                );
            }
            Err(err) => {
                warn!(
                    "event=source_search module=sources status=error provider={} duration_ms={} error={}",
                    provider.name(),
                    started_at.elapsed().as_millis(),
                    err
                );
            }
        }
    }

    picked
}

/// `"(2021) Title. https://doi.org/..."`; the year part is omitted when unknown.
pub fn apa_citation(source: &Source) -> String {
    let mut citation = match source.year {
        Some(year) => format!("({year}) {}.", source.title),
        None => format!("{}.", source.title),
    };
    if let Some(link) = source.link() {
        citation.push(' ');
        citation.push_str(&link);
    }
    citation
}

/// Reference list line: `"[S1] Title. (2021) https://doi.org/..."`.
pub fn format_reference(source: &Source) -> String {
    let key = if source.key.is_empty() {
        "S?"
    } else {
        source.key.as_str()
    };
    let mut parts = vec![format!("[{key}] {}.", source.title)];
    if let Some(year) = source.year {
        parts.push(format!("({year})"));
    }
    if let Some(link) = source.link() {
        parts.push(link);
    }
    parts.join(" ")
}

/// One prompt line per source: `"- S1: Title | link"`.
pub fn sources_block(sources: &[Source]) -> String {
    sources
        .iter()
        .map(|source| format!("- {}: {} | {}", source.key, source.title, source.display_link()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `(key -> APA citation, key -> abstract)`; sources without a key are skipped.
pub fn reference_maps(
    sources: &[Source],
) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    let mut references = BTreeMap::new();
    let mut abstracts = BTreeMap::new();
    for source in sources.iter().filter(|source| !source.key.is_empty()) {
        references.insert(source.key.clone(), apa_citation(source));
        abstracts.insert(
            source.key.clone(),
            source.abstract_text.clone().unwrap_or_default(),
        );
    }
    (references, abstracts)
}
