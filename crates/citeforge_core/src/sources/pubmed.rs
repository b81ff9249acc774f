//! PubMed E-utilities search (`esearch` then `esummary`).
//!
//! Records are not guaranteed to be open access and carry no abstract.

use super::http::get_json;
use super::{SourceCandidate, SourceError, SourceProvider};
use crate::similarity::normalize_ws;
use serde::Deserialize;
use std::collections::HashMap;

const PUBMED_SEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const PUBMED_SUMMARY_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi";
const PROVIDER: &str = "pubmed";

pub struct PubMedProvider {
    search_url: String,
    summary_url: String,
}

impl Default for PubMedProvider {
    fn default() -> Self {
        Self::new(PUBMED_SEARCH_URL, PUBMED_SUMMARY_URL)
    }
}

impl PubMedProvider {
    pub fn new(search_url: impl Into<String>, summary_url: impl Into<String>) -> Self {
        Self {
            search_url: search_url.into(),
            summary_url: summary_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    esearchresult: SearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    result: HashMap<String, serde_json::Value>,
}

impl SourceProvider for PubMedProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SourceCandidate>, SourceError> {
        let term = format!("{query} review");
        let retmax = limit.to_string();
        let search: SearchResponse = get_json(
            PROVIDER,
            &self.search_url,
            &[
                ("db", "pubmed"),
                ("term", term.as_str()),
                ("retmode", "json"),
                ("retmax", retmax.as_str()),
            ],
        )?;
        let pmids = search.esearchresult.idlist;
        if pmids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = pmids.join(",");
        let summary: SummaryResponse = get_json(
            PROVIDER,
            &self.summary_url,
            &[("db", "pubmed"), ("id", ids.as_str()), ("retmode", "json")],
        )?;
        Ok(candidates_from(&pmids, &summary))
    }
}

/// Keeps esearch order; summaries without a title are dropped.
fn candidates_from(pmids: &[String], summary: &SummaryResponse) -> Vec<SourceCandidate> {
    pmids
        .iter()
        .filter_map(|pmid| {
            let record = summary.result.get(pmid)?;
            let title = normalize_ws(record.get("title")?.as_str()?);
            if title.is_empty() {
                return None;
            }
            let uid = record
                .get("uid")
                .and_then(|uid| uid.as_str())
                .unwrap_or(pmid.as_str());
            Some(SourceCandidate {
                title,
                url: Some(format!("https://pubmed.ncbi.nlm.nih.gov/{uid}/")),
                doi: None,
                year: None,
                open_access: false,
                abstract_text: None,
            })
        })
        .collect()
}
