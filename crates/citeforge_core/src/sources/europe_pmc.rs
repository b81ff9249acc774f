//! Europe PMC REST search restricted to open-access records.

use super::http::get_json;
use super::{SourceCandidate, SourceError, SourceProvider};
use crate::similarity::normalize_ws;
use serde::Deserialize;

const EUROPE_PMC_SEARCH_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest/search";
const PROVIDER: &str = "europe_pmc";

pub struct EuropePmcProvider {
    endpoint: String,
}

impl Default for EuropePmcProvider {
    fn default() -> Self {
        Self::new(EUROPE_PMC_SEARCH_URL)
    }
}

impl EuropePmcProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "resultList", default)]
    result_list: ResultList,
}

#[derive(Debug, Default, Deserialize)]
struct ResultList {
    #[serde(default)]
    result: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    id: Option<String>,
    source: Option<String>,
    doi: Option<String>,
    title: Option<String>,
    #[serde(rename = "pubYear")]
    pub_year: Option<String>,
    #[serde(rename = "abstractText")]
    abstract_text: Option<String>,
}

impl SourceProvider for EuropePmcProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<SourceCandidate>, SourceError> {
        let query = format!("{query} OPEN_ACCESS:Y");
        let page_size = limit.to_string();
        let response: SearchResponse = get_json(
            PROVIDER,
            &self.endpoint,
            &[
                ("query", query.as_str()),
                ("format", "json"),
                ("resultType", "core"),
                ("pageSize", page_size.as_str()),
            ],
        )?;
        Ok(candidates_from(response))
    }
}

fn candidates_from(response: SearchResponse) -> Vec<SourceCandidate> {
    response
        .result_list
        .result
        .into_iter()
        .map(|record| {
            let url = record.id.as_deref().map(|id| {
                format!(
                    "https://europepmc.org/article/{}/{id}",
                    record.source.as_deref().unwrap_or("MED")
                )
            });
            SourceCandidate {
                title: normalize_ws(record.title.as_deref().unwrap_or_default()),
                url,
                doi: record.doi.filter(|doi| !doi.trim().is_empty()),
                year: record.pub_year.and_then(|year| year.trim().parse().ok()),
                open_access: true,
                abstract_text: record
                    .abstract_text
                    .map(|text| normalize_ws(&text))
                    .filter(|text| !text.is_empty()),
            }
        })
        .collect()
}
