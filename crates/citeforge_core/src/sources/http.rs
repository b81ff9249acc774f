//! Shared blocking HTTP agent for literature providers.

use super::SourceError;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;
use std::time::Duration;
use ureq::Agent;

const HTTP_TIMEOUT_SECS: u64 = 20;

static HTTP_AGENT: OnceLock<Agent> = OnceLock::new();

fn agent() -> &'static Agent {
    HTTP_AGENT.get_or_init(|| {
        Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)))
            .build()
            .into()
    })
}

/// GETs `url` with `query` pairs and decodes the JSON body.
pub(super) fn get_json<T: DeserializeOwned>(
    provider: &'static str,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, SourceError> {
    let mut request = agent().get(url);
    for (name, value) in query {
        request = request.query(*name, *value);
    }

    let response = request.call().map_err(|err| SourceError::Request {
        provider,
        message: err.to_string(),
    })?;
    response
        .into_body()
        .read_json::<T>()
        .map_err(|err| SourceError::Decode {
            provider,
            message: err.to_string(),
        })
}
