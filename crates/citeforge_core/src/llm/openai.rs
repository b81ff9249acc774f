//! OpenAI-compatible `/chat/completions` client over `ureq`.

use super::{ChatClient, ChatRequest, LlmError};
use log::{error, info};
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use ureq::Agent;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const HTTP_TIMEOUT_SECS: u64 = 120;

static HTTP_AGENT: OnceLock<Agent> = OnceLock::new();

fn agent() -> &'static Agent {
    HTTP_AGENT.get_or_init(|| {
        Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)))
            .build()
            .into()
    })
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiClient {
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiClient {
    /// `api_key` may be absent; requests then fail with [`LlmError::MissingApiKey`].
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: base_url.into(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl ChatClient for OpenAiClient {
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let started_at = Instant::now();

        let response = agent()
            .post(&self.endpoint())
            .header("Authorization", &format!("Bearer {api_key}"))
            .send_json(request)
            .map_err(|err| {
                error!(
                    "event=chat_completion module=llm status=error model={} duration_ms={} error={}",
                    request.model,
                    started_at.elapsed().as_millis(),
                    err
                );
                match err {
                    ureq::Error::StatusCode(code) => LlmError::Status(code),
                    other => LlmError::Request(other.to_string()),
                }
            })?;

        let body: CompletionResponse = response
            .into_body()
            .read_json()
            .map_err(|err| LlmError::Decode(err.to_string()))?;
        let content = first_choice(body)?;

        info!(
            "event=chat_completion module=llm status=ok model={} duration_ms={} chars={}",
            request.model,
            started_at.elapsed().as_millis(),
            content.chars().count()
        );
        Ok(content)
    }
}

fn first_choice(body: CompletionResponse) -> Result<String, LlmError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or(LlmError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::{first_choice, CompletionResponse, OpenAiClient};
    use crate::llm::{ChatClient, ChatRequest, LlmError};

    #[test]
    fn missing_key_fails_before_any_request() {
        let client = OpenAiClient::new(Some("  ".to_string()), "http://127.0.0.1:9");
        assert!(!client.has_api_key());
        let result = client.complete(&ChatRequest::new("m", "s", "u", 0.2));
        assert!(matches!(result, Err(LlmError::MissingApiKey)));
    }

    #[test]
    fn endpoint_joins_base_url() {
        let client = OpenAiClient::new(None, "https://api.example.com/v1/");
        assert_eq!(client.endpoint(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn first_choice_is_trimmed_and_empty_body_is_an_error() {
        let body: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  text [S1]\n"}}]}"#,
        )
        .expect("fixture should decode");
        assert_eq!(first_choice(body).expect("content"), "text [S1]");

        let empty: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).expect("decode");
        assert!(matches!(first_choice(empty), Err(LlmError::EmptyResponse)));
    }
}
