//! Chat-completion client abstraction.
//!
//! # Responsibility
//! - Describe one chat request (model, messages, temperature).
//! - Hide the HTTP provider behind [`ChatClient`] so generation can be
//!   exercised with scripted clients.

mod openai;

pub use openai::{OpenAiClient, DEFAULT_OPENAI_BASE_URL};

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

impl ChatRequest {
    /// System + user pair, the shape every generation step uses.
    pub fn new(
        model: impl Into<String>,
        system: impl Into<String>,
        user: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature,
        }
    }
}

#[derive(Debug)]
pub enum LlmError {
    MissingApiKey,
    /// Transport failure before a response arrived.
    Request(String),
    /// Non-success HTTP status.
    Status(u16),
    /// Response had no usable first choice.
    EmptyResponse,
    Decode(String),
}

impl Display for LlmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "OPENAI_API_KEY is not set"),
            Self::Request(message) => write!(f, "chat request failed: {message}"),
            Self::Status(code) => write!(f, "chat request returned HTTP {code}"),
            Self::EmptyResponse => write!(f, "chat response contained no choices"),
            Self::Decode(message) => write!(f, "chat response could not be decoded: {message}"),
        }
    }
}

impl Error for LlmError {}

/// Blocking chat-completion backend.
pub trait ChatClient {
    /// Returns the first choice's content, trimmed.
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

impl<T: ChatClient + ?Sized> ChatClient for &T {
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        (**self).complete(request)
    }
}

impl<T: ChatClient + ?Sized> ChatClient for Box<T> {
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        (**self).complete(request)
    }
}
