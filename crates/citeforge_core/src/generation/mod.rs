//! Citation-grounded passage generation.
//!
//! # Responsibility
//! - Turn one source chunk plus candidate sources into an adapted passage
//!   with inline `[S#]` citations.
//! - Offer a single-prompt mode and a researcher/adapter/editor workflow.
//!
//! # Invariants
//! - Workflow output only cites keys the researcher step selected.
//! - Healthcare passages go through [`enforce_industry_style`] in both modes.

mod prompts;
mod workflow;

pub use workflow::generate_with_workflow;

use crate::industry::{enforce_industry_style, Industry};
use crate::llm::{ChatClient, ChatRequest, LlmError};
use crate::model::source::Source;
use log::info;
use std::time::Instant;

/// Brand voice used when neither the project nor a prompt file provides one.
pub const DEFAULT_BRAND_VOICE: &str =
    "Write in a concise, science-grounded, practical voice. No hype.";

const SINGLE_TEMPERATURE: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    Single,
    Workflow,
}

impl GenerationMode {
    pub fn from_flag(use_workflow: bool) -> Self {
        if use_workflow {
            Self::Workflow
        } else {
            Self::Single
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Workflow => "workflow",
        }
    }
}

/// Everything one generation call reads.
#[derive(Debug, Clone, Copy)]
pub struct GenerationInput<'a> {
    pub brand_voice: &'a str,
    pub directions: &'a str,
    pub industry: Industry,
    pub chunk_text: &'a str,
    pub sources: &'a [Source],
}

/// One prompt at temperature 0.35, then industry style enforcement.
pub fn generate_single<C: ChatClient + ?Sized>(
    client: &C,
    model: &str,
    input: &GenerationInput<'_>,
) -> Result<String, LlmError> {
    let request = ChatRequest::new(
        model,
        prompts::AUTHOR_SYSTEM,
        prompts::single_prompt(input),
        SINGLE_TEMPERATURE,
    );
    let text = client.complete(&request)?;
    enforce_industry_style(client, model, &text, input.industry)
}

/// Runs `mode` and applies industry style enforcement to the result.
pub fn generate<C: ChatClient + ?Sized>(
    client: &C,
    model: &str,
    mode: GenerationMode,
    input: &GenerationInput<'_>,
) -> Result<String, LlmError> {
    let started_at = Instant::now();
    let text = match mode {
        GenerationMode::Single => generate_single(client, model, input)?,
        GenerationMode::Workflow => {
            let text = generate_with_workflow(client, model, input)?;
            enforce_industry_style(client, model, &text, input.industry)?
        }
    };
    info!(
        "event=generate module=generation status=ok mode={} industry={} sources={} duration_ms={}",
        mode.as_str(),
        input.industry,
        input.sources.len(),
        started_at.elapsed().as_millis()
    );
    Ok(text)
}
