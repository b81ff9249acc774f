//! Researcher, adapter and editor steps run in sequence.

use super::{prompts, GenerationInput};
use crate::citation::{
    ensure_citation_per_paragraph, has_citation, parse_selected_keys, replace_placeholders,
    sanitize_citations,
};
use crate::llm::{ChatClient, ChatRequest, LlmError};
use log::{info, warn};

const WORKFLOW_TEMPERATURE: f32 = 0.3;
const FALLBACK_KEY_COUNT: usize = 2;

/// Three-step generation restricted to researcher-selected keys.
///
/// Adapter failures are tolerated (the editor then sees empty text); the
/// adapter output is returned when the editor answers with nothing.
pub fn generate_with_workflow<C: ChatClient + ?Sized>(
    client: &C,
    model: &str,
    input: &GenerationInput<'_>,
) -> Result<String, LlmError> {
    let industry_upper = input.industry.as_str().to_uppercase();

    let research = client.complete(&ChatRequest::new(
        model,
        prompts::RESEARCHER_SYSTEM,
        prompts::researcher_prompt(input),
        WORKFLOW_TEMPERATURE,
    ))?;
    let candidate_keys: Vec<String> = input
        .sources
        .iter()
        .filter(|source| !source.key.is_empty())
        .map(|source| source.key.clone())
        .collect();
    let mut selected: Vec<String> = parse_selected_keys(&research)
        .into_iter()
        .filter(|key| candidate_keys.contains(key))
        .collect();
    if selected.is_empty() {
        selected = candidate_keys.into_iter().take(FALLBACK_KEY_COUNT).collect();
    }
    let keys = selected.join(",");
    let selected_block = prompts::selected_block(input.sources, &selected);
    info!("event=workflow_research module=generation status=ok selected={keys}");

    let adapted = match client.complete(&ChatRequest::new(
        model,
        prompts::adapter_system(&industry_upper),
        prompts::adapter_prompt(input, &keys, &selected_block),
        WORKFLOW_TEMPERATURE,
    )) {
        Ok(text) => text.trim().to_string(),
        Err(err) => {
            warn!("event=workflow_adapt module=generation status=error error={err}");
            String::new()
        }
    };

    let edited = client
        .complete(&ChatRequest::new(
            model,
            prompts::EDITOR_SYSTEM,
            prompts::editor_prompt(&industry_upper, &keys, &selected_block, &adapted),
            WORKFLOW_TEMPERATURE,
        ))?
        .trim()
        .to_string();

    let mut final_text = repair_citations(&edited, &selected);
    let adapted = repair_citations(&adapted, &selected);
    if let Some(first) = selected.first() {
        if !final_text.trim().is_empty() && !has_citation(&final_text) {
            final_text = format!("{} [{first}]", final_text.trim_end());
        }
    }

    if final_text.trim().is_empty() {
        Ok(adapted)
    } else {
        Ok(final_text)
    }
}

fn repair_citations(text: &str, selected: &[String]) -> String {
    let mut text = sanitize_citations(text, selected);
    if let Some(first) = selected.first() {
        text = replace_placeholders(&text, first);
    }
    ensure_citation_per_paragraph(&text, selected)
}

#[cfg(test)]
mod tests {
    use super::generate_with_workflow;
    use crate::generation::GenerationInput;
    use crate::industry::Industry;
    use crate::llm::{ChatClient, ChatRequest, LlmError};
    use crate::model::source::Source;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct Scripted {
        replies: RefCell<VecDeque<Result<&'static str, ()>>>,
        prompts: RefCell<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<&'static str, ()>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl ChatClient for Scripted {
        fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
            self.prompts
                .borrow_mut()
                .push(request.messages[1].content.clone());
            match self.replies.borrow_mut().pop_front() {
                Some(Ok(reply)) => Ok(reply.to_string()),
                Some(Err(())) => Err(LlmError::Status(500)),
                None => Err(LlmError::EmptyResponse),
            }
        }
    }

    fn sources() -> Vec<Source> {
        ["S1", "S2", "S3"]
            .iter()
            .map(|key| Source {
                key: key.to_string(),
                title: format!("Title {key}"),
                url: None,
                doi: None,
                year: None,
                open_access: true,
                abstract_text: None,
            })
            .collect()
    }

    fn input(sources: &[Source]) -> GenerationInput<'_> {
        GenerationInput {
            brand_voice: "Plain.",
            directions: "",
            industry: Industry::General,
            chunk_text: "Chunk text.",
            sources,
        }
    }

    #[test]
    fn editor_output_is_sanitized_and_repaired() {
        let client = Scripted::new(vec![
            Ok("S3, S1"),
            Ok("Draft [S3]."),
            Ok("First claim [S9] [S#].\n\nSecond claim without cite."),
        ]);
        let sources = sources();

        let text = generate_with_workflow(&client, "m", &input(&sources)).expect("workflow");
        assert_eq!(text, "First claim  [S3].\n\nSecond claim without cite. [S3]");

        let prompts = client.prompts.borrow();
        assert!(prompts[1].contains("Use ONLY these selected keys for citations: S3,S1"));
        assert!(prompts[2].contains("- S1: Title S1\n- S3: Title S3"));
        assert!(prompts[2].contains("Draft [S3]."));
    }

    #[test]
    fn unparseable_research_falls_back_to_first_two_keys() {
        let client = Scripted::new(vec![Ok("none fit"), Ok("Draft."), Ok("Final [S3].")]);
        let sources = sources();

        let text = generate_with_workflow(&client, "m", &input(&sources)).expect("workflow");
        // S3 is not selected, so its tag is dropped and S1 is appended.
        assert_eq!(text, "Final . [S1]");
        assert!(client.prompts.borrow()[1].contains("citations: S1,S2"));
    }

    #[test]
    fn adapter_failure_is_tolerated_and_empty_editor_falls_back() {
        let client = Scripted::new(vec![Ok("S2"), Err(()), Ok("  ")]);
        let sources = sources();

        let text = generate_with_workflow(&client, "m", &input(&sources)).expect("workflow");
        assert_eq!(text, "");
        assert!(client.prompts.borrow()[2].contains("Adapted text:\n\"\"\"\"\"\""));
    }

    #[test]
    fn empty_editor_output_returns_adapter_text() {
        let client = Scripted::new(vec![Ok("S2"), Ok("Adapted claim."), Ok("")]);
        let sources = sources();

        let text = generate_with_workflow(&client, "m", &input(&sources)).expect("workflow");
        assert_eq!(text, "Adapted claim. [S2]");
    }

    #[test]
    fn researcher_failure_propagates() {
        let client = Scripted::new(vec![Err(())]);
        let sources = sources();
        assert!(generate_with_workflow(&client, "m", &input(&sources)).is_err());
    }
}
