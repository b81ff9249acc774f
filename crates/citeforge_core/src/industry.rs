//! Target-industry detection and domain-language enforcement.

use crate::llm::{ChatClient, ChatRequest, LlmError};
use log::info;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Healthcare vocabulary a healthcare-targeted passage should draw on.
pub const HEALTHCARE_TERMS: [&str; 26] = [
    "patient",
    "clinician",
    "provider",
    "care team",
    "care pathway",
    "clinical workflow",
    "EHR",
    "EMR",
    "HIPAA",
    "ICU",
    "triage",
    "ambulatory",
    "inpatient",
    "diagnostic",
    "therapeutic",
    "clinical decision-making",
    "protocol",
    "rounds",
    "charting",
    "order set",
    "QALY",
    "outcome measure",
    "readmission",
    "medication adherence",
    "comorbidity",
    "care coordination",
];

const STYLE_TEMPERATURE: f32 = 0.2;
const STYLE_SYSTEM_PROMPT: &str = "You are a precise editor. Preserve meaning and citations exactly while localizing tone/terminology.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    Healthcare,
    General,
}

impl Industry {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthcare => "healthcare",
            Self::General => "general",
        }
    }

    pub fn lexicon(self) -> &'static [&'static str] {
        match self {
            Self::Healthcare => &HEALTHCARE_TERMS,
            Self::General => &[],
        }
    }

    /// Lexicon terms a passage must contain before it is left untouched.
    pub fn min_hits(self) -> usize {
        match self {
            Self::Healthcare => 2,
            Self::General => 0,
        }
    }

    /// Comma-separated lexicon, or `(none)`.
    pub fn lexicon_list(self) -> String {
        let lexicon = self.lexicon();
        if lexicon.is_empty() {
            "(none)".to_string()
        } else {
            lexicon.join(", ")
        }
    }
}

impl Display for Industry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Healthcare when the project brief mentions it, otherwise general.
pub fn detect_industry(directions: &str) -> Industry {
    let lowered = directions.to_lowercase();
    let healthcare = ["healthcare", "health care", "clinical", "hospital"]
        .iter()
        .any(|needle| lowered.contains(needle));
    if healthcare {
        Industry::Healthcare
    } else {
        Industry::General
    }
}

/// Number of distinct lexicon terms present in `text`, case-insensitive.
pub fn count_lexicon_hits(text: &str, lexicon: &[&str]) -> usize {
    let lowered = text.to_lowercase();
    lexicon
        .iter()
        .filter(|term| lowered.contains(&term.to_lowercase()))
        .count()
}

fn rewrite_prompt(industry: Industry, text: &str) -> String {
    format!(
        "Revise the text to better fit the **{upper}** domain, while preserving meaning and ALL [S#] citations.\n\
         Use at least {min_hits} terms from this lexicon: {lexicon}\n\
         Do not add new scientific claims. Do not remove or renumber citations.\n\
         \n\
         Original:\n\
         \"\"\"{text}\"\"\"\n\
         \n\
         Return only the revised text.\n",
        upper = industry.as_str().to_uppercase(),
        min_hits = industry.min_hits(),
        lexicon = industry.lexicon_list(),
    )
}

/// Asks the model to localize `text` when it lacks domain vocabulary.
///
/// Only healthcare is enforced. The revision is discarded when it lost every
/// citation marker.
pub fn enforce_industry_style<C: ChatClient + ?Sized>(
    client: &C,
    model: &str,
    text: &str,
    industry: Industry,
) -> Result<String, LlmError> {
    if industry != Industry::Healthcare {
        return Ok(text.to_string());
    }
    let hits = count_lexicon_hits(text, industry.lexicon());
    if hits >= industry.min_hits() {
        return Ok(text.to_string());
    }

    let request = ChatRequest::new(
        model,
        STYLE_SYSTEM_PROMPT,
        rewrite_prompt(industry, text),
        STYLE_TEMPERATURE,
    );
    let revised = client.complete(&request)?;
    if !revised.contains("[S") && !revised.contains("[s") {
        info!("event=style_enforce module=industry status=skipped reason=citations_lost hits={hits}");
        return Ok(text.to_string());
    }
    info!("event=style_enforce module=industry status=ok hits={hits}");
    Ok(revised)
}

#[cfg(test)]
mod tests {
    use super::{count_lexicon_hits, detect_industry, enforce_industry_style, Industry, HEALTHCARE_TERMS};
    use crate::llm::{ChatClient, ChatRequest, LlmError};
    use std::cell::RefCell;

    struct Scripted {
        reply: &'static str,
        calls: RefCell<Vec<ChatRequest>>,
    }

    impl ChatClient for Scripted {
        fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
            self.calls.borrow_mut().push(request.clone());
            Ok(self.reply.to_string())
        }
    }

    fn scripted(reply: &'static str) -> Scripted {
        Scripted {
            reply,
            calls: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn detects_healthcare_keywords_case_insensitively() {
        assert_eq!(detect_industry("For HOSPITAL leaders"), Industry::Healthcare);
        assert_eq!(detect_industry("clinical teams"), Industry::Healthcare);
        assert_eq!(detect_industry("Health Care CFOs"), Industry::Healthcare);
        assert_eq!(detect_industry("fintech founders"), Industry::General);
        assert_eq!(detect_industry(""), Industry::General);
    }

    #[test]
    fn lexicon_has_expected_shape() {
        assert_eq!(HEALTHCARE_TERMS.len(), 26);
        assert_eq!(Industry::Healthcare.min_hits(), 2);
        assert_eq!(Industry::General.lexicon_list(), "(none)");
    }

    #[test]
    fn counts_each_term_once() {
        let text = "The patient met the care team; another patient joined ICU rounds.";
        assert_eq!(count_lexicon_hits(text, &HEALTHCARE_TERMS), 4);
    }

    #[test]
    fn general_and_already_compliant_text_skip_the_model() {
        let client = scripted("unused [S1]");
        let general = enforce_industry_style(&client, "m", "plain [S1]", Industry::General)
            .expect("general passes through");
        assert_eq!(general, "plain [S1]");

        let compliant = "Each patient and clinician benefits [S1].";
        let kept = enforce_industry_style(&client, "m", compliant, Industry::Healthcare)
            .expect("compliant passes through");
        assert_eq!(kept, compliant);
        assert!(client.calls.borrow().is_empty());
    }

    #[test]
    fn revision_without_citations_is_discarded() {
        let client = scripted("A patient-centred rewrite with no markers.");
        let kept = enforce_industry_style(&client, "m", "Sleep matters [S1].", Industry::Healthcare)
            .expect("style call should succeed");
        assert_eq!(kept, "Sleep matters [S1].");
        let calls = client.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].temperature, 0.2);
        assert!(calls[0].messages[1].content.contains("HEALTHCARE"));
    }

    #[test]
    fn revision_with_citations_is_used() {
        let client = scripted("Sleep matters for every patient on the care team [S1].");
        let revised = enforce_industry_style(&client, "m", "Sleep matters [S1].", Industry::Healthcare)
            .expect("style call should succeed");
        assert!(revised.contains("care team"));
    }
}
