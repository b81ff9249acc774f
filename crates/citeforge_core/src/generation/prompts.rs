//! Prompt templates for single-pass and three-step generation.

use super::GenerationInput;
use crate::model::source::Source;
use crate::sources::sources_block;

pub(super) const AUTHOR_SYSTEM: &str =
    "You are a meticulous neuroscience author who cites sources and never fabricates.";

pub(super) const RESEARCHER_SYSTEM: &str = "Role: Neuroscience Researcher. \
Goal: Select the most relevant open-access sources for the provided chunk. \
You prioritize systematic reviews and high-quality studies. You never invent citations.";

pub(super) fn adapter_system(industry_upper: &str) -> String {
    format!(
        "Role: Industry Adapter. \
         Goal: Adapt the chunk for the {industry_upper} domain using only the selected sources. \
         You keep the science intact but tailor metaphors and terminology to the target industry."
    )
}

pub(super) const EDITOR_SYSTEM: &str = "Role: Scientific Editor. \
Goal: Ensure tone, correctness, and citations [S#] are preserved; polish the prose. \
You are strict about factual accuracy and consistent citation formatting.";

pub(super) fn single_prompt(input: &GenerationInput<'_>) -> String {
    let industry_upper = input.industry.as_str().to_uppercase();
    format!(
        "You are a neuroscience author. Follow these rules strictly:\n\
         - Ground every scientific statement in the provided sources; do not fabricate or overclaim.\n\
         - Use inline citations like [S1], [S2] that match the Source Keys.\n\
         - Preserve scientific mechanisms/claims exactly; adapt only framing, examples, and metaphors.\n\
         - Brand voice (guidance): {brand_voice}\n\
         \n\
         Industry Focus: {industry_upper}\n\
         Directions (project brief):\n\
         {directions}\n\
         \n\
         CHECKLIST (must satisfy before returning):\n\
         1) The tone and examples MUST reflect the **{industry_upper}** domain.\n\
         2) Include at least {min_hits} terms from this domain lexicon: {lexicon}\n\
         3) Keep all inline citations [S#] intact and aligned to claims.\n\
         4) If sources are insufficient for a claim, explicitly say so and stop.\n\
         \n\
         Source chunk to repurpose:\n\
         \"\"\"{chunk}\"\"\"\n\
         \n\
         Open-access neuroscience sources you can cite (keys for [S#]):\n\
         {sources}\n\
         \n\
         Write 1-2 crisp paragraphs adapted for **{industry_upper}** with [S#] citations.\n",
        brand_voice = input.brand_voice,
        directions = input.directions,
        min_hits = input.industry.min_hits(),
        lexicon = input.industry.lexicon_list(),
        chunk = input.chunk_text,
        sources = sources_block(input.sources),
    )
}

pub(super) fn researcher_prompt(input: &GenerationInput<'_>) -> String {
    format!(
        "You are given candidate sources (with keys) and a source text chunk.\n\
         Select 2-3 KEYS that are most relevant and can support the scientific claims.\n\
         Use only the provided list; do not invent sources.\n\
         \n\
         Candidate sources:\n\
         {sources}\n\
         \n\
         Chunk:\n\
         \"\"\"{chunk}\"\"\"\n\
         \n\
         Return ONLY a comma-separated list of keys, like:\n\
         S1,S3",
        sources = sources_block(input.sources),
        chunk = input.chunk_text,
    )
}

/// `"- S1: Title"` lines for the selected keys, in source order.
pub(super) fn selected_block(sources: &[Source], selected: &[String]) -> String {
    sources
        .iter()
        .filter(|source| selected.contains(&source.key))
        .map(|source| format!("- {}: {}", source.key, source.title))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(super) fn adapter_prompt(
    input: &GenerationInput<'_>,
    keys: &str,
    selected_block: &str,
) -> String {
    format!(
        "Brand voice: {brand_voice}\n\
         Directions: {directions}\n\
         Industry Focus: {industry_upper}\n\
         \n\
         Use ONLY these selected keys for citations: {keys}\n\
         Selected references:\n\
         {selected_block}\n\
         \n\
         Write 1-2 crisp paragraphs adapted to the industry.\n\
         Keep scientific mechanisms intact and cite claims inline with [S#] using ONLY the keys above.\n\
         Use clear, clinical phrasing; avoid flowery language or purple prose.\n\
         Only use metaphors if they clarify care delivery or clinical workflow.\n\
         Keep it concise: 1-2 short paragraphs, no bulleted lists unless asked.\n\
         Cite at least once per paragraph using ONLY the selected keys.\n\
         \n\
         Source chunk:\n\
         \"\"\"{chunk}\"\"\"",
        brand_voice = input.brand_voice,
        directions = input.directions,
        industry_upper = input.industry.as_str().to_uppercase(),
        chunk = input.chunk_text,
    )
}

pub(super) fn editor_prompt(
    industry_upper: &str,
    keys: &str,
    selected_block: &str,
    adapted: &str,
) -> String {
    format!(
        "Review and lightly edit the adapted text below. Enforce:\n\
         1) Tone/examples match **{industry_upper}**.\n\
         2) All scientific claims are supported by [S#] citations using ONLY the selected keys.\n\
         3) Keep [S#] intact. Do NOT add or delete citations except to remove unapproved keys.\n\
         4) Delete any [S#] citation not in the selected keys.\n\
         5) Ensure each paragraph contains at least one [S#] citation using ONLY the selected keys.\n\
         6) Do NOT ask for more information and do NOT apologize.\n\
         7) Trim flowery language; enforce a credible, conversational, science-first tone.\n\
         8) Return ONLY the final revised text.\n\
         \n\
         Selected keys: {keys}\n\
         Selected references:\n\
         {selected_block}\n\
         \n\
         Adapted text:\n\
         \"\"\"{adapted}\"\"\""
    )
}
