//! Claim extraction and the claim audit ledger.
//!
//! # Responsibility
//! - Split assembled Markdown into section-scoped paragraphs.
//! - Record one ledger row per (claim, cited key) with the key's citation and
//!   a similarity score against the source abstract.
//!
//! # Invariants
//! - Section paths are `"H1 > H2"`, `"H1"`, `"H2"` or `ROOT`.
//! - Only paragraphs citing at least one `[S#]` become claims.

use crate::citation::source_keys;
use crate::markdown::{outline, MdBlock};
use crate::model::project::now_epoch_ms;
use crate::model::source::Source;
use crate::repo::ledger_repo::LedgerRepository;
use crate::repo::project_repo::RepoError;
use crate::similarity::similarity;
use crate::sources::{load_sources_json, reference_maps, SourceError};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Section path used for paragraphs outside any heading.
pub const ROOT_SECTION: &str = "ROOT";

/// Paragraph that cites at least one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claim {
    pub section: String,
    pub text: String,
    pub keys: Vec<String>,
}

/// Row to append to `claim_ledger`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRow {
    pub project_id: String,
    pub section: String,
    pub claim_text: String,
    pub source_key: String,
    /// APA citation of the key, empty when the key is unknown.
    pub source_citation: String,
    /// `[0, 1]`; `None` when the source has no abstract.
    pub similarity_score: Option<f64>,
    pub created_at: i64,
}

/// Claim worded too close to a cited abstract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityFlag {
    pub section: String,
    pub claim_text: String,
    pub source_key: String,
    pub score: f64,
}

#[derive(Debug)]
pub enum LedgerError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Sources(SourceError),
    Repo(RepoError),
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "ledger file io failed: {err}"),
            Self::Json(err) => write!(f, "similarity report encoding failed: {err}"),
            Self::Sources(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Sources(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<SourceError> for LedgerError {
    fn from(value: SourceError) -> Self {
        Self::Sources(value)
    }
}

impl From<RepoError> for LedgerError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Yields `(section_path, paragraph)` pairs in document order.
///
/// `#` sets the chapter and clears the section, `##` sets the section; deeper
/// headings are kept as `### text` paragraphs. Paragraph lines are joined with
/// `\n` and each list item is its own paragraph. Code blocks are skipped.
pub fn iter_paragraphs(markdown: &str) -> Vec<(String, String)> {
    let mut paragraphs = Vec::new();
    let mut h1: Option<String> = None;
    let mut h2: Option<String> = None;

    for block in outline(markdown) {
        let paragraph = match block {
            MdBlock::Heading { level: 1, text } => {
                h1 = Some(text);
                h2 = None;
                continue;
            }
            MdBlock::Heading { level: 2, text } => {
                h2 = Some(text);
                continue;
            }
            MdBlock::Heading { level, text } => {
                format!("{} {text}", "#".repeat(usize::from(level)))
            }
            MdBlock::Paragraph { .. } | MdBlock::ListItem { .. } => block.joined("\n"),
            MdBlock::Opaque => continue,
        };
        if paragraph.trim().is_empty() {
            continue;
        }
        paragraphs.push((section_path(h1.as_deref(), h2.as_deref()), paragraph));
    }

    paragraphs
}

fn section_path(h1: Option<&str>, h2: Option<&str>) -> String {
    let path = [h1, h2]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" > ");
    if path.is_empty() {
        ROOT_SECTION.to_string()
    } else {
        path
    }
}

/// Paragraphs with at least one `[S#]`, keys unique in order.
pub fn extract_claims(markdown: &str) -> Vec<Claim> {
    iter_paragraphs(markdown)
        .into_iter()
        .filter_map(|(section, text)| {
            let keys = source_keys(&text);
            if keys.is_empty() {
                None
            } else {
                Some(Claim {
                    section,
                    text,
                    keys,
                })
            }
        })
        .collect()
}

/// One row per (claim, key) for `project_id`, all stamped with `created_at`.
pub fn build_ledger_rows(
    project_id: &str,
    markdown: &str,
    sources: &[Source],
    created_at: i64,
) -> Vec<LedgerRow> {
    let (references, abstracts) = reference_maps(sources);
    let mut rows = Vec::new();
    for claim in extract_claims(markdown) {
        for key in &claim.keys {
            rows.push(LedgerRow {
                project_id: project_id.to_string(),
                section: claim.section.clone(),
                claim_text: claim.text.clone(),
                source_key: key.clone(),
                source_citation: references.get(key).cloned().unwrap_or_default(),
                similarity_score: similarity(&claim.text, abstracts.get(key).map(String::as_str)),
                created_at,
            });
        }
    }
    rows
}

/// Reads a draft and its `sources.json`, then appends ledger rows.
///
/// Returns the rows written.
pub fn log_claims_from_markdown<R: LedgerRepository + ?Sized>(
    repo: &R,
    project_id: &str,
    draft_path: impl AsRef<Path>,
    sources_path: impl AsRef<Path>,
) -> Result<Vec<LedgerRow>, LedgerError> {
    let markdown = std::fs::read_to_string(draft_path.as_ref())?;
    let sources = load_sources_json(sources_path.as_ref())?;
    let rows = build_ledger_rows(project_id, &markdown, &sources, now_epoch_ms());
    let inserted = repo.insert_rows(&rows)?;
    info!(
        "event=ledger_log module=ledger status=ok project_id={project_id} rows={inserted}"
    );
    Ok(rows)
}

/// Claims whose similarity to a cited abstract exceeds `max_ratio`.
///
/// One flag per claim, carrying its highest-scoring key, in document order.
pub fn flag_similar_claims(rows: &[LedgerRow], max_ratio: f64) -> Vec<SimilarityFlag> {
    let mut flags: Vec<SimilarityFlag> = Vec::new();
    for row in rows {
        let Some(score) = row.similarity_score.filter(|score| *score > max_ratio) else {
            continue;
        };
        let existing = flags
            .iter()
            .position(|flag| flag.section == row.section && flag.claim_text == row.claim_text);
        match existing {
            Some(index) => {
                let flag = &mut flags[index];
                if score > flag.score {
                    flag.source_key = row.source_key.clone();
                    flag.score = score;
                }
            }
            None => flags.push(SimilarityFlag {
                section: row.section.clone(),
                claim_text: row.claim_text.clone(),
                source_key: row.source_key.clone(),
                score,
            }),
        }
    }
    flags
}

/// Writes `flags` as pretty JSON, `[]` when nothing was flagged.
pub fn write_similarity_report(
    path: impl AsRef<Path>,
    flags: &[SimilarityFlag],
) -> Result<(), LedgerError> {
    std::fs::write(path.as_ref(), serde_json::to_string_pretty(flags)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{build_ledger_rows, extract_claims, flag_similar_claims, iter_paragraphs, LedgerRow};
    use crate::model::source::Source;

    const DRAFT: &str = "Intro line [S1].\n\n# Chapter\n\nPlain paragraph.\n\n## Part\nFirst line [S2]\nsecond line [S1] [S2].\n\n### Deep\n\n# Next\n\nTail [S3].\n";

    #[test]
    fn paragraphs_carry_section_paths() {
        let paragraphs = iter_paragraphs(DRAFT);
        let sections: Vec<&str> = paragraphs.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(
            sections,
            vec!["ROOT", "Chapter", "Chapter > Part", "Chapter > Part", "Next"]
        );
        assert_eq!(paragraphs[2].1, "First line [S2]\nsecond line [S1] [S2].");
        assert_eq!(paragraphs[3].1, "### Deep");
    }

    #[test]
    fn claims_need_citations() {
        let claims = extract_claims(DRAFT);
        assert_eq!(claims.len(), 3);
        assert_eq!(claims[1].keys, vec!["S2".to_string(), "S1".to_string()]);
        assert_eq!(claims[2].section, "Next");
    }

    #[test]
    fn rows_fan_out_per_key_with_citation_and_similarity() {
        let sources = vec![Source {
            key: "S1".to_string(),
            title: "Intro".to_string(),
            url: Some("https://e.org/1".to_string()),
            doi: None,
            year: Some(2020),
            open_access: true,
            abstract_text: Some("Intro line".to_string()),
        }];

        let rows = build_ledger_rows("project::x", DRAFT, &sources, 42);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].source_citation, "(2020) Intro. https://e.org/1");
        let score = rows[0].similarity_score.expect("abstract present");
        assert!(score > 0.5 && score <= 1.0);
        assert_eq!(rows[1].source_key, "S2");
        assert_eq!(rows[1].source_citation, "");
        assert_eq!(rows[1].similarity_score, None);
        assert!(rows.iter().all(|row| row.created_at == 42 && row.project_id == "project::x"));
    }

    #[test]
    fn list_items_are_claims_and_code_is_skipped() {
        let paragraphs =
            iter_paragraphs("# C\n\n- First [S1]\n- Second [S2]\n\n```\n# not a heading [S3]\n```\n");
        assert_eq!(
            paragraphs,
            vec![
                ("C".to_string(), "First [S1]".to_string()),
                ("C".to_string(), "Second [S2]".to_string()),
            ]
        );
    }

    fn row(claim: &str, key: &str, score: Option<f64>) -> LedgerRow {
        LedgerRow {
            project_id: "project::x".to_string(),
            section: "Sleep".to_string(),
            claim_text: claim.to_string(),
            source_key: key.to_string(),
            source_citation: String::new(),
            similarity_score: score,
            created_at: 1,
        }
    }

    #[test]
    fn flags_keep_the_closest_key_per_claim() {
        let rows = vec![
            row("Copied claim.", "S1", Some(0.4)),
            row("Copied claim.", "S2", Some(0.9)),
            row("Own words.", "S1", Some(0.1)),
            row("No abstract.", "S3", None),
            row("Borderline.", "S4", Some(0.22)),
        ];
        let flags = flag_similar_claims(&rows, 0.22);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].claim_text, "Copied claim.");
        assert_eq!(flags[0].source_key, "S2");
        assert_eq!(flags[0].score, 0.9);
    }
}
