//! Manuscript assembly: draft Markdown plus references to a clean document.
//!
//! The body understands a deliberately small Markdown subset: `#`, `##`
//! and `###` headings, `- ` bullets and blank-line separated paragraphs.

use crate::citation::strip_sources;
use crate::markdown::{outline, MdBlock};
use crate::model::source::Source;
use crate::sources::format_reference;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Title used when a draft path has no usable file stem.
pub const DEFAULT_MANUSCRIPT_TITLE: &str = "Manuscript";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocBlock {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    Bullet { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manuscript {
    pub title: String,
    pub blocks: Vec<DocBlock>,
    /// Formatted reference lines, already ordered.
    pub references: Vec<String>,
}

impl Manuscript {
    /// Parses `body` and formats `sources` as the reference list.
    pub fn from_markdown(title: impl Into<String>, body: &str, sources: &[Source]) -> Self {
        Self {
            title: title.into(),
            blocks: parse_body(body),
            references: sources.iter().map(format_reference).collect(),
        }
    }
}

/// `final_draft.md` -> `Final Draft`.
pub fn title_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().replace('_', " "))
        .unwrap_or_default();
    let title = stem
        .split_whitespace()
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ");
    if title.is_empty() {
        DEFAULT_MANUSCRIPT_TITLE.to_string()
    } else {
        title
    }
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Splits the body into heading, bullet and paragraph blocks.
///
/// Lines are joined with spaces. Code, raw HTML and thematic breaks are dropped.
pub fn parse_body(body: &str) -> Vec<DocBlock> {
    outline(body)
        .into_iter()
        .filter_map(|block| match block {
            MdBlock::Heading { level, text } => Some(DocBlock::Heading { level, text }),
            MdBlock::Paragraph { lines } => Some(DocBlock::Paragraph {
                text: lines.join(" "),
            }),
            MdBlock::ListItem { lines } => Some(DocBlock::Bullet {
                text: lines.join(" "),
            }),
            MdBlock::Opaque => None,
        })
        .filter(|block| !matches!(block, DocBlock::Heading { text, .. } if text.is_empty()))
        .collect()
}

/// Renders the manuscript as Markdown.
///
/// With `strip_citations`, inline `[S#]` and `[S#](url)` tags are removed
/// from body blocks and the key prefix is dropped from each reference.
/// References are appended under `# References`.
pub fn render_markdown(manuscript: &Manuscript, strip_citations: bool) -> String {
    let clean = |text: &str| {
        if strip_citations {
            strip_sources(text)
        } else {
            text.to_string()
        }
    };

    let mut out = format!("# {}\n", manuscript.title);
    let mut previous_bullet = false;
    for block in &manuscript.blocks {
        match block {
            DocBlock::Heading { level, text } => {
                // Body headings sit one level below the manuscript title.
                let hashes = "#".repeat(usize::from(*level).saturating_add(1).min(6));
                out.push_str(&format!("\n{hashes} {}\n", clean(text)));
            }
            DocBlock::Paragraph { text } => out.push_str(&format!("\n{}\n", clean(text))),
            DocBlock::Bullet { text } => {
                if !previous_bullet {
                    out.push('\n');
                }
                out.push_str(&format!("- {}\n", clean(text)));
            }
        }
        previous_bullet = matches!(block, DocBlock::Bullet { .. });
    }

    if !manuscript.references.is_empty() {
        out.push_str("\n# References\n\n");
        for reference in &manuscript.references {
            out.push_str(&clean(reference));
            out.push_str("\n\n");
        }
        out.truncate(out.trim_end().len());
        out.push('\n');
    }
    out
}

/// Structured chapter payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    #[serde(default)]
    pub sections: Vec<ChapterSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSection {
    pub heading: String,
    #[serde(default)]
    pub paragraphs: Vec<String>,
}

/// Renders chapters (`#`), sections (`##`) and a `key: reference` list.
pub fn chapters_to_markdown(chapters: &[Chapter], references: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for chapter in chapters {
        out.push_str(&format!("# {}\n\n", chapter.title));
        for section in &chapter.sections {
            out.push_str(&format!("## {}\n\n", section.heading));
            for paragraph in &section.paragraphs {
                out.push_str(paragraph);
                out.push_str("\n\n");
            }
        }
    }
    out.push_str("# References\n\n");
    for (key, reference) in references {
        out.push_str(&format!("{key}: {reference}\n"));
    }
    out
}
