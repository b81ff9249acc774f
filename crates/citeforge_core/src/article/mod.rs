//! Article artifact model: sections, annotations and cited source lists.
//!
//! # Responsibility
//! - Describe a finished Markdown article as typed blocks.
//! - Parse, resolve and validate inline `[S#]` source keys against the
//!   per-section `Sources:` bibliographies.
//!
//! # Invariants
//! - Parsing never fails; unrecognised text degrades to paragraphs.
//! - Citation keys are upper-cased `S<digits>` and deduplicated per block.
//! - Source keys resolve to the section's own list first, then the nearest
//!   preceding list, then the nearest following list.

mod parser;
mod resolve;
mod validate;

pub use parser::{extract_citations, parse_article};
pub use resolve::{resolve_citations, Resolution, ResolvedCitation, UnresolvedCitation};
pub use validate::{validate_article, ArticleIssue, ArticlePolicy};

use serde::Serialize;

/// Parsed article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Article {
    /// Text of the first level-1 heading.
    pub title: Option<String>,
    pub sections: Vec<Section>,
}

/// Heading-delimited part of an article with its own bibliography.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Section {
    /// `None` for content before the first heading.
    pub heading: Option<String>,
    /// Markdown heading level, `0` for the implicit leading section.
    pub level: u8,
    pub blocks: Vec<Block>,
    pub sources: Vec<SourceEntry>,
}

/// One blank-line delimited unit of section content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Paragraph {
        text: String,
        citations: Vec<Citation>,
    },
    Callout {
        text: String,
        citations: Vec<Citation>,
    },
    ImageIdea {
        text: String,
    },
    ListItem {
        text: String,
        citations: Vec<Citation>,
    },
}

/// A bracketed citation marker such as `[S1]` or `[S2, S3]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub keys: Vec<String>,
    /// Byte range of the marker within the block text.
    pub start: usize,
    pub end: usize,
}

/// One entry of a `Sources:` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceEntry {
    pub key: String,
    pub reference: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Callout,
    ImageIdea,
}

/// Callout or image idea, located by section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub section_index: usize,
    pub text: String,
}

impl Block {
    pub fn text(&self) -> &str {
        match self {
            Self::Paragraph { text, .. }
            | Self::Callout { text, .. }
            | Self::ImageIdea { text }
            | Self::ListItem { text, .. } => text,
        }
    }

    pub fn citations(&self) -> &[Citation] {
        match self {
            Self::Paragraph { citations, .. }
            | Self::Callout { citations, .. }
            | Self::ListItem { citations, .. } => citations,
            Self::ImageIdea { .. } => &[],
        }
    }

    /// Unique keys cited by this block, in order of first appearance.
    pub fn cited_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for key in self.citations().iter().flat_map(|citation| &citation.keys) {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }
}

impl Section {
    pub fn source(&self, key: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|entry| entry.key == key)
    }

    /// Unique keys cited anywhere in the section body.
    pub fn cited_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for key in self.blocks.iter().flat_map(Block::cited_keys) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

impl Article {
    /// Callouts and image ideas in document order.
    pub fn annotations(&self) -> Vec<Annotation> {
        let mut annotations = Vec::new();
        for (section_index, section) in self.sections.iter().enumerate() {
            for block in &section.blocks {
                let kind = match block {
                    Block::Callout { .. } => AnnotationKind::Callout,
                    Block::ImageIdea { .. } => AnnotationKind::ImageIdea,
                    _ => continue,
                };
                annotations.push(Annotation {
                    kind,
                    section_index,
                    text: block.text().to_string(),
                });
            }
        }
        annotations
    }

    /// Total number of source list entries across sections.
    pub fn source_count(&self) -> usize {
        self.sections.iter().map(|section| section.sources.len()).sum()
    }
}
