//! CommonMark block outline shared by the article parser, ledger and exporter.
//!
//! Block boundaries come from `pulldown_cmark` events; block text is the raw
//! source slice so inline `[S#]` markers and emphasis survive untouched.

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use regex::Regex;
use std::ops::Range;

static ITEM_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*+]|\d{1,9}[.)])\s*").expect("valid item marker regex"));

/// Top-level block of a Markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MdBlock {
    Heading { level: u8, text: String },
    /// Trimmed source lines, blockquote markers removed.
    Paragraph { lines: Vec<String> },
    /// Outermost list item with its marker removed. Nested items stay inline.
    ListItem { lines: Vec<String> },
    /// Code, raw HTML or a thematic break.
    Opaque,
}

impl MdBlock {
    /// Lines joined with `separator`; headings yield their text.
    pub fn joined(&self, separator: &str) -> String {
        match self {
            Self::Heading { text, .. } => text.clone(),
            Self::Paragraph { lines } | Self::ListItem { lines } => lines.join(separator),
            Self::Opaque => String::new(),
        }
    }
}

/// Splits `text` into blocks in document order.
///
/// Link reference definitions (`[S1]: https://...`) are kept as paragraphs,
/// since source lists are often written that way.
pub fn outline(text: &str) -> Vec<MdBlock> {
    let parser = Parser::new(text);
    let definitions: Vec<Range<usize>> = parser
        .reference_definitions()
        .iter()
        .map(|(_, definition)| definition.span.clone())
        .collect();

    let mut blocks: Vec<(usize, MdBlock)> = Vec::new();
    let mut covered: Vec<Range<usize>> = Vec::new();
    let mut heading: Option<(usize, u8, String)> = None;
    let mut item_depth = 0usize;

    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(Tag::Item) => {
                if item_depth == 0 {
                    blocks.push((
                        range.start,
                        MdBlock::ListItem {
                            lines: item_lines(slice(text, &range)),
                        },
                    ));
                    covered.push(range);
                }
                item_depth += 1;
            }
            Event::End(TagEnd::Item) => item_depth = item_depth.saturating_sub(1),
            _ if item_depth > 0 => {}
            Event::Start(Tag::Heading { level, .. }) => {
                heading = Some((range.start, level as u8, String::new()));
            }
            Event::Text(fragment) | Event::Code(fragment) => {
                if let Some((_, _, title)) = heading.as_mut() {
                    title.push_str(&fragment);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((start, level, title)) = heading.take() {
                    blocks.push((
                        start,
                        MdBlock::Heading {
                            level,
                            text: title.trim().to_string(),
                        },
                    ));
                }
            }
            Event::Start(Tag::Paragraph) => {
                blocks.push((
                    range.start,
                    MdBlock::Paragraph {
                        lines: source_lines(slice(text, &range)),
                    },
                ));
                covered.push(range);
            }
            Event::Start(Tag::CodeBlock(_)) | Event::Start(Tag::HtmlBlock) | Event::Rule => {
                blocks.push((range.start, MdBlock::Opaque));
            }
            _ => {}
        }
    }

    for span in definitions {
        if covered.iter().any(|block| block.contains(&span.start)) {
            continue;
        }
        let lines = source_lines(slice(text, &span));
        if !lines.is_empty() {
            blocks.push((span.start, MdBlock::Paragraph { lines }));
        }
    }

    blocks.sort_by_key(|(start, _)| *start);
    blocks.into_iter().map(|(_, block)| block).collect()
}

fn slice<'a>(text: &'a str, range: &Range<usize>) -> &'a str {
    text.get(range.clone()).unwrap_or_default()
}

fn source_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            line.trim_start_matches(|ch: char| ch == '>' || ch.is_whitespace())
                .trim_end()
        })
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn item_lines(raw: &str) -> Vec<String> {
    let mut lines = source_lines(raw);
    if let Some(first) = lines.first_mut() {
        let stripped = ITEM_MARKER_RE.replace(first.as_str(), "").into_owned();
        *first = stripped;
    }
    lines.retain(|line| !line.is_empty());
    lines
}
