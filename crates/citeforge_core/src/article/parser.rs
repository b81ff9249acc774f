//! Article parser over the CommonMark block outline.

use super::{Article, Block, Citation, Section, SourceEntry};
use crate::markdown::{outline, MdBlock};
use once_cell::sync::Lazy;
use regex::Regex;

static SOURCES_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:\*\*|__)?\s*(?:sources|references)\s*(?:\*\*|__)?\s*(?::\s*(?:\*\*|__)?\s*(.*))?$",
    )
    .expect("valid sources header regex")
});
static SOURCE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*]\s+|\d+[.)]\s+)?\[?\s*([Ss]\d+)\s*\]?\s*[:.)\-]?\s*(.+)$")
        .expect("valid source line regex")
});
static CALLOUT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:>\s*)?(?:[-*]\s+)?(?:\*\*|__)?\s*callout\s*(?:\*\*|__)?\s*:\s*(?:\*\*|__)?\s*(.*)$",
    )
    .expect("valid callout regex")
});
static IMAGE_IDEA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:>\s*)?(?:[-*]\s+)?(?:\*\*|__)?\s*image\s+idea\s*(?:\*\*|__)?\s*:\s*(?:\*\*|__)?\s*(.*)$",
    )
    .expect("valid image idea regex")
});
static CITATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\s*([Ss]\d+(?:\s*[,;]\s*[Ss]\d+)*)\s*\]").expect("valid citation regex")
});
static KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[Ss]\d+").expect("valid key regex"));
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s)\]>"]+"#).expect("valid url regex"));

/// Parses an article. Never fails.
///
/// Code blocks, raw HTML and thematic breaks carry no article content but do
/// end a running `Sources:` list.
pub fn parse_article(text: &str) -> Article {
    let mut state = ParseState::default();

    for block in outline(text) {
        match block {
            MdBlock::Heading { level, text } => state.open_heading(level, text),
            MdBlock::Paragraph { lines } => state.push_paragraph(&lines),
            MdBlock::ListItem { lines } => state.push_item(&lines),
            MdBlock::Opaque => state.in_sources = false,
        }
    }

    state.article
}

/// Extracts citation markers with their byte spans.
pub fn extract_citations(text: &str) -> Vec<Citation> {
    CITATION_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let keys = KEY_RE
                .find_iter(&caps[1])
                .map(|m| m.as_str().to_ascii_uppercase())
                .collect::<Vec<_>>();
            Some(Citation {
                keys,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

#[derive(Default)]
struct ParseState {
    article: Article,
    in_sources: bool,
}

impl ParseState {
    fn current_section(&mut self) -> &mut Section {
        if self.article.sections.is_empty() {
            self.article.sections.push(Section::default());
        }
        let last = self.article.sections.len() - 1;
        &mut self.article.sections[last]
    }

    fn open_heading(&mut self, level: u8, heading: String) {
        // A `## Sources` heading closes the current section instead of opening one.
        if is_sources_heading(&heading) {
            self.in_sources = true;
            return;
        }
        self.in_sources = false;
        if level == 1 && self.article.title.is_none() {
            self.article.title = Some(heading.clone());
        }
        self.article.sections.push(Section {
            heading: Some(heading),
            level,
            blocks: Vec::new(),
            sources: Vec::new(),
        });
    }

    fn push_paragraph(&mut self, lines: &[String]) {
        let Some(first) = lines.first() else {
            return;
        };
        let mut rest = lines;
        if let Some(caps) = SOURCES_HEADER_RE.captures(first) {
            self.in_sources = true;
            let inline = caps.get(1).map_or("", |m| m.as_str().trim());
            if !inline.is_empty() {
                self.push_source_line(inline);
            }
            rest = &lines[1..];
        } else if !SOURCE_LINE_RE.is_match(first) {
            self.in_sources = false;
        }

        if self.in_sources {
            let consumed = self.take_source_lines(rest);
            rest = &rest[consumed..];
        }
        if !rest.is_empty() {
            self.in_sources = false;
            let block = classify_paragraph(rest);
            self.current_section().blocks.push(block);
        }
    }

    fn push_item(&mut self, lines: &[String]) {
        let Some(first) = lines.first() else {
            return;
        };
        if self.in_sources && SOURCE_LINE_RE.is_match(first) {
            self.take_source_lines(lines);
            return;
        }
        self.in_sources = false;
        let block = classify_annotation(lines).unwrap_or_else(|| {
            let text = lines.join(" ");
            Block::ListItem {
                citations: extract_citations(&text),
                text,
            }
        });
        self.current_section().blocks.push(block);
    }

    /// Consumes source lines and their wrapped continuations. Returns the
    /// number of lines taken.
    fn take_source_lines(&mut self, lines: &[String]) -> usize {
        for (index, line) in lines.iter().enumerate() {
            if SOURCE_LINE_RE.is_match(line) {
                self.push_source_line(line);
            } else if !self.extend_last_source(line) {
                return index;
            }
        }
        lines.len()
    }

    fn push_source_line(&mut self, line: &str) {
        let Some(caps) = SOURCE_LINE_RE.captures(line) else {
            return;
        };
        let reference = caps[2].trim().to_string();
        let entry = SourceEntry {
            key: caps[1].to_ascii_uppercase(),
            url: find_url(&reference),
            reference,
        };
        self.current_section().sources.push(entry);
    }

    /// Appends a wrapped line to the previous source entry.
    fn extend_last_source(&mut self, line: &str) -> bool {
        let Some(entry) = self
            .article
            .sections
            .last_mut()
            .and_then(|section| section.sources.last_mut())
        else {
            return false;
        };
        entry.reference.push(' ');
        entry.reference.push_str(line.trim());
        if entry.url.is_none() {
            entry.url = find_url(&entry.reference);
        }
        true
    }
}

fn classify_paragraph(lines: &[String]) -> Block {
    classify_annotation(lines).unwrap_or_else(|| {
        let text = lines.join(" ");
        Block::Paragraph {
            citations: extract_citations(&text),
            text,
        }
    })
}

fn classify_annotation(lines: &[String]) -> Option<Block> {
    let first = lines.first()?;

    if let Some(caps) = CALLOUT_RE.captures(first) {
        let text = trim_decoration(&join_with_rest(&caps[1], &lines[1..]));
        return Some(Block::Callout {
            citations: extract_citations(&text),
            text,
        });
    }

    if let Some(caps) = IMAGE_IDEA_RE.captures(first) {
        let text = trim_decoration(&join_with_rest(&caps[1], &lines[1..]));
        return Some(Block::ImageIdea { text });
    }

    None
}

fn is_sources_heading(heading: &str) -> bool {
    SOURCES_HEADER_RE
        .captures(heading)
        .is_some_and(|caps| caps.get(1).map_or(true, |rest| rest.as_str().trim().is_empty()))
}

fn join_with_rest(head: &str, rest: &[String]) -> String {
    std::iter::once(head.trim())
        .chain(rest.iter().map(|line| line.trim()))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn trim_decoration(text: &str) -> String {
    text.trim()
        .trim_matches(|ch| ch == '*' || ch == '_')
        .trim()
        .to_string()
}

fn find_url(text: &str) -> Option<String> {
    URL_RE
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';']).to_string())
}
