//! Paragraph-aware text chunking.
//!
//! # Invariants
//! - Paragraph boundaries are never split; an oversized paragraph is kept whole.
//! - Merged chunks join paragraphs with exactly one blank line.
//! - Lengths are counted in chars, not bytes.

use crate::citation::split_paragraphs;

/// Splits text by blank lines, then greedily merges neighbours up to `max_chars`.
pub fn chunk_text(text: &str, max_chars: u32) -> Vec<String> {
    let max_chars = max_chars as usize;
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;

    for paragraph in split_paragraphs(text) {
        let paragraph_chars = paragraph.chars().count();
        if buf.is_empty() {
            buf = paragraph;
            buf_chars = paragraph_chars;
            continue;
        }

        if buf_chars + 2 + paragraph_chars <= max_chars {
            buf.push_str("\n\n");
            buf.push_str(&paragraph);
            buf_chars += 2 + paragraph_chars;
        } else {
            chunks.push(std::mem::take(&mut buf));
            buf = paragraph;
            buf_chars = paragraph_chars;
        }
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }
    chunks
}
