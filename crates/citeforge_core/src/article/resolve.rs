//! Citation key resolution against per-section source lists.

use super::{Article, SourceEntry};
use serde::Serialize;
use std::collections::BTreeSet;

/// A cited key matched to a source list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCitation {
    pub section_index: usize,
    pub block_index: usize,
    pub key: String,
    /// Section whose source list provided the entry.
    pub source_section: usize,
    pub entry: SourceEntry,
}

/// A cited key no source list defines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedCitation {
    pub section_index: usize,
    pub block_index: usize,
    pub key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub resolved: Vec<ResolvedCitation>,
    pub unresolved: Vec<UnresolvedCitation>,
    /// `(section_index, key)` of list entries nothing resolved to.
    pub unused: Vec<(usize, String)>,
}

impl Resolution {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Resolves every cited key in document order.
pub fn resolve_citations(article: &Article) -> Resolution {
    let mut resolution = Resolution::default();
    let mut used: BTreeSet<(usize, String)> = BTreeSet::new();

    for (section_index, section) in article.sections.iter().enumerate() {
        for (block_index, block) in section.blocks.iter().enumerate() {
            for key in block.cited_keys() {
                match find_entry(article, section_index, &key) {
                    Some((source_section, entry)) => {
                        used.insert((source_section, key.clone()));
                        resolution.resolved.push(ResolvedCitation {
                            section_index,
                            block_index,
                            key,
                            source_section,
                            entry: entry.clone(),
                        });
                    }
                    None => resolution.unresolved.push(UnresolvedCitation {
                        section_index,
                        block_index,
                        key,
                    }),
                }
            }
        }
    }

    for (section_index, section) in article.sections.iter().enumerate() {
        for entry in &section.sources {
            let slot = (section_index, entry.key.clone());
            if !used.contains(&slot) && !resolution.unused.contains(&slot) {
                resolution.unused.push(slot);
            }
        }
    }

    resolution
}

fn find_entry<'a>(
    article: &'a Article,
    section_index: usize,
    key: &str,
) -> Option<(usize, &'a SourceEntry)> {
    let sections = &article.sections;
    let own = std::iter::once(section_index);
    let preceding = (0..section_index).rev();
    let following = section_index + 1..sections.len();

    own.chain(preceding)
        .chain(following)
        .find_map(|index| sections[index].source(key).map(|entry| (index, entry)))
}

#[cfg(test)]
mod tests {
    use super::resolve_citations;
    use crate::article::parse_article;

    #[test]
    fn own_section_wins_over_neighbours() {
        let article = parse_article(
            "# A\n\nx [S1]\n\nSources:\n[S1] From A\n\n# B\n\ny [S1]\n\nSources:\n[S1] From B\n",
        );
        let resolution = resolve_citations(&article);
        assert_eq!(resolution.resolved.len(), 2);
        assert_eq!(resolution.resolved[1].source_section, 1);
        assert_eq!(resolution.resolved[1].entry.reference, "From B");
        assert!(resolution.unused.is_empty());
    }

    #[test]
    fn falls_back_to_preceding_then_following() {
        let article = parse_article(
            "# A\n\nSources:\n[S1] One\n\n# B\n\nuses [S1] and [S2]\n\n# C\n\nSources:\n[S2] Two\n",
        );
        let resolution = resolve_citations(&article);
        let by_key = |key: &str| {
            resolution
                .resolved
                .iter()
                .find(|item| item.key == key)
                .map(|item| item.source_section)
        };
        assert_eq!(by_key("S1"), Some(0));
        assert_eq!(by_key("S2"), Some(2));
        assert!(resolution.is_clean());
    }

    #[test]
    fn reports_unresolved_and_unused() {
        let article = parse_article("Claim [S9].\n\nSources:\n[S1] Never cited\n");
        let resolution = resolve_citations(&article);
        assert_eq!(resolution.unresolved.len(), 1);
        assert_eq!(resolution.unresolved[0].key, "S9");
        assert_eq!(resolution.unused, vec![(0, "S1".to_string())]);
    }

    #[test]
    fn repeated_keys_in_a_block_resolve_once() {
        let article =
            parse_article("Claim [S1] again [S1] and [S1, s1].\n\nSources:\n[S1] Only one\n");
        let resolution = resolve_citations(&article);
        assert_eq!(resolution.resolved.len(), 1);
        assert_eq!(resolution.resolved[0].block_index, 0);
        assert!(resolution.unused.is_empty());
    }
}
