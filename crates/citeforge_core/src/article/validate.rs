//! Article-level citation policy checks.

use super::{resolve_citations, Article, Block};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// Thresholds applied by [`validate_article`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticlePolicy {
    /// Minimum distinct keys cited per section with body text. `0` disables.
    pub min_citations_per_section: usize,
    /// Flag prose paragraphs that carry no citation.
    pub require_paragraph_citations: bool,
}

impl Default for ArticlePolicy {
    fn default() -> Self {
        Self {
            min_citations_per_section: 3,
            require_paragraph_citations: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ArticleIssue {
    UnresolvedKey {
        section_index: usize,
        key: String,
    },
    UnusedSource {
        section_index: usize,
        key: String,
    },
    DuplicateSourceKey {
        section_index: usize,
        key: String,
    },
    UncitedParagraph {
        section_index: usize,
        block_index: usize,
    },
    BelowCitationThreshold {
        section_index: usize,
        found: usize,
        required: usize,
    },
}

impl Display for ArticleIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnresolvedKey { section_index, key } => {
                write!(f, "section {section_index}: [{key}] has no source entry")
            }
            Self::UnusedSource { section_index, key } => {
                write!(f, "section {section_index}: source {key} is never cited")
            }
            Self::DuplicateSourceKey { section_index, key } => {
                write!(f, "section {section_index}: source {key} is listed twice")
            }
            Self::UncitedParagraph {
                section_index,
                block_index,
            } => write!(
                f,
                "section {section_index}: paragraph {block_index} has no citation"
            ),
            Self::BelowCitationThreshold {
                section_index,
                found,
                required,
            } => write!(
                f,
                "section {section_index}: cites {found} sources, needs {required}"
            ),
        }
    }
}

/// Returns every policy issue in section order. Empty means the article passes.
pub fn validate_article(article: &Article, policy: &ArticlePolicy) -> Vec<ArticleIssue> {
    let resolution = resolve_citations(article);
    let mut issues = Vec::new();

    for (section_index, section) in article.sections.iter().enumerate() {
        let mut seen = HashSet::new();
        for entry in &section.sources {
            if !seen.insert(entry.key.as_str()) {
                issues.push(ArticleIssue::DuplicateSourceKey {
                    section_index,
                    key: entry.key.clone(),
                });
            }
        }

        if policy.require_paragraph_citations {
            for (block_index, block) in section.blocks.iter().enumerate() {
                if matches!(block, Block::Paragraph { .. }) && block.citations().is_empty() {
                    issues.push(ArticleIssue::UncitedParagraph {
                        section_index,
                        block_index,
                    });
                }
            }
        }

        let has_prose = section
            .blocks
            .iter()
            .any(|block| matches!(block, Block::Paragraph { .. }));
        let found = section.cited_keys().len();
        if policy.min_citations_per_section > 0
            && has_prose
            && found < policy.min_citations_per_section
        {
            issues.push(ArticleIssue::BelowCitationThreshold {
                section_index,
                found,
                required: policy.min_citations_per_section,
            });
        }
    }

    for unresolved in resolution.unresolved {
        issues.push(ArticleIssue::UnresolvedKey {
            section_index: unresolved.section_index,
            key: unresolved.key,
        });
    }
    for (section_index, key) in resolution.unused {
        issues.push(ArticleIssue::UnusedSource { section_index, key });
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::{validate_article, ArticleIssue, ArticlePolicy};
    use crate::article::parse_article;

    #[test]
    fn clean_article_has_no_issues() {
        let article =
            parse_article("# T\n\nA [S1] B [S2].\n\nSources:\n[S1] One\n[S2] Two\n");
        let policy = ArticlePolicy {
            min_citations_per_section: 2,
            require_paragraph_citations: true,
        };
        assert!(validate_article(&article, &policy).is_empty());
    }

    #[test]
    fn flags_threshold_duplicates_and_uncited_prose() {
        let article = parse_article("# T\n\nNo cite here.\n\nA [S1].\n\nSources:\n[S1] One\n[S1] Again\n");
        let policy = ArticlePolicy {
            min_citations_per_section: 3,
            require_paragraph_citations: true,
        };
        let issues = validate_article(&article, &policy);
        assert!(issues.contains(&ArticleIssue::DuplicateSourceKey {
            section_index: 0,
            key: "S1".to_string()
        }));
        assert!(issues.contains(&ArticleIssue::UncitedParagraph {
            section_index: 0,
            block_index: 0
        }));
        assert!(issues.contains(&ArticleIssue::BelowCitationThreshold {
            section_index: 0,
            found: 1,
            required: 3
        }));
    }
}
