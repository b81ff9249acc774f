//! Project, chunk and generation domain records.
//!
//! # Responsibility
//! - Define the canonical records behind the repurposing workflow.
//! - Provide constructors that apply project defaults.
//!
//! # Invariants
//! - `Project::id` is stable and never reused.
//! - `max_chars` is always at least 1.
//! - Chunk `order_index` values are contiguous from 0 within one project.

use crate::model::source::Source;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for projects.
pub type ProjectId = Uuid;

/// Row id for chunks (SQLite integer primary key).
pub type ChunkId = i64;

pub const DEFAULT_PROJECT_NAME: &str = "Untitled Project";
pub const DEFAULT_MAX_CHARS: u32 = 1200;

/// Validation errors for project records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectValidationError {
    EmptyName,
    ZeroMaxChars,
}

impl Display for ProjectValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "project name cannot be empty"),
            Self::ZeroMaxChars => write!(f, "max_chars must be at least 1"),
        }
    }
}

impl Error for ProjectValidationError {}

/// One repurposing project: brief, brand voice and the text to convert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Free-form project brief. Also drives industry detection.
    pub directions: String,
    pub brand_prompt: Option<String>,
    pub source_text: String,
    pub max_chars: u32,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl Project {
    /// Creates a project with a generated id and default name fallback.
    pub fn new(name: &str, directions: impl Into<String>, source_text: impl Into<String>) -> Self {
        let now = now_epoch_ms();
        let trimmed = name.trim();
        Self {
            id: Uuid::new_v4(),
            name: if trimmed.is_empty() {
                DEFAULT_PROJECT_NAME.to_string()
            } else {
                trimmed.to_string()
            },
            directions: directions.into().trim().to_string(),
            brand_prompt: None,
            source_text: source_text.into(),
            max_chars: DEFAULT_MAX_CHARS,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ProjectValidationError> {
        if self.name.trim().is_empty() {
            return Err(ProjectValidationError::EmptyName);
        }
        if self.max_chars == 0 {
            return Err(ProjectValidationError::ZeroMaxChars);
        }
        Ok(())
    }

    /// Ledger namespace for this project's claims.
    pub fn ledger_id(&self) -> String {
        format!("project::{}", self.id)
    }
}

/// One slice of the project source text, produced by chunking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectChunk {
    pub id: ChunkId,
    pub project_id: ProjectId,
    pub order_index: u32,
    pub source_text: String,
    /// Included in batch generation.
    pub selected: bool,
    pub approved: bool,
}

/// Generated (or hand-edited) text for one chunk.
///
/// Generations are append-only; the newest row per chunk is the current one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkGeneration {
    pub id: i64,
    pub project_id: ProjectId,
    pub chunk_id: ChunkId,
    pub generated_text: String,
    /// `None` for manual edits.
    pub sources: Option<Vec<Source>>,
    pub created_at: i64,
}

/// Current wall-clock time as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{Project, ProjectValidationError, DEFAULT_MAX_CHARS, DEFAULT_PROJECT_NAME};

    #[test]
    fn blank_name_falls_back_to_default() {
        let project = Project::new("   ", "", "text");
        assert_eq!(project.name, DEFAULT_PROJECT_NAME);
        assert_eq!(project.max_chars, DEFAULT_MAX_CHARS);
    }

    #[test]
    fn zero_max_chars_is_rejected() {
        let mut project = Project::new("Book", "", "");
        project.max_chars = 0;
        assert_eq!(project.validate(), Err(ProjectValidationError::ZeroMaxChars));
    }

    #[test]
    fn ledger_id_is_namespaced() {
        let project = Project::new("Book", "", "");
        assert!(project.ledger_id().starts_with("project::"));
        assert!(project.ledger_id().ends_with(&project.id.to_string()));
    }
}
