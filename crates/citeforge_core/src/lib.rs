//! Core domain logic for citeforge.
//! This crate is the single source of truth for citation and project invariants.

pub mod article;
pub mod chunking;
pub mod citation;
pub mod config;
pub mod db;
pub mod export;
pub mod generation;
pub mod industry;
pub mod ledger;
pub mod llm;
pub mod logging;
pub mod markdown;
pub mod model;
pub mod repo;
pub mod service;
pub mod similarity;
pub mod sources;

pub use article::{parse_article, resolve_citations, validate_article, Article, ArticlePolicy};
pub use config::{ConfigError, Settings};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget, LoggingError};
pub use model::project::{ChunkGeneration, ChunkId, Project, ProjectChunk, ProjectId};
pub use model::source::Source;
pub use repo::ledger_repo::{LedgerEntry, LedgerRepository, SqliteLedgerRepository};
pub use repo::project_repo::{ProjectRepository, RepoError, RepoResult, SqliteProjectRepository};
pub use service::project_service::{
    AssembleOutcome, NewProject, ProjectDetail, ProjectService, ServiceError, ServiceResult,
};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
