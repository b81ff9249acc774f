//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`ProjectNotFound`,
//!   `ChunkNotFound`) in addition to DB transport errors.

pub mod ledger_repo;
pub mod project_repo;
