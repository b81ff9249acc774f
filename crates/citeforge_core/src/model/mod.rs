//! Domain model for repurposing projects and their sources.
//!
//! # Responsibility
//! - Define canonical records used by repositories and services.
//!
//! # Invariants
//! - Projects are identified by a stable `ProjectId`.
//! - Generations are append-only history; nothing here mutates them.

pub mod project;
pub mod source;
