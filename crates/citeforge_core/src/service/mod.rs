//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, generation and export calls into use-case APIs.
//! - Keep the CLI decoupled from storage and HTTP details.

pub mod project_service;
