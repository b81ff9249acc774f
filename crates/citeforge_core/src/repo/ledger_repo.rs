//! Claim ledger persistence.
//!
//! # Invariants
//! - Ledger rows are append-only.
//! - `insert_rows` writes the whole batch in one transaction.
//! - Listing is newest first and bounded by the caller's limit.

use super::project_repo::RepoResult;
use crate::ledger::LedgerRow;
use rusqlite::{params, Connection};
use serde::Serialize;

/// Default number of rows returned by ledger listings.
pub const DEFAULT_LEDGER_LIMIT: u32 = 500;
/// Characters of claim text kept in listing snippets.
pub const LEDGER_SNIPPET_CHARS: usize = 160;

/// Listing projection of one ledger row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub section: String,
    pub source_key: String,
    pub source_citation: Option<String>,
    pub similarity_score: Option<f64>,
    /// First [`LEDGER_SNIPPET_CHARS`] characters of the claim.
    pub snippet: String,
    pub created_at: i64,
}

pub trait LedgerRepository {
    /// Returns the number of inserted rows.
    fn insert_rows(&self, rows: &[LedgerRow]) -> RepoResult<usize>;
    fn list_for_project(&self, project_key: &str, limit: u32) -> RepoResult<Vec<LedgerEntry>>;
}

pub struct SqliteLedgerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLedgerRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl LedgerRepository for SqliteLedgerRepository<'_> {
    fn insert_rows(&self, rows: &[LedgerRow]) -> RepoResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO claim_ledger (
                    project_id,
                    section,
                    claim_text,
                    source_key,
                    source_citation,
                    similarity_score,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.project_id.as_str(),
                    row.section.as_str(),
                    row.claim_text.as_str(),
                    row.source_key.as_str(),
                    row.source_citation.as_str(),
                    row.similarity_score,
                    row.created_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn list_for_project(&self, project_key: &str, limit: u32) -> RepoResult<Vec<LedgerEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                section,
                source_key,
                source_citation,
                similarity_score,
                claim_text,
                created_at
             FROM claim_ledger
             WHERE project_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2;",
        )?;
        let mut rows = stmt.query(params![project_key, limit])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let claim: String = row.get("claim_text")?;
            entries.push(LedgerEntry {
                id: row.get("id")?,
                section: row.get("section")?,
                source_key: row.get("source_key")?,
                source_citation: row.get("source_citation")?,
                similarity_score: row.get("similarity_score")?,
                snippet: claim.chars().take(LEDGER_SNIPPET_CHARS).collect(),
                created_at: row.get("created_at")?,
            });
        }
        Ok(entries)
    }
}
