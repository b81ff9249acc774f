use citeforge_core::db::migrations::latest_version;
use citeforge_core::db::{open_db, open_db_in_memory, schema_version, DbError};
use citeforge_core::repo::project_repo::NewGeneration;
use citeforge_core::{Project, ProjectRepository, SqliteProjectRepository};
use rusqlite::Connection;

const PROJECTS_SQL: &str = include_str!("../src/db/migrations/0001_projects.sql");

#[test]
fn fresh_database_has_project_and_ledger_tables() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), 2);
    assert_eq!(latest_version(), 2);
    for table in ["projects", "project_chunks", "chunk_generations", "claim_ledger"] {
        assert_eq!(count(&conn, "sqlite_master WHERE type = 'table' AND name = ?1", table), 1);
    }
}

#[test]
fn file_database_uses_wal_and_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("citeforge.db");

    let conn = open_db(&path).unwrap();
    let journal: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal.to_ascii_lowercase(), "wal");
    assert_eq!(foreign_keys, 1);
    drop(conn);

    let reopened = open_db(&path).unwrap();
    assert_eq!(schema_version(&reopened).unwrap(), latest_version());
}

#[test]
fn version_one_database_gains_the_claim_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(PROJECTS_SQL).unwrap();
    conn.execute_batch("PRAGMA user_version = 1;").unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), 2);
    assert_eq!(
        count(&conn, "sqlite_master WHERE type = 'table' AND name = ?1", "claim_ledger"),
        1
    );
}

#[test]
fn replacing_chunks_cascades_to_their_generations() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);
    let id = repo
        .create_project(&Project::new("Sleep", "", "One.\n\nTwo."))
        .unwrap();
    let chunks = repo
        .replace_chunks(id, &["One.".to_string(), "Two.".to_string()])
        .unwrap();
    repo.insert_generation(&NewGeneration {
        project_id: id,
        chunk_id: chunks[0].id,
        generated_text: "Sleep helps [S1].".to_string(),
        sources: None,
    })
    .unwrap();
    let project_key = id.to_string();
    assert_eq!(count(&conn, "chunk_generations WHERE project_id = ?1", &project_key), 1);

    repo.replace_chunks(id, &["Merged.".to_string()]).unwrap();
    assert_eq!(count(&conn, "chunk_generations WHERE project_id = ?1", &project_key), 0);
    assert_eq!(count(&conn, "project_chunks WHERE project_id = ?1", &project_key), 1);

    conn.execute("DELETE FROM projects WHERE id = ?1;", [project_key.as_str()])
        .unwrap();
    assert_eq!(count(&conn, "project_chunks WHERE project_id = ?1", &project_key), 0);
}

#[test]
fn schema_rejects_invalid_rows() {
    let conn = open_db_in_memory().unwrap();

    let zero_chars = conn.execute(
        "INSERT INTO projects (id, name, max_chars, created_at, updated_at)
         VALUES ('p', 'n', 0, 1, 1);",
        [],
    );
    assert!(zero_chars.is_err());

    let orphan_chunk = conn.execute(
        "INSERT INTO project_chunks (project_id, order_index, source_text)
         VALUES ('missing', 0, 'text');",
        [],
    );
    assert!(orphan_chunk.is_err());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn count(conn: &Connection, from_where: &str, param: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {from_where};"), [param], |row| {
        row.get(0)
    })
    .unwrap()
}
