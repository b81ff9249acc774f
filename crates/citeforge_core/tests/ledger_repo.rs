use citeforge_core::db::open_db_in_memory;
use citeforge_core::ledger::{build_ledger_rows, log_claims_from_markdown, LedgerRow};
use citeforge_core::repo::ledger_repo::LEDGER_SNIPPET_CHARS;
use citeforge_core::sources::write_sources_json;
use citeforge_core::{LedgerRepository, Source, SqliteLedgerRepository};

fn row(project_id: &str, key: &str, claim: &str, created_at: i64) -> LedgerRow {
    LedgerRow {
        project_id: project_id.to_string(),
        section: "Chapter".to_string(),
        claim_text: claim.to_string(),
        source_key: key.to_string(),
        source_citation: format!("({key}) citation."),
        similarity_score: Some(0.5),
        created_at,
    }
}

#[test]
fn insert_and_list_are_scoped_and_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteLedgerRepository::new(&conn);

    let inserted = repo
        .insert_rows(&[
            row("project::a", "S1", "old claim", 100),
            row("project::a", "S2", "new claim", 200),
            row("project::b", "S1", "other project", 300),
        ])
        .unwrap();
    assert_eq!(inserted, 3);

    let entries = repo.list_for_project("project::a", 500).unwrap();
    let keys: Vec<&str> = entries.iter().map(|e| e.source_key.as_str()).collect();
    assert_eq!(keys, vec!["S2", "S1"]);
    assert_eq!(entries[0].snippet, "new claim");
    assert_eq!(entries[0].source_citation.as_deref(), Some("(S2) citation."));

    let limited = repo.list_for_project("project::a", 1).unwrap();
    assert_eq!(limited.len(), 1);
}

#[test]
fn empty_batch_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteLedgerRepository::new(&conn);

    assert_eq!(repo.insert_rows(&[]).unwrap(), 0);
    assert!(repo.list_for_project("project::a", 10).unwrap().is_empty());
}

#[test]
fn snippets_are_truncated_by_characters() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteLedgerRepository::new(&conn);
    let long_claim = "é".repeat(LEDGER_SNIPPET_CHARS + 40);

    repo.insert_rows(&[row("project::a", "S1", &long_claim, 1)])
        .unwrap();

    let entries = repo.list_for_project("project::a", 10).unwrap();
    assert_eq!(entries[0].snippet.chars().count(), LEDGER_SNIPPET_CHARS);
}

#[test]
fn log_claims_reads_draft_and_sources_files() {
    let dir = tempfile::tempdir().unwrap();
    let draft_path = dir.path().join("final.md");
    let sources_path = dir.path().join("sources.json");
    std::fs::write(
        &draft_path,
        "# Sleep\n\nSleep consolidates memory [S1] [S2].\n\nUncited aside.\n\n## Naps\n\nNaps help recall [S2].\n",
    )
    .unwrap();
    write_sources_json(
        &sources_path,
        &[
            Source {
                key: "S1".to_string(),
                title: "Sleep and memory".to_string(),
                url: None,
                doi: Some("10.1/a".to_string()),
                year: Some(2010),
                open_access: true,
                abstract_text: Some("Sleep consolidates memory in adults.".to_string()),
            },
            Source {
                key: "S2".to_string(),
                title: "Naps".to_string(),
                url: Some("https://example.org/naps".to_string()),
                doi: None,
                year: None,
                open_access: false,
                abstract_text: None,
            },
        ],
    )
    .unwrap();

    let conn = open_db_in_memory().unwrap();
    let repo = SqliteLedgerRepository::new(&conn);
    let inserted =
        log_claims_from_markdown(&repo, "project::x", &draft_path, &sources_path).unwrap();
    assert_eq!(inserted.len(), 3);

    let entries = repo.list_for_project("project::x", 10).unwrap();
    assert_eq!(entries.len(), 3);
    let s1 = entries
        .iter()
        .find(|entry| entry.source_key == "S1")
        .unwrap();
    assert_eq!(s1.section, "Sleep");
    assert_eq!(
        s1.source_citation.as_deref(),
        Some("(2010) Sleep and memory. https://doi.org/10.1/a")
    );
    assert!(s1.similarity_score.unwrap() > 0.5);

    let naps: Vec<_> = entries
        .iter()
        .filter(|entry| entry.section == "Sleep > Naps")
        .collect();
    assert_eq!(naps.len(), 1);
    assert_eq!(naps[0].similarity_score, None);
}

#[test]
fn rows_without_known_sources_have_empty_citations() {
    let rows = build_ledger_rows("project::x", "Claim [S4].", &[], 7);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].section, "ROOT");
    assert_eq!(rows[0].source_citation, "");
    assert_eq!(rows[0].similarity_score, None);
    assert_eq!(rows[0].created_at, 7);
}
