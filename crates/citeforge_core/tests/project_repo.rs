use citeforge_core::db::open_db_in_memory;
use citeforge_core::repo::project_repo::NewGeneration;
use citeforge_core::{Project, ProjectRepository, RepoError, Source, SqliteProjectRepository};
use uuid::Uuid;

fn parts(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|text| text.to_string()).collect()
}

fn source(key: &str) -> Source {
    Source {
        key: key.to_string(),
        title: format!("Title {key}"),
        url: Some(format!("https://example.org/{key}")),
        doi: None,
        year: Some(2021),
        open_access: true,
        abstract_text: None,
    }
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);

    let mut project = Project::new(" Sleep book ", " healthcare brief ", "Body text");
    project.brand_prompt = Some("Warm and precise.".to_string());
    project.max_chars = 600;
    let id = repo.create_project(&project).unwrap();

    let loaded = repo.get_project(id).unwrap().unwrap();
    assert_eq!(loaded, project);
    assert_eq!(loaded.name, "Sleep book");
    assert_eq!(loaded.directions, "healthcare brief");
}

#[test]
fn get_missing_project_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);

    assert!(repo.get_project(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn create_rejects_zero_max_chars() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);

    let mut project = Project::new("Book", "", "");
    project.max_chars = 0;
    let err = repo.create_project(&project).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn list_projects_is_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);

    let mut older = Project::new("Older", "", "");
    older.created_at = 1_000;
    let mut newer = Project::new("Newer", "", "");
    newer.created_at = 2_000;
    repo.create_project(&older).unwrap();
    repo.create_project(&newer).unwrap();

    let names: Vec<String> = repo
        .list_projects()
        .unwrap()
        .into_iter()
        .map(|project| project.name)
        .collect();
    assert_eq!(names, vec!["Newer".to_string(), "Older".to_string()]);
}

#[test]
fn update_directions_and_source_persist() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);
    let project = Project::new("Book", "old", "old text");
    repo.create_project(&project).unwrap();

    repo.update_directions(project.id, "new brief").unwrap();
    repo.update_source(project.id, "new text", 300).unwrap();

    let loaded = repo.get_project(project.id).unwrap().unwrap();
    assert_eq!(loaded.directions, "new brief");
    assert_eq!(loaded.source_text, "new text");
    assert_eq!(loaded.max_chars, 300);

    let err = repo.update_directions(Uuid::new_v4(), "x").unwrap_err();
    assert!(matches!(err, RepoError::ProjectNotFound(_)));
}

#[test]
fn replace_chunks_orders_and_resets_state() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);
    let project = Project::new("Book", "", "");
    repo.create_project(&project).unwrap();

    let first = repo
        .replace_chunks(project.id, &parts(&["one", "two", "three"]))
        .unwrap();
    let order: Vec<u32> = first.iter().map(|chunk| chunk.order_index).collect();
    assert_eq!(order, vec![0, 1, 2]);
    assert!(first.iter().all(|chunk| chunk.selected && !chunk.approved));

    repo.insert_generation(&NewGeneration {
        project_id: project.id,
        chunk_id: first[0].id,
        generated_text: "draft [S1]".to_string(),
        sources: None,
    })
    .unwrap();

    let second = repo.replace_chunks(project.id, &parts(&["only"])).unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].source_text, "only");
    assert!(repo.list_generations(project.id).unwrap().is_empty());

    let cleared = repo.replace_chunks(project.id, &[]).unwrap();
    assert!(cleared.is_empty());
}

#[test]
fn replace_chunks_for_missing_project_fails() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);

    let err = repo
        .replace_chunks(Uuid::new_v4(), &parts(&["x"]))
        .unwrap_err();
    assert!(matches!(err, RepoError::ProjectNotFound(_)));
}

#[test]
fn toggle_and_approve_chunk_flags() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);
    let project = Project::new("Book", "", "");
    repo.create_project(&project).unwrap();
    let chunks = repo.replace_chunks(project.id, &parts(&["a", "b"])).unwrap();
    let chunk_id = chunks[1].id;

    assert!(!repo.toggle_chunk_selected(project.id, chunk_id).unwrap());
    assert!(repo.toggle_chunk_selected(project.id, chunk_id).unwrap());

    repo.set_chunk_approved(project.id, chunk_id, true).unwrap();
    let chunk = repo.get_chunk(project.id, chunk_id).unwrap().unwrap();
    assert!(chunk.approved);
    assert!(chunk.selected);

    let other_project = Uuid::new_v4();
    let err = repo
        .toggle_chunk_selected(other_project, chunk_id)
        .unwrap_err();
    assert!(matches!(err, RepoError::ChunkNotFound { .. }));
    let err = repo
        .set_chunk_approved(project.id, chunk_id + 100, true)
        .unwrap_err();
    assert!(matches!(err, RepoError::ChunkNotFound { .. }));
}

#[test]
fn generations_keep_sources_and_list_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);
    let project = Project::new("Book", "", "");
    repo.create_project(&project).unwrap();
    let chunks = repo.replace_chunks(project.id, &parts(&["a"])).unwrap();

    let first = repo
        .insert_generation(&NewGeneration {
            project_id: project.id,
            chunk_id: chunks[0].id,
            generated_text: "first [S1]".to_string(),
            sources: Some(vec![source("S1"), source("S2")]),
        })
        .unwrap();
    let second = repo
        .insert_generation(&NewGeneration {
            project_id: project.id,
            chunk_id: chunks[0].id,
            generated_text: "edited [S2]".to_string(),
            sources: None,
        })
        .unwrap();

    let listed = repo.list_generations(project.id).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[0].sources, None);
    assert_eq!(listed[1].id, first.id);
    assert_eq!(listed[1].sources, Some(vec![source("S1"), source("S2")]));
}

#[test]
fn insert_generation_requires_existing_chunk() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);
    let project = Project::new("Book", "", "");
    repo.create_project(&project).unwrap();

    let err = repo
        .insert_generation(&NewGeneration {
            project_id: project.id,
            chunk_id: 42,
            generated_text: "orphan".to_string(),
            sources: None,
        })
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::ChunkNotFound { chunk_id: 42, .. }
    ));
}
