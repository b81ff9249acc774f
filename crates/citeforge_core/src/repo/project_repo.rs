//! Project/chunk/generation repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable persistence APIs over `projects`, `project_chunks` and
//!   `chunk_generations`.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Project::validate()` before SQL mutations.
//! - `replace_chunks` swaps the whole chunk set in one transaction.
//! - Chunk lookups are always scoped by project id.
//! - Generations are insert-only.

use crate::db::DbError;
use crate::model::project::{
    now_epoch_ms, ChunkGeneration, ChunkId, Project, ProjectChunk, ProjectId,
    ProjectValidationError,
};
use crate::model::source::Source;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    name,
    directions,
    brand_prompt,
    source_text,
    max_chars,
    created_at,
    updated_at
FROM projects";

const CHUNK_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    order_index,
    source_text,
    selected,
    approved
FROM project_chunks";

const GENERATION_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    chunk_id,
    generated_text,
    sources_json,
    created_at
FROM chunk_generations";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for project persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ProjectValidationError),
    Db(DbError),
    ProjectNotFound(ProjectId),
    ChunkNotFound {
        project_id: ProjectId,
        chunk_id: ChunkId,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::ChunkNotFound {
                project_id,
                chunk_id,
            } => write!(f, "chunk {chunk_id} not found in project {project_id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProjectValidationError> for RepoError {
    fn from(value: ProjectValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Insert model for one generation row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGeneration {
    pub project_id: ProjectId,
    pub chunk_id: ChunkId,
    pub generated_text: String,
    pub sources: Option<Vec<Source>>,
}

/// Repository interface for projects, chunks and generations.
pub trait ProjectRepository {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Newest first.
    fn list_projects(&self) -> RepoResult<Vec<Project>>;
    fn update_directions(&self, id: ProjectId, directions: &str) -> RepoResult<()>;
    fn update_source(&self, id: ProjectId, source_text: &str, max_chars: u32) -> RepoResult<()>;
    /// Deletes existing chunks (and their generations) and inserts `parts` in order.
    fn replace_chunks(&self, id: ProjectId, parts: &[String]) -> RepoResult<Vec<ProjectChunk>>;
    /// Ordered by `order_index`.
    fn list_chunks(&self, id: ProjectId) -> RepoResult<Vec<ProjectChunk>>;
    fn get_chunk(&self, id: ProjectId, chunk_id: ChunkId) -> RepoResult<Option<ProjectChunk>>;
    /// Flips `selected` and returns the new value.
    fn toggle_chunk_selected(&self, id: ProjectId, chunk_id: ChunkId) -> RepoResult<bool>;
    fn set_chunk_approved(&self, id: ProjectId, chunk_id: ChunkId, approved: bool)
        -> RepoResult<()>;
    fn insert_generation(&self, generation: &NewGeneration) -> RepoResult<ChunkGeneration>;
    /// Newest first.
    fn list_generations(&self, id: ProjectId) -> RepoResult<Vec<ChunkGeneration>>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn touch_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects SET updated_at = ?2 WHERE id = ?1;",
            params![id.to_string(), now_epoch_ms()],
        )?;
        if changed == 0 {
            return Err(RepoError::ProjectNotFound(id));
        }
        Ok(())
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId> {
        project.validate()?;

        self.conn.execute(
            "INSERT INTO projects (
                id,
                name,
                directions,
                brand_prompt,
                source_text,
                max_chars,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                project.id.to_string(),
                project.name.as_str(),
                project.directions.as_str(),
                project.brand_prompt.as_deref(),
                project.source_text.as_str(),
                project.max_chars,
                project.created_at,
                project.updated_at,
            ],
        )?;

        Ok(project.id)
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn list_projects(&self) -> RepoResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL} ORDER BY created_at DESC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn update_directions(&self, id: ProjectId, directions: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects SET directions = ?2, updated_at = ?3 WHERE id = ?1;",
            params![id.to_string(), directions, now_epoch_ms()],
        )?;
        if changed == 0 {
            return Err(RepoError::ProjectNotFound(id));
        }
        Ok(())
    }

    fn update_source(&self, id: ProjectId, source_text: &str, max_chars: u32) -> RepoResult<()> {
        if max_chars == 0 {
            return Err(RepoError::Validation(ProjectValidationError::ZeroMaxChars));
        }
        let changed = self.conn.execute(
            "UPDATE projects
             SET
                source_text = ?2,
                max_chars = ?3,
                updated_at = ?4
             WHERE id = ?1;",
            params![id.to_string(), source_text, max_chars, now_epoch_ms()],
        )?;
        if changed == 0 {
            return Err(RepoError::ProjectNotFound(id));
        }
        Ok(())
    }

    fn replace_chunks(&self, id: ProjectId, parts: &[String]) -> RepoResult<Vec<ProjectChunk>> {
        let id_text = id.to_string();
        let tx = self.conn.unchecked_transaction()?;

        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1);",
            [id_text.as_str()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::ProjectNotFound(id));
        }

        tx.execute(
            "DELETE FROM project_chunks WHERE project_id = ?1;",
            [id_text.as_str()],
        )?;
        for (order_index, part) in parts.iter().enumerate() {
            tx.execute(
                "INSERT INTO project_chunks (project_id, order_index, source_text)
                 VALUES (?1, ?2, ?3);",
                params![id_text.as_str(), order_index as i64, part.as_str()],
            )?;
        }
        tx.commit()?;

        self.touch_project(id)?;
        self.list_chunks(id)
    }

    fn list_chunks(&self, id: ProjectId) -> RepoResult<Vec<ProjectChunk>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CHUNK_SELECT_SQL} WHERE project_id = ?1 ORDER BY order_index ASC;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut chunks = Vec::new();
        while let Some(row) = rows.next()? {
            chunks.push(parse_chunk_row(row)?);
        }
        Ok(chunks)
    }

    fn get_chunk(&self, id: ProjectId, chunk_id: ChunkId) -> RepoResult<Option<ProjectChunk>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CHUNK_SELECT_SQL} WHERE project_id = ?1 AND id = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), chunk_id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_chunk_row(row)?));
        }
        Ok(None)
    }

    fn toggle_chunk_selected(&self, id: ProjectId, chunk_id: ChunkId) -> RepoResult<bool> {
        let selected: Option<i64> = self
            .conn
            .query_row(
                "UPDATE project_chunks
                 SET selected = 1 - selected
                 WHERE project_id = ?1 AND id = ?2
                 RETURNING selected;",
                params![id.to_string(), chunk_id],
                |row| row.get(0),
            )
            .optional()?;
        match selected {
            Some(value) => int_to_bool(value, "project_chunks.selected"),
            None => Err(RepoError::ChunkNotFound {
                project_id: id,
                chunk_id,
            }),
        }
    }

    fn set_chunk_approved(
        &self,
        id: ProjectId,
        chunk_id: ChunkId,
        approved: bool,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE project_chunks SET approved = ?3 WHERE project_id = ?1 AND id = ?2;",
            params![id.to_string(), chunk_id, bool_to_int(approved)],
        )?;
        if changed == 0 {
            return Err(RepoError::ChunkNotFound {
                project_id: id,
                chunk_id,
            });
        }
        Ok(())
    }

    fn insert_generation(&self, generation: &NewGeneration) -> RepoResult<ChunkGeneration> {
        if self.get_chunk(generation.project_id, generation.chunk_id)?.is_none() {
            return Err(RepoError::ChunkNotFound {
                project_id: generation.project_id,
                chunk_id: generation.chunk_id,
            });
        }

        let sources_json = generation
            .sources
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|err| RepoError::InvalidData(format!("unserializable sources: {err}")))?;
        let created_at = now_epoch_ms();

        self.conn.execute(
            "INSERT INTO chunk_generations (
                project_id,
                chunk_id,
                generated_text,
                sources_json,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                generation.project_id.to_string(),
                generation.chunk_id,
                generation.generated_text.as_str(),
                sources_json,
                created_at,
            ],
        )?;

        Ok(ChunkGeneration {
            id: self.conn.last_insert_rowid(),
            project_id: generation.project_id,
            chunk_id: generation.chunk_id,
            generated_text: generation.generated_text.clone(),
            sources: generation.sources.clone(),
            created_at,
        })
    }

    fn list_generations(&self, id: ProjectId) -> RepoResult<Vec<ChunkGeneration>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GENERATION_SELECT_SQL} WHERE project_id = ?1 ORDER BY created_at DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut generations = Vec::new();
        while let Some(row) = rows.next()? {
            generations.push(parse_generation_row(row)?);
        }
        Ok(generations)
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let id_text: String = row.get("id")?;
    let project = Project {
        id: parse_uuid(&id_text, "projects.id")?,
        name: row.get("name")?,
        directions: row.get("directions")?,
        brand_prompt: row.get("brand_prompt")?,
        source_text: row.get("source_text")?,
        max_chars: row.get("max_chars")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    project.validate()?;
    Ok(project)
}

fn parse_chunk_row(row: &Row<'_>) -> RepoResult<ProjectChunk> {
    let project_text: String = row.get("project_id")?;
    Ok(ProjectChunk {
        id: row.get("id")?,
        project_id: parse_uuid(&project_text, "project_chunks.project_id")?,
        order_index: row.get("order_index")?,
        source_text: row.get("source_text")?,
        selected: int_to_bool(row.get("selected")?, "project_chunks.selected")?,
        approved: int_to_bool(row.get("approved")?, "project_chunks.approved")?,
    })
}

fn parse_generation_row(row: &Row<'_>) -> RepoResult<ChunkGeneration> {
    let project_text: String = row.get("project_id")?;
    let sources = match row.get::<_, Option<String>>("sources_json")? {
        Some(json) => Some(serde_json::from_str::<Vec<Source>>(&json).map_err(|err| {
            RepoError::InvalidData(format!(
                "invalid sources json in chunk_generations.sources_json: {err}"
            ))
        })?),
        None => None,
    };

    Ok(ChunkGeneration {
        id: row.get("id")?,
        project_id: parse_uuid(&project_text, "chunk_generations.project_id")?,
        chunk_id: row.get("chunk_id")?,
        generated_text: row.get("generated_text")?,
        sources,
        created_at: row.get("created_at")?,
    })
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
