//! Project use-case service.
//!
//! # Responsibility
//! - Drive the repurposing workflow: create and chunk projects, generate
//!   cited passages per chunk, record edits, assemble manuscripts and log
//!   claims to the ledger.
//! - Delegate persistence to repository implementations and generation to a
//!   [`ChatClient`].
//!
//! # Invariants
//! - Chunks are always derived from the project's current source text.
//! - Generations are appended, never updated; the newest per chunk wins.
//! - Assembly writes the draft, sources and manuscripts before the ledger is
//!   touched; the similarity report is derived from the rows just logged.

use crate::chunking::chunk_text;
use crate::citation::link_sources;
use crate::config::{load_brand_voice, Settings};
use crate::export::{render_markdown, title_from_path, Manuscript};
use crate::generation::{generate, GenerationInput, GenerationMode};
use crate::industry::detect_industry;
use crate::ledger::{
    flag_similar_claims, log_claims_from_markdown, write_similarity_report, LedgerError,
    SimilarityFlag,
};
use crate::llm::{ChatClient, LlmError};
use crate::model::project::{
    ChunkGeneration, ChunkId, Project, ProjectChunk, ProjectId, DEFAULT_MAX_CHARS,
};
use crate::model::source::{compare_source_keys, Source};
use crate::repo::ledger_repo::{LedgerEntry, LedgerRepository};
use crate::repo::project_repo::{NewGeneration, ProjectRepository, RepoError};
use crate::sources::{build_sources, load_link_map, write_sources_json, SourceError, SourceProvider};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Instant;

/// Body written when no chunk has a generation yet.
pub const EMPTY_DRAFT: &str = "# Empty\n\n(No generated content yet.)";

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
    Repo(RepoError),
    Llm(LlmError),
    Sources(SourceError),
    Ledger(LedgerError),
    Io(std::io::Error),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Llm(err) => write!(f, "{err}"),
            Self::Sources(err) => write!(f, "{err}"),
            Self::Ledger(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "artifact write failed: {err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Llm(err) => Some(err),
            Self::Sources(err) => Some(err),
            Self::Ledger(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<LlmError> for ServiceError {
    fn from(value: LlmError) -> Self {
        Self::Llm(value)
    }
}

impl From<SourceError> for ServiceError {
    fn from(value: SourceError) -> Self {
        Self::Sources(value)
    }
}

impl From<LedgerError> for ServiceError {
    fn from(value: LedgerError) -> Self {
        Self::Ledger(value)
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Request model for creating a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub directions: String,
    pub source_text: String,
    /// Defaults to [`DEFAULT_MAX_CHARS`].
    pub max_chars: Option<u32>,
    /// Defaults to the configured brand prompt file.
    pub brand_prompt: Option<String>,
}

/// Project with its chunks and the current generation per chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDetail {
    pub project: Project,
    pub chunks: Vec<ProjectChunk>,
    pub latest: BTreeMap<ChunkId, ChunkGeneration>,
}

/// Files produced by [`ProjectService::assemble`].
#[derive(Debug, Clone, PartialEq)]
pub struct AssembleOutcome {
    pub final_md: PathBuf,
    pub sources_json: PathBuf,
    /// Manuscript with inline `[S#]` citations kept.
    pub manuscript: PathBuf,
    /// Manuscript with inline citations stripped.
    pub clean_manuscript: PathBuf,
    /// Claims scoring above the configured similarity ratio, also written here.
    pub similarity_report: PathBuf,
    pub sources: usize,
    pub ledger_rows: usize,
    pub flagged: Vec<SimilarityFlag>,
}

/// Knobs the service reads from [`Settings`].
#[derive(Debug, Clone, PartialEq)]
struct ServiceOptions {
    brand_prompt_path: PathBuf,
    model: String,
    mode: GenerationMode,
    domain: String,
    sources_per_chunk: usize,
    max_similarity_ratio: f64,
    output_dir: PathBuf,
    artifacts_dir: PathBuf,
}

/// Use-case service for projects, generation and assembly.
pub struct ProjectService<R: ProjectRepository, L: LedgerRepository> {
    projects: R,
    ledger: L,
    client: Box<dyn ChatClient>,
    providers: Vec<Box<dyn SourceProvider>>,
    link_map: BTreeMap<String, String>,
    options: ServiceOptions,
}

impl<R: ProjectRepository, L: LedgerRepository> ProjectService<R, L> {
    /// Creates a service; the citation link map is read once from `settings.sources_file`.
    pub fn new(
        projects: R,
        ledger: L,
        settings: &Settings,
        client: Box<dyn ChatClient>,
        providers: Vec<Box<dyn SourceProvider>>,
    ) -> Self {
        Self {
            projects,
            ledger,
            client,
            providers,
            link_map: load_link_map(&settings.sources_file),
            options: ServiceOptions {
                brand_prompt_path: settings.brand_prompt_path.clone(),
                model: settings.openai_model.clone(),
                mode: settings.generation_mode(),
                domain: settings.domain.clone(),
                sources_per_chunk: settings.sources_per_chunk,
                max_similarity_ratio: settings.max_similarity_ratio,
                output_dir: settings.output_dir(),
                artifacts_dir: settings.artifacts_dir(),
            },
        }
    }

    /// Creates a project and chunks its source text.
    pub fn create_project(&self, request: &NewProject) -> ServiceResult<ProjectDetail> {
        let mut project = Project::new(
            &request.name,
            request.directions.as_str(),
            request.source_text.as_str(),
        );
        project.max_chars = request.max_chars.unwrap_or(DEFAULT_MAX_CHARS);
        project.brand_prompt = Some(
            request
                .brand_prompt
                .clone()
                .filter(|prompt| !prompt.trim().is_empty())
                .unwrap_or_else(|| load_brand_voice(&self.options.brand_prompt_path)),
        );

        self.projects.create_project(&project)?;
        let chunks = self
            .projects
            .replace_chunks(project.id, &chunk_text(&project.source_text, project.max_chars))?;
        info!(
            "event=project_create module=service status=ok project_id={} chunks={}",
            project.id,
            chunks.len()
        );

        Ok(ProjectDetail {
            project: self.require_project(project.id)?,
            chunks,
            latest: BTreeMap::new(),
        })
    }

    pub fn get_project(&self, id: ProjectId) -> ServiceResult<Project> {
        self.require_project(id)
    }

    /// Newest first.
    pub fn list_projects(&self) -> ServiceResult<Vec<Project>> {
        Ok(self.projects.list_projects()?)
    }

    pub fn project_detail(&self, id: ProjectId) -> ServiceResult<ProjectDetail> {
        let project = self.require_project(id)?;
        Ok(ProjectDetail {
            chunks: self.projects.list_chunks(id)?,
            latest: self.latest_generation_map(id)?,
            project,
        })
    }

    pub fn update_directions(&self, id: ProjectId, directions: &str) -> ServiceResult<()> {
        self.projects.update_directions(id, directions)?;
        info!("event=project_directions module=service status=ok project_id={id}");
        Ok(())
    }

    /// Replaces the chunk set, optionally with new source text and chunk size.
    ///
    /// Existing chunks and their generations are discarded.
    pub fn rechunk(
        &self,
        id: ProjectId,
        max_chars: Option<u32>,
        source_text: Option<&str>,
    ) -> ServiceResult<Vec<ProjectChunk>> {
        let project = self.require_project(id)?;
        let max_chars = max_chars.unwrap_or(project.max_chars);
        let source_text = source_text.unwrap_or(&project.source_text);

        self.projects.update_source(id, source_text, max_chars)?;
        let chunks = self
            .projects
            .replace_chunks(id, &chunk_text(source_text, max_chars))?;
        info!(
            "event=project_rechunk module=service status=ok project_id={id} max_chars={max_chars} chunks={}",
            chunks.len()
        );
        Ok(chunks)
    }

    /// Flips whether a chunk takes part in batch generation.
    pub fn toggle_select(&self, id: ProjectId, chunk_id: ChunkId) -> ServiceResult<bool> {
        Ok(self.projects.toggle_chunk_selected(id, chunk_id)?)
    }

    /// Finds sources for one chunk, generates a cited passage and stores it.
    pub fn generate_for_chunk(
        &self,
        id: ProjectId,
        chunk_id: ChunkId,
    ) -> ServiceResult<ChunkGeneration> {
        let project = self.require_project(id)?;
        let chunk = self.require_chunk(id, chunk_id)?;
        self.generate_chunk(&project, &chunk)
    }

    /// Generates every selected chunk in order. Returns how many were generated.
    pub fn generate_batch(&self, id: ProjectId) -> ServiceResult<usize> {
        let project = self.require_project(id)?;
        let selected: Vec<ProjectChunk> = self
            .projects
            .list_chunks(id)?
            .into_iter()
            .filter(|chunk| chunk.selected)
            .collect();
        for chunk in &selected {
            self.generate_chunk(&project, chunk)?;
        }
        info!(
            "event=generate_batch module=service status=ok project_id={id} chunks={}",
            selected.len()
        );
        Ok(selected.len())
    }

    /// Stores an edited passage and the chunk's approval flag.
    ///
    /// Blank text only updates approval. Stored text has known citation keys
    /// linked via the configured link map.
    pub fn save_generation(
        &self,
        id: ProjectId,
        chunk_id: ChunkId,
        text: &str,
        approved: bool,
    ) -> ServiceResult<Option<ChunkGeneration>> {
        self.require_chunk(id, chunk_id)?;
        let text = text.trim();
        let saved = if text.is_empty() {
            None
        } else {
            Some(self.projects.insert_generation(&NewGeneration {
                project_id: id,
                chunk_id,
                generated_text: link_sources(text, &self.link_map),
                sources: None,
            })?)
        };
        self.projects.set_chunk_approved(id, chunk_id, approved)?;
        info!(
            "event=generation_save module=service status=ok project_id={id} chunk_id={chunk_id} stored={} approved={approved}",
            saved.is_some()
        );
        Ok(saved)
    }

    /// Newest generation per chunk.
    pub fn latest_generation_map(
        &self,
        id: ProjectId,
    ) -> ServiceResult<BTreeMap<ChunkId, ChunkGeneration>> {
        let mut latest = BTreeMap::new();
        for generation in self.projects.list_generations(id)? {
            latest.entry(generation.chunk_id).or_insert(generation);
        }
        Ok(latest)
    }

    /// Writes the draft, its sources and both manuscripts, then logs claims
    /// and reports the ones worded too close to their sources.
    pub fn assemble(&self, id: ProjectId) -> ServiceResult<AssembleOutcome> {
        let started_at = Instant::now();
        let project = self.require_project(id)?;
        let latest = self.latest_generation_map(id)?;

        let parts: Vec<String> = self
            .projects
            .list_chunks(id)?
            .iter()
            .filter_map(|chunk| latest.get(&chunk.id))
            .map(|generation| generation.generated_text.trim().to_string())
            .collect();
        let joined = parts.join("\n\n");
        let draft = if joined.trim().is_empty() {
            EMPTY_DRAFT.to_string()
        } else {
            joined.trim().to_string()
        };

        let project_dir = self.options.artifacts_dir.join(id.to_string());
        std::fs::create_dir_all(&project_dir)?;
        let final_md = project_dir.join("final.md");
        std::fs::write(&final_md, &draft)?;

        let sources = merged_sources(&latest);
        let sources_json = project_dir.join("sources.json");
        write_sources_json(&sources_json, &sources)?;

        let manuscript = Manuscript::from_markdown(title_from_path(&final_md), &draft, &sources);
        std::fs::create_dir_all(&self.options.output_dir)?;
        let stem = format!("{}_{}", file_safe_name(&project.name), id);
        let manuscript_path = self.options.output_dir.join(format!("{stem}.md"));
        let clean_path = self.options.output_dir.join(format!("{stem}.clean.md"));
        std::fs::write(&manuscript_path, render_markdown(&manuscript, false))?;
        std::fs::write(&clean_path, render_markdown(&manuscript, true))?;

        let rows =
            log_claims_from_markdown(&self.ledger, &project.ledger_id(), &final_md, &sources_json)?;
        let flagged = flag_similar_claims(&rows, self.options.max_similarity_ratio);
        let similarity_report = project_dir.join("similarity_report.json");
        write_similarity_report(&similarity_report, &flagged)?;
        for flag in &flagged {
            warn!(
                "event=similarity_flag module=service status=flagged project_id={id} key={} score={:.2} section={}",
                flag.source_key, flag.score, flag.section
            );
        }
        info!(
            "event=assemble module=service status=ok project_id={id} chunks={} sources={} ledger_rows={} flagged={} duration_ms={}",
            parts.len(),
            sources.len(),
            rows.len(),
            flagged.len(),
            started_at.elapsed().as_millis()
        );

        Ok(AssembleOutcome {
            final_md,
            sources_json,
            manuscript: manuscript_path,
            clean_manuscript: clean_path,
            similarity_report,
            sources: sources.len(),
            ledger_rows: rows.len(),
            flagged,
        })
    }

    /// Ledger rows for the project, newest first.
    pub fn ledger(&self, id: ProjectId, limit: u32) -> ServiceResult<Vec<LedgerEntry>> {
        let project = self.require_project(id)?;
        Ok(self.ledger.list_for_project(&project.ledger_id(), limit)?)
    }

    fn generate_chunk(
        &self,
        project: &Project,
        chunk: &ProjectChunk,
    ) -> ServiceResult<ChunkGeneration> {
        let started_at = Instant::now();
        let industry = detect_industry(&project.directions);
        let sources = build_sources(
            &chunk.source_text,
            &self.options.domain,
            self.options.sources_per_chunk,
            &self.providers,
        );
        let brand_voice = match project.brand_prompt.as_deref() {
            Some(prompt) if !prompt.trim().is_empty() => prompt.to_string(),
            _ => load_brand_voice(&self.options.brand_prompt_path),
        };

        let input = GenerationInput {
            brand_voice: &brand_voice,
            directions: &project.directions,
            industry,
            chunk_text: &chunk.source_text,
            sources: &sources,
        };
        let text = generate(
            &*self.client,
            &self.options.model,
            self.options.mode,
            &input,
        )
        .map_err(|err| {
            error!(
                "event=generate_chunk module=service status=error project_id={} chunk_id={} error={}",
                project.id, chunk.id, err
            );
            err
        })?;

        let generation = self.projects.insert_generation(&NewGeneration {
            project_id: project.id,
            chunk_id: chunk.id,
            generated_text: text,
            sources: Some(sources),
        })?;
        info!(
            "event=generate_chunk module=service status=ok project_id={} chunk_id={} industry={} duration_ms={}",
            project.id,
            chunk.id,
            industry,
            started_at.elapsed().as_millis()
        );
        Ok(generation)
    }

    fn require_project(&self, id: ProjectId) -> ServiceResult<Project> {
        self.projects
            .get_project(id)?
            .ok_or(ServiceError::Repo(RepoError::ProjectNotFound(id)))
    }

    fn require_chunk(&self, id: ProjectId, chunk_id: ChunkId) -> ServiceResult<ProjectChunk> {
        self.projects
            .get_chunk(id, chunk_id)?
            .ok_or(ServiceError::Repo(RepoError::ChunkNotFound {
                project_id: id,
                chunk_id,
            }))
    }
}

/// Union of the current generations' sources; later chunks win on key clashes.
fn merged_sources(latest: &BTreeMap<ChunkId, ChunkGeneration>) -> Vec<Source> {
    let mut generations: Vec<&ChunkGeneration> = latest.values().collect();
    generations.sort_by_key(|generation| (generation.created_at, generation.id));

    let mut by_key: BTreeMap<String, Source> = BTreeMap::new();
    for source in generations
        .into_iter()
        .filter_map(|generation| generation.sources.as_ref())
        .flatten()
    {
        by_key.insert(source.key.clone(), source.clone());
    }
    let mut merged: Vec<Source> = by_key.into_values().collect();
    merged.sort_by(|left, right| compare_source_keys(&left.key, &right.key));
    merged
}

fn file_safe_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "manuscript".to_string()
    } else {
        cleaned
    }
}
