//! Command execution against citeforge core.

use crate::cli::{ArticleCommands, Commands, ProjectCommands, SourcesCommands, TextInput};
use citeforge_core::article::{parse_article, resolve_citations, validate_article, ArticlePolicy};
use citeforge_core::db::schema_version;
use citeforge_core::llm::OpenAiClient;
use citeforge_core::repo::ledger_repo::SqliteLedgerRepository;
use citeforge_core::repo::project_repo::SqliteProjectRepository;
use citeforge_core::sources::{build_sources, default_providers, format_reference};
use citeforge_core::{open_db, DbError, NewProject, ProjectService, ServiceError, Settings};
use std::fmt;
use std::path::PathBuf;

const FLAG_SNIPPET_CHARS: usize = 80;

#[derive(Debug)]
pub enum CliError {
    Db(DbError),
    Service(ServiceError),
    Io { path: PathBuf, source: std::io::Error },
    Json(serde_json::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Db(err) => write!(f, "database error: {err}"),
            Self::Service(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for CliError {}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ServiceError> for CliError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

fn read_file(path: &PathBuf) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.clone(),
        source,
    })
}

fn read_input(input: &TextInput) -> Result<String, CliError> {
    input.read().map_err(|source| CliError::Io {
        path: input.file.clone().unwrap_or_default(),
        source,
    })
}

/// Runs one command. Returns the process exit code.
pub fn execute(command: Commands, settings: &Settings) -> Result<i32, CliError> {
    match command {
        Commands::InitDb => {
            let conn = open_db(&settings.db_path)?;
            println!(
                "database ready: {} (schema v{})",
                settings.db_path.display(),
                schema_version(&conn)?
            );
            Ok(0)
        }
        Commands::Health => {
            println!(
                "ok ping={} version={}",
                citeforge_core::ping(),
                citeforge_core::core_version()
            );
            Ok(0)
        }
        Commands::Article { action } => run_article(action, settings),
        Commands::Sources {
            action: SourcesCommands::Search { topic, need },
        } => {
            let sources = build_sources(
                &topic,
                &settings.domain,
                need.unwrap_or(settings.sources_per_chunk),
                &default_providers(),
            );
            if sources.is_empty() {
                println!("no sources found");
            }
            for source in &sources {
                println!("{}", format_reference(source));
            }
            Ok(0)
        }
        Commands::Project { action } => with_service(settings, |service| {
            run_project(action, service)
        }),
        Commands::Directions { project_id, text } => with_service(settings, |service| {
            service.update_directions(project_id, &text)?;
            println!("directions updated");
            Ok(0)
        }),
        Commands::Rechunk {
            project_id,
            max_chars,
            source_file,
        } => {
            let source_text = source_file.as_ref().map(read_file).transpose()?;
            with_service(settings, |service| {
                let chunks = service.rechunk(project_id, max_chars, source_text.as_deref())?;
                println!("re-chunked into {} chunks", chunks.len());
                Ok(0)
            })
        }
        Commands::Toggle {
            project_id,
            chunk_id,
        } => with_service(settings, |service| {
            let selected = service.toggle_select(project_id, chunk_id)?;
            println!("chunk {chunk_id} selected={selected}");
            Ok(0)
        }),
        Commands::Generate {
            project_id,
            chunk_id,
        } => with_service(settings, |service| {
            let generation = service.generate_for_chunk(project_id, chunk_id)?;
            println!("{}", generation.generated_text);
            Ok(0)
        }),
        Commands::GenerateBatch { project_id } => with_service(settings, |service| {
            let count = service.generate_batch(project_id)?;
            println!("generated text for {count} chunks");
            Ok(0)
        }),
        Commands::Save {
            project_id,
            chunk_id,
            input,
            approved,
        } => {
            let text = read_input(&input)?;
            with_service(settings, |service| {
                let saved = service.save_generation(project_id, chunk_id, &text, approved)?;
                println!(
                    "saved chunk {chunk_id} (new generation: {}, approved: {approved})",
                    saved.is_some()
                );
                Ok(0)
            })
        }
        Commands::Assemble { project_id } => with_service(settings, |service| {
            let outcome = service.assemble(project_id)?;
            println!("draft: {}", outcome.final_md.display());
            println!(
                "sources: {} ({})",
                outcome.sources_json.display(),
                outcome.sources
            );
            println!("manuscript: {}", outcome.manuscript.display());
            println!("clean manuscript: {}", outcome.clean_manuscript.display());
            println!("ledger rows logged: {}", outcome.ledger_rows);
            println!(
                "similarity report: {} ({} flagged above {:.2})",
                outcome.similarity_report.display(),
                outcome.flagged.len(),
                settings.max_similarity_ratio
            );
            for flag in &outcome.flagged {
                let snippet: String = flag.claim_text.chars().take(FLAG_SNIPPET_CHARS).collect();
                println!(
                    "  [{}] {} | similarity={:.2} | {snippet}",
                    flag.source_key, flag.section, flag.score
                );
            }
            Ok(0)
        }),
        Commands::Ledger { project_id, limit } => with_service(settings, |service| {
            for entry in service.ledger(project_id, limit)? {
                let score = entry
                    .similarity_score
                    .map(|score| format!("{score:.2}"))
                    .unwrap_or_else(|| "-".to_string());
                let flag = match entry.similarity_score {
                    Some(score) if score > settings.max_similarity_ratio => " HIGH",
                    _ => "",
                };
                println!(
                    "[{}] {} | similarity={score}{flag} | {}",
                    entry.source_key, entry.section, entry.snippet
                );
            }
            Ok(0)
        }),
    }
}

fn run_article(action: ArticleCommands, settings: &Settings) -> Result<i32, CliError> {
    match action {
        ArticleCommands::Parse { file } => {
            let article = parse_article(&read_file(&file)?);
            println!("{}", serde_json::to_string_pretty(&article)?);
            Ok(0)
        }
        ArticleCommands::Check {
            file,
            min_citations,
            require_paragraph_citations,
        } => {
            let article = parse_article(&read_file(&file)?);
            let policy = ArticlePolicy {
                min_citations_per_section: min_citations
                    .unwrap_or(settings.min_citations_per_section),
                require_paragraph_citations,
            };
            let resolution = resolve_citations(&article);
            let issues = validate_article(&article, &policy);

            println!(
                "sections={} sources={} annotations={} citations_resolved={} unresolved={}",
                article.sections.len(),
                article.source_count(),
                article.annotations().len(),
                resolution.resolved.len(),
                resolution.unresolved.len()
            );
            for issue in &issues {
                println!("- {issue}");
            }
            Ok(if issues.is_empty() { 0 } else { 2 })
        }
    }
}

type CliService<'conn> =
    ProjectService<SqliteProjectRepository<'conn>, SqliteLedgerRepository<'conn>>;

/// Opens the database and runs `f` against a service wired to OpenAI and the
/// default literature providers.
fn with_service<F>(settings: &Settings, f: F) -> Result<i32, CliError>
where
    F: for<'conn> FnOnce(&CliService<'conn>) -> Result<i32, CliError>,
{
    let conn = open_db(&settings.db_path)?;
    let service = ProjectService::new(
        SqliteProjectRepository::new(&conn),
        SqliteLedgerRepository::new(&conn),
        settings,
        Box::new(OpenAiClient::new(
            settings.openai_api_key.clone(),
            settings.openai_base_url.clone(),
        )),
        default_providers(),
    );
    f(&service)
}

fn run_project(action: ProjectCommands, service: &CliService<'_>) -> Result<i32, CliError> {
    match action {
        ProjectCommands::New {
            name,
            directions,
            input,
            max_chars,
        } => {
            let detail = service.create_project(&NewProject {
                name,
                directions,
                source_text: read_input(&input)?,
                max_chars,
                brand_prompt: None,
            })?;
            println!(
                "created project {} \"{}\" with {} chunks",
                detail.project.id,
                detail.project.name,
                detail.chunks.len()
            );
        }
        ProjectCommands::List => {
            for project in service.list_projects()? {
                println!(
                    "{}  {}  max_chars={}",
                    project.id, project.name, project.max_chars
                );
            }
        }
        ProjectCommands::Show { project_id } => {
            let detail = service.project_detail(project_id)?;
            let project = &detail.project;
            println!("{} ({})", project.name, project.id);
            println!("directions: {}", project.directions);
            println!("max_chars: {}", project.max_chars);
            for chunk in &detail.chunks {
                let generated = detail
                    .latest
                    .get(&chunk.id)
                    .map(|generation| generation.generated_text.chars().count())
                    .unwrap_or(0);
                println!(
                    "  #{} id={} selected={} approved={} chars={} generated_chars={}",
                    chunk.order_index + 1,
                    chunk.id,
                    chunk.selected,
                    chunk.approved,
                    chunk.source_text.chars().count(),
                    generated
                );
            }
        }
    }
    Ok(0)
}
