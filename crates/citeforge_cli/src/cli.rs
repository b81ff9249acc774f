//! Command-line interface definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

/// citeforge - citation-grounded article repurposing
#[derive(Parser)]
#[command(name = "citeforge")]
#[command(version)]
#[command(about = "Repurpose source text into cited articles and audit their claims", long_about = None)]
pub struct Cli {
    /// Override the SQLite database path (CITEFORGE_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and apply migrations
    InitDb,

    /// Print core health and version
    Health,

    /// Manage projects
    Project {
        #[command(subcommand)]
        action: ProjectCommands,
    },

    /// Replace a project's directions (brief)
    Directions {
        project_id: Uuid,
        /// New directions text
        text: String,
    },

    /// Re-split the project's source text into chunks
    Rechunk {
        project_id: Uuid,

        /// New chunk size in characters
        #[arg(long)]
        max_chars: Option<u32>,

        /// Replace the source text with this file's contents
        #[arg(long)]
        source_file: Option<PathBuf>,
    },

    /// Toggle whether a chunk is included in batch generation
    Toggle { project_id: Uuid, chunk_id: i64 },

    /// Generate cited text for one chunk
    Generate { project_id: Uuid, chunk_id: i64 },

    /// Generate cited text for every selected chunk
    GenerateBatch { project_id: Uuid },

    /// Save an edited generation and set chunk approval
    Save {
        project_id: Uuid,
        chunk_id: i64,

        #[command(flatten)]
        input: TextInput,

        /// Mark the chunk approved
        #[arg(long)]
        approved: bool,
    },

    /// Write final.md, sources.json and manuscripts, then log claims
    Assemble { project_id: Uuid },

    /// Show claim ledger rows for a project
    Ledger {
        project_id: Uuid,

        /// Maximum rows (newest first)
        #[arg(long, default_value_t = citeforge_core::repo::ledger_repo::DEFAULT_LEDGER_LIMIT)]
        limit: u32,
    },

    /// Inspect finished article files
    Article {
        #[command(subcommand)]
        action: ArticleCommands,
    },

    /// Query literature providers
    Sources {
        #[command(subcommand)]
        action: SourcesCommands,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a project and chunk its source text
    New {
        /// Project name (default: Untitled Project)
        #[arg(long, default_value = "")]
        name: String,

        /// Project brief; mentions of healthcare switch the industry focus
        #[arg(long, default_value = "")]
        directions: String,

        #[command(flatten)]
        input: TextInput,

        /// Chunk size in characters
        #[arg(long)]
        max_chars: Option<u32>,
    },

    /// List projects, newest first
    List,

    /// Show a project with its chunks and latest generations
    Show { project_id: Uuid },
}

#[derive(Subcommand)]
pub enum ArticleCommands {
    /// Print the parsed article as JSON
    Parse { file: PathBuf },

    /// Resolve citations and report policy issues
    Check {
        file: PathBuf,

        /// Minimum distinct sources per section (default: CITEFORGE_MIN_CITATIONS)
        #[arg(long)]
        min_citations: Option<usize>,

        /// Report paragraphs without any citation
        #[arg(long)]
        require_paragraph_citations: bool,
    },
}

#[derive(Subcommand)]
pub enum SourcesCommands {
    /// Search Europe PMC and PubMed for a topic
    Search {
        topic: String,

        /// Number of sources to collect
        #[arg(long)]
        need: Option<usize>,
    },
}

/// Inline text or a file to read it from.
#[derive(Args)]
#[group(required = false, multiple = false)]
pub struct TextInput {
    /// Text given inline
    #[arg(long)]
    pub text: Option<String>,

    /// Read text from a UTF-8 file
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl TextInput {
    pub fn read(&self) -> std::io::Result<String> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => std::fs::read_to_string(path),
            (None, None) => Ok(String::new()),
        }
    }
}
