//! Environment-driven settings.
//!
//! # Responsibility
//! - Read process environment (plus an optional `.env` file) into a typed
//!   [`Settings`] value once at startup.
//!
//! # Invariants
//! - Unset keys fall back to documented defaults.
//! - Set but malformed numeric values are errors, never silently defaulted.

use crate::generation::{GenerationMode, DEFAULT_BRAND_VOICE};
use crate::llm::DEFAULT_OPENAI_BASE_URL;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_DB_FILE: &str = "citeforge.db";
pub const DEFAULT_BRAND_PROMPT_PATH: &str = "prompts/prompt.txt";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SOURCES_FILE: &str = "sources.json";
pub const DEFAULT_DOMAIN: &str = "neuroscience";
pub const DEFAULT_MIN_CITATIONS: usize = 3;
pub const DEFAULT_MAX_SIMILARITY: f64 = 0.22;
pub const DEFAULT_SOURCES_PER_CHUNK: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                key,
                value,
                expected,
            } => write!(f, "invalid {key}=`{value}`; expected {expected}"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub brand_prompt_path: PathBuf,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub use_workflow: bool,
    /// `{"S1": "https://..."}` map used to link citations in saved edits.
    pub sources_file: PathBuf,
    pub min_citations_per_section: usize,
    /// Ledger similarity above this ratio is flagged as too close to the source.
    pub max_similarity_ratio: f64,
    pub domain: String,
    pub sources_per_chunk: usize,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = PathBuf::from(DEFAULT_DATA_DIR);
        Self {
            db_path: data_dir.join(DEFAULT_DB_FILE),
            data_dir,
            brand_prompt_path: PathBuf::from(DEFAULT_BRAND_PROMPT_PATH),
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            use_workflow: false,
            sources_file: PathBuf::from(DEFAULT_SOURCES_FILE),
            min_citations_per_section: DEFAULT_MIN_CITATIONS,
            max_similarity_ratio: DEFAULT_MAX_SIMILARITY,
            domain: DEFAULT_DOMAIN.to_string(),
            sources_per_chunk: DEFAULT_SOURCES_PER_CHUNK,
            log_level: None,
            log_dir: None,
        }
    }
}

impl Settings {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let data_dir = get("CITEFORGE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let db_path = get("CITEFORGE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(DEFAULT_DB_FILE));

        Ok(Self {
            db_path,
            brand_prompt_path: get("CITEFORGE_BRAND_PROMPT")
                .map(PathBuf::from)
                .unwrap_or(defaults.brand_prompt_path),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            use_workflow: get("USE_WORKFLOW").is_some_and(|value| is_truthy(&value)),
            sources_file: get("SOURCES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.sources_file),
            min_citations_per_section: parse_or(
                "CITEFORGE_MIN_CITATIONS",
                get("CITEFORGE_MIN_CITATIONS"),
                defaults.min_citations_per_section,
                "a non-negative integer",
            )?,
            max_similarity_ratio: parse_ratio(get("CITEFORGE_MAX_SIMILARITY"))?,
            domain: get("CITEFORGE_DOMAIN").unwrap_or(defaults.domain),
            sources_per_chunk: parse_or(
                "CITEFORGE_SOURCES_PER_CHUNK",
                get("CITEFORGE_SOURCES_PER_CHUNK"),
                defaults.sources_per_chunk,
                "a non-negative integer",
            )?,
            log_level: get("CITEFORGE_LOG_LEVEL"),
            log_dir: get("CITEFORGE_LOG_DIR").map(PathBuf::from),
            data_dir,
        })
    }

    pub fn generation_mode(&self) -> GenerationMode {
        GenerationMode::from_flag(self.use_workflow)
    }

    /// `<data_dir>/outputs`, where manuscripts land.
    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("outputs")
    }

    /// `<data_dir>/outputs/artifacts`, one subdirectory per project.
    pub fn artifacts_dir(&self) -> PathBuf {
        self.output_dir().join("artifacts")
    }

    /// Brand prompt file contents, or [`DEFAULT_BRAND_VOICE`] when unreadable or empty.
    pub fn brand_voice(&self) -> String {
        load_brand_voice(&self.brand_prompt_path)
    }
}

/// Reads a brand prompt file, falling back to [`DEFAULT_BRAND_VOICE`].
pub fn load_brand_voice(path: &Path) -> String {
    std::fs::read_to_string(path)
        .ok()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| DEFAULT_BRAND_VOICE.to_string())
}

/// `1`, `true` and `yes`, case-insensitive.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key,
            value,
            expected,
        }),
    }
}

fn parse_ratio(value: Option<String>) -> Result<f64, ConfigError> {
    const KEY: &str = "CITEFORGE_MAX_SIMILARITY";
    const EXPECTED: &str = "a number between 0 and 1";
    let ratio = parse_or(KEY, value.clone(), DEFAULT_MAX_SIMILARITY, EXPECTED)?;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(ConfigError::InvalidValue {
            key: KEY,
            value: value.unwrap_or_default(),
            expected: EXPECTED,
        });
    }
    Ok(ratio)
}

#[cfg(test)]
mod tests {
    use super::{is_truthy, load_brand_voice, ConfigError, Settings};
    use crate::generation::{GenerationMode, DEFAULT_BRAND_VOICE};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let settings = settings_from(&[]).expect("defaults should load");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.db_path, PathBuf::from("data").join("citeforge.db"));
        assert_eq!(settings.openai_model, "gpt-4o-mini");
        assert_eq!(settings.min_citations_per_section, 3);
        assert_eq!(settings.generation_mode(), GenerationMode::Single);
        assert_eq!(
            settings.artifacts_dir(),
            PathBuf::from("data").join("outputs").join("artifacts")
        );
    }

    #[test]
    fn overrides_are_applied() {
        let settings = settings_from(&[
            ("CITEFORGE_DATA_DIR", "/srv/cf"),
            ("OPENAI_API_KEY", " sk-test "),
            ("USE_WORKFLOW", "Yes"),
            ("CITEFORGE_MIN_CITATIONS", "2"),
            ("CITEFORGE_MAX_SIMILARITY", "0.5"),
            ("CITEFORGE_DOMAIN", "cardiology"),
            ("OPENAI_MODEL", ""),
        ])
        .expect("overrides should load");
        assert_eq!(settings.db_path, PathBuf::from("/srv/cf").join("citeforge.db"));
        assert_eq!(settings.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.generation_mode(), GenerationMode::Workflow);
        assert_eq!(settings.min_citations_per_section, 2);
        assert_eq!(settings.max_similarity_ratio, 0.5);
        assert_eq!(settings.domain, "cardiology");
        assert_eq!(settings.openai_model, "gpt-4o-mini");
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let error = settings_from(&[("CITEFORGE_MIN_CITATIONS", "three")])
            .expect_err("non-numeric should fail");
        assert!(error.to_string().contains("CITEFORGE_MIN_CITATIONS"));
        assert!(settings_from(&[("CITEFORGE_MAX_SIMILARITY", "1.5")]).is_err());
    }

    #[test]
    fn truthy_flags() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy(" yes "));
        assert!(!is_truthy("on"));
        assert!(!is_truthy("0"));
    }

    #[test]
    fn brand_voice_falls_back_when_missing_or_blank() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert_eq!(load_brand_voice(&dir.path().join("none.txt")), DEFAULT_BRAND_VOICE);

        let blank = dir.path().join("blank.txt");
        std::fs::write(&blank, "  \n").expect("write");
        assert_eq!(load_brand_voice(&blank), DEFAULT_BRAND_VOICE);

        let custom = dir.path().join("prompt.txt");
        std::fs::write(&custom, "Warm and direct.\n").expect("write");
        assert_eq!(load_brand_voice(&custom), "Warm and direct.");
    }
}
