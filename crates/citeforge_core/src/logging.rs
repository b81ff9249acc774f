//! Process-wide logging for the CLI and library.
//!
//! `flexi_logger` is started at most once. Later calls with the same level and
//! target are no-ops; anything else is an error, since the backend cannot be
//! re-pointed after start.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, FlexiLoggerError, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const LOG_BASENAME: &str = "citeforge";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED: usize = 5;
const PANIC_MESSAGE_CHARS: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Size-rotated `citeforge*.log` files in this directory.
    Directory(PathBuf),
    Stderr,
}

impl Display for LogTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory(dir) => write!(f, "{}", dir.display()),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

#[derive(Debug)]
pub enum LoggingError {
    InvalidLevel(String),
    EmptyDirectory,
    Directory { path: PathBuf, source: std::io::Error },
    Backend(FlexiLoggerError),
    /// Already running with another configuration.
    Conflict { active: String, requested: String },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::EmptyDirectory => write!(f, "log directory cannot be empty"),
            Self::Directory { path, source } => {
                write!(f, "cannot use log directory {}: {source}", path.display())
            }
            Self::Backend(err) => write!(f, "logger failed to start: {err}"),
            Self::Conflict { active, requested } => write!(
                f,
                "logging already runs as {active}; cannot switch to {requested}"
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Directory { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

struct ActiveLogger {
    level: LevelFilter,
    target: LogTarget,
    _handle: LoggerHandle,
}

impl ActiveLogger {
    fn describe(level: LevelFilter, target: &LogTarget) -> String {
        format!("{}@{target}", level.as_str().to_ascii_lowercase())
    }
}

/// Starts logging at `level` (`trace`..`error`, `warning` accepted) to `target`.
///
/// Relative directories are resolved against the working directory.
pub fn init_logging(level: &str, target: LogTarget) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    let target = match target {
        LogTarget::Directory(dir) => LogTarget::Directory(resolve_dir(&dir)?),
        LogTarget::Stderr => LogTarget::Stderr,
    };

    let active = ACTIVE.get_or_try_init(|| start(level, &target))?;
    if active.level != level || active.target != target {
        return Err(LoggingError::Conflict {
            active: ActiveLogger::describe(active.level, &active.target),
            requested: ActiveLogger::describe(level, &target),
        });
    }
    Ok(())
}

/// Active `(level, target)`, if logging was started.
pub fn logging_status() -> Option<(&'static str, LogTarget)> {
    ACTIVE
        .get()
        .map(|active| (level_name(active.level), active.target.clone()))
}

/// Level used when none is configured: `debug` in debug builds, else `info`.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(level: LevelFilter, target: &LogTarget) -> Result<ActiveLogger, LoggingError> {
    let logger = Logger::try_with_str(level_name(level)).map_err(LoggingError::Backend)?;
    let handle = match target {
        LogTarget::Directory(dir) => {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
                path: dir.clone(),
                source,
            })?;
            logger
                .log_to_file(FileSpec::default().directory(dir).basename(LOG_BASENAME))
                .rotate(
                    Criterion::Size(ROTATE_AT_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(KEEP_ROTATED),
                )
                .write_mode(WriteMode::BufferAndFlush)
                .append()
                .format_for_files(flexi_logger::detailed_format)
                .start()
        }
        LogTarget::Stderr => logger
            .log_to_stderr()
            .format_for_stderr(flexi_logger::default_format)
            .start(),
    }
    .map_err(LoggingError::Backend)?;

    route_panics_to_log();
    info!(
        "event=logging_start module=core status=ok level={} target={target} version={} os={}",
        level_name(level),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );

    Ok(ActiveLogger {
        level,
        target: target.clone(),
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<LevelFilter, LoggingError> {
    let trimmed = level.trim();
    let candidate = if trimmed.eq_ignore_ascii_case("warning") {
        "warn"
    } else {
        trimmed
    };
    match LevelFilter::from_str(candidate) {
        Ok(LevelFilter::Off) | Err(_) => Err(LoggingError::InvalidLevel(trimmed.to_string())),
        Ok(filter) => Ok(filter),
    }
}

fn level_name(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::Trace => "trace",
        LevelFilter::Debug => "debug",
        LevelFilter::Info => "info",
        LevelFilter::Warn => "warn",
        LevelFilter::Error | LevelFilter::Off => "error",
    }
}

fn resolve_dir(dir: &Path) -> Result<PathBuf, LoggingError> {
    if dir.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(LoggingError::EmptyDirectory);
    }
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(dir))
        .map_err(|source| LoggingError::Directory {
            path: dir.to_path_buf(),
            source,
        })
}

/// Logs panics before the default hook prints them.
fn route_panics_to_log() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let location = panic
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=core status=error location={location} message={}",
            one_line(&payload, PANIC_MESSAGE_CHARS)
        );
        previous(panic);
    }));
}

/// Flattens newlines and caps the text at `max_chars`, marking the cut with `...`.
fn one_line(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, logging_status, one_line, parse_level, resolve_dir, LogTarget, LoggingError,
    };
    use log::LevelFilter;
    use std::path::Path;

    #[test]
    fn parse_level_accepts_aliases_and_rejects_off() {
        assert_eq!(parse_level(" INFO ").unwrap(), LevelFilter::Info);
        assert_eq!(parse_level("Warning").unwrap(), LevelFilter::Warn);
        assert!(matches!(parse_level("off"), Err(LoggingError::InvalidLevel(_))));
        assert!(matches!(parse_level("verbose"), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn relative_directories_resolve_against_cwd() {
        let resolved = resolve_dir(Path::new("logs/dev")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("logs/dev"));
        assert!(matches!(resolve_dir(Path::new(" ")), Err(LoggingError::EmptyDirectory)));
    }

    #[test]
    fn one_line_flattens_and_truncates() {
        assert_eq!(one_line("a\nb\rc", 10), "a b c");
        assert_eq!(one_line("abcdefghij", 4), "abcd...");
    }

    #[test]
    fn second_init_must_match_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let target = LogTarget::Directory(dir.path().to_path_buf());

        init_logging("info", target.clone()).unwrap();
        init_logging("INFO", target.clone()).unwrap();

        assert!(matches!(
            init_logging("debug", target.clone()),
            Err(LoggingError::Conflict { .. })
        ));
        assert!(matches!(
            init_logging("info", LogTarget::Directory(other.path().to_path_buf())),
            Err(LoggingError::Conflict { .. })
        ));
        assert!(matches!(
            init_logging("info", LogTarget::Stderr),
            Err(LoggingError::Conflict { .. })
        ));

        assert_eq!(logging_status(), Some(("info", target)));
    }
}
