//! `sources.json` and link-map files.

use super::SourceError;
use crate::model::source::{compare_source_keys, Source};
use log::warn;
use std::collections::BTreeMap;
use std::path::Path;

/// Reads a JSON array of sources.
///
/// Missing keys become `S{position}` (1-based); the result is sorted by key
/// number so `S2` precedes `S10`.
pub fn load_sources_json(path: impl AsRef<Path>) -> Result<Vec<Source>, SourceError> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let mut sources: Vec<Source> = serde_json::from_str(&raw)?;
    for (index, source) in sources.iter_mut().enumerate() {
        if source.key.trim().is_empty() {
            source.key = format!("S{}", index + 1);
        }
        if source.title.trim().is_empty() {
            source.title = "Untitled".to_string();
        }
    }
    sources.sort_by(|left, right| compare_source_keys(&left.key, &right.key));
    Ok(sources)
}

/// Writes `sources` as pretty JSON, creating parent directories.
pub fn write_sources_json(path: impl AsRef<Path>, sources: &[Source]) -> Result<(), SourceError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(sources)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Reads a `{"S1": "https://..."}` map. Missing or unreadable files give an empty map.
pub fn load_link_map(path: impl AsRef<Path>) -> BTreeMap<String, String> {
    let path = path.as_ref();
    if !path.exists() {
        return BTreeMap::new();
    }
    let parsed = std::fs::read_to_string(path)
        .map_err(SourceError::from)
        .and_then(|raw| serde_json::from_str(&raw).map_err(SourceError::from));
    match parsed {
        Ok(map) => map,
        Err(err) => {
            warn!(
                "event=link_map_load module=sources status=error path={} error={}",
                path.display(),
                err
            );
            BTreeMap::new()
        }
    }
}
