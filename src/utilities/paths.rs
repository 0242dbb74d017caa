//! Storage locations.
//!
//! Port of crewai/utilities/paths.py

use std::env;
use std::path::{Path, PathBuf};

const APP_AUTHOR: &str = "CrewAI";
const FALLBACK_PROJECT: &str = "crewai_default";

/// Data directory for the current project, created if missing.
///
/// Linux: `~/.local/share/CrewAI/<project>`, macOS:
/// `~/Library/Application Support/CrewAI/<project>`, Windows:
/// `%LOCALAPPDATA%\CrewAI\<project>`.
pub fn db_storage_path() -> PathBuf {
    let dir = platform_data_dir(|key| env::var(key).ok()).join(get_project_directory_name());
    if let Err(e) = std::fs::create_dir_all(&dir) {
        log::warn!("Could not create storage directory {}: {}", dir.display(), e);
    }
    dir
}

/// `CREWAI_STORAGE_DIR`, else the name of the working directory.
pub fn get_project_directory_name() -> String {
    env::var("CREWAI_STORAGE_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            env::current_dir()
                .ok()
                .as_deref()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().to_string())
        })
        .unwrap_or_else(|| FALLBACK_PROJECT.to_string())
}

fn platform_data_dir<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let home = || PathBuf::from(lookup("HOME").unwrap_or_else(|| "/tmp".to_string()));
    let base = if cfg!(target_os = "macos") {
        home().join("Library").join("Application Support")
    } else if cfg!(target_os = "windows") {
        lookup("LOCALAPPDATA")
            .or_else(|| lookup("APPDATA"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("C:\\tmp"))
    } else if cfg!(unix) {
        home().join(".local").join("share")
    } else {
        PathBuf::from("/tmp")
    };
    base.join(APP_AUTHOR)
}
