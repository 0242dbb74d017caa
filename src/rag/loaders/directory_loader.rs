//! Recursive directory loader.
//!
//! Walks a directory tree, resolves a [`DataType`] and loader per file and
//! loads every file it can. Dot-files and dot-directories are skipped. A
//! file that fails to load is logged and recorded in the report; the walk
//! always continues.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::json;
use walkdir::WalkDir;

use crate::rag::data_types::{DataType, DataTypes};
use crate::rag::error::{LoadError, LoadErrorKind};
use crate::rag::loaders::{metadata_of, BaseLoader, LoadOptions, LoaderResult};
use crate::rag::source_content::SourceContent;

/// One successfully loaded file.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub data_type: DataType,
    pub result: LoaderResult,
}

/// One file that could not be loaded.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: LoadError,
}

/// Outcome of loading a directory tree.
#[derive(Debug, Clone, Default)]
pub struct DirectoryLoadReport {
    pub results: Vec<LoadedFile>,
    pub failures: Vec<LoadFailure>,
}

impl DirectoryLoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryLoader;

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

impl DirectoryLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load every visible file under `dir`, in path order.
    pub async fn load_all(
        &self,
        dir: &Path,
        options: &LoadOptions,
    ) -> Result<DirectoryLoadReport, LoadError> {
        let dir_ref = dir.to_string_lossy().to_string();
        if !dir.is_dir() {
            return Err(LoadError::not_found(
                &dir_ref,
                format!("Directory does not exist: {}", dir_ref),
            ));
        }

        // Per-file loads only inherit the parse policy; paging, passwords
        // and labels belong to single-item loads.
        let file_options = LoadOptions {
            lenient_parse: options.lenient_parse,
            ..LoadOptions::default()
        };

        let mut report = DirectoryLoadReport::default();
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                    log::warn!("Error walking {}: {}", path.display(), e);
                    report.failures.push(LoadFailure {
                        error: LoadError::new(
                            LoadErrorKind::Io,
                            path.to_string_lossy(),
                            e.to_string(),
                        ),
                        path,
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            let data_type = DataTypes::from_path(&path);
            let loader = data_type.get_loader();
            match loader.load(&SourceContent::from_path(&path), &file_options).await {
                Ok(result) => report.results.push(LoadedFile {
                    path,
                    data_type,
                    result,
                }),
                Err(error) => {
                    log::warn!("Error processing {}: {}", path.display(), error);
                    report.failures.push(LoadFailure { path, error });
                }
            }
        }

        log::info!(
            "Loaded {} files from {} ({} failed)",
            report.results.len(),
            dir_ref,
            report.failures.len()
        );
        Ok(report)
    }
}

#[async_trait]
impl BaseLoader for DirectoryLoader {
    fn name(&self) -> &'static str {
        "DirectoryLoader"
    }

    async fn load(
        &self,
        source: &SourceContent,
        options: &LoadOptions,
    ) -> Result<LoaderResult, LoadError> {
        let report = self.load_all(&source.as_path(), options).await?;

        let content = report
            .results
            .iter()
            .filter(|f| !f.result.content.trim().is_empty())
            .map(|f| format!("File: {}\n{}", f.path.display(), f.result.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        let failed: Vec<String> = report
            .failures
            .iter()
            .map(|f| f.path.to_string_lossy().into_owned())
            .collect();

        let metadata = metadata_of([
            ("format", json!("directory")),
            ("file_count", json!(report.results.len())),
            ("failed_files", json!(failed)),
        ]);
        Ok(LoaderResult::new(content, &source.source_ref).with_metadata(metadata))
    }
}
