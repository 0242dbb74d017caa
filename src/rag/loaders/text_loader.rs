//! Plain text loaders.
//!
//! Corresponds to `crewai_tools/rag/loaders/loaders.py`.

use async_trait::async_trait;

use crate::rag::error::LoadError;
use crate::rag::loaders::{read_text_file, BaseLoader, LoadOptions, LoaderResult};
use crate::rag::source_content::SourceContent;

/// Reads a local UTF-8 text file.
#[derive(Debug, Clone, Default)]
pub struct TextFileLoader;

impl TextFileLoader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BaseLoader for TextFileLoader {
    fn name(&self) -> &'static str {
        "TextFileLoader"
    }

    async fn load(
        &self,
        source: &SourceContent,
        _options: &LoadOptions,
    ) -> Result<LoaderResult, LoadError> {
        if !source.path_exists() {
            return Err(LoadError::not_found(
                &source.source_ref,
                format!("The following file does not exist: {}", source.source_ref),
            ));
        }
        let content = read_text_file(source).await?;
        Ok(LoaderResult::new(content, &source.source_ref))
    }
}

/// Treats the reference itself as the content.
#[derive(Debug, Clone, Default)]
pub struct TextLoader;

impl TextLoader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BaseLoader for TextLoader {
    fn name(&self) -> &'static str {
        "TextLoader"
    }

    async fn load(
        &self,
        source: &SourceContent,
        _options: &LoadOptions,
    ) -> Result<LoaderResult, LoadError> {
        Ok(LoaderResult::new(&source.source_ref, "raw"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::error::LoadErrorKind;

    #[tokio::test]
    async fn test_text_file_loader_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "line one\nline two").unwrap();

        let result = TextFileLoader::new()
            .load(&SourceContent::from_path(&path), &LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(result.content, "line one\nline two");
        assert_eq!(result.source, path.to_string_lossy());
    }

    #[tokio::test]
    async fn test_text_file_loader_reads_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "from a file url").unwrap();
        let url = url::Url::from_file_path(&path).unwrap();

        let result = TextFileLoader::new()
            .load(&SourceContent::new(url.as_str()), &LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(result.content, "from a file url");
        assert_eq!(result.source, url.as_str());
    }

    #[tokio::test]
    async fn test_text_file_loader_missing_file() {
        let err = TextFileLoader::new()
            .load(&SourceContent::new("/no/such/file.txt"), &LoadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::NotFound);
        assert_eq!(
            err.to_string(),
            "The following file does not exist: /no/such/file.txt"
        );
    }

    #[tokio::test]
    async fn test_text_loader_is_identity() {
        let result = TextLoader::new()
            .load(&SourceContent::new("hello world"), &LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(result.content, "hello world");
        assert_eq!(result.source, "raw");
    }
}
