//! Format-specific content loaders.
//!
//! Corresponds to `crewai_tools/rag/loaders/` and
//! `crewai_tools/rag/base_loader.py`.
//!
//! Every loader turns one content reference into a normalized
//! [`LoaderResult`]. Routing is shared: a URL is fetched over HTTP, an
//! existing path is read from disk, anything else is treated as inline
//! content.

pub mod csv_loader;
pub mod directory_loader;
pub mod docx_loader;
pub mod http;
pub mod json_loader;
pub mod mdx_loader;
pub mod pdf_loader;
pub mod text_loader;
pub mod webpage_loader;
pub mod xml_loader;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::rag::error::LoadError;
use crate::rag::source_content::SourceContent;

pub use csv_loader::CsvLoader;
pub use directory_loader::{DirectoryLoadReport, DirectoryLoader, LoadFailure};
pub use docx_loader::DocxLoader;
pub use json_loader::JsonLoader;
pub use mdx_loader::MdxLoader;
pub use pdf_loader::PdfLoader;
pub use text_loader::{TextFileLoader, TextLoader};
pub use webpage_loader::WebPageLoader;
pub use xml_loader::XmlLoader;

// ---------------------------------------------------------------------------
// LoaderResult
// ---------------------------------------------------------------------------

/// Normalized output of ingesting one content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderResult {
    /// Extracted text.
    pub content: String,
    /// Origin of the content.
    #[serde(default = "default_source")]
    pub source: String,
    /// Format-specific details (row counts, page counts, parse errors, ...).
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Stable identifier, set by loaders that hash their output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
}

fn default_source() -> String {
    "unknown".to_string()
}

impl LoaderResult {
    /// Create a result with empty metadata.
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            metadata: HashMap::new(),
            doc_id: None,
        }
    }

    /// Builder: set metadata.
    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Builder: set the document id.
    pub fn with_doc_id(mut self, doc_id: impl Into<String>) -> Self {
        self.doc_id = Some(doc_id.into());
        self
    }
}

// ---------------------------------------------------------------------------
// LoadOptions
// ---------------------------------------------------------------------------

/// Per-call loader options (the Python `**kwargs`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadOptions {
    /// HTTP headers replacing the loader's default `Accept`/`User-Agent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// Source label for inline content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// PDF pages to extract, 0-indexed. `None` extracts every page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<usize>>,
    /// Password for encrypted PDFs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Record structured-format parse failures in metadata instead of failing.
    #[serde(default)]
    pub lenient_parse: bool,
}

impl LoadOptions {
    /// Builder: label inline content.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Builder: restrict PDF extraction to the given 0-indexed pages.
    pub fn with_pages(mut self, pages: Vec<usize>) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Builder: PDF password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Builder: capture parse errors in metadata.
    pub fn lenient(mut self) -> Self {
        self.lenient_parse = true;
        self
    }
}

// ---------------------------------------------------------------------------
// BaseLoader
// ---------------------------------------------------------------------------

/// A loader turns a content reference into a [`LoaderResult`].
///
/// Corresponds to `crewai_tools.rag.base_loader.BaseLoader`.
#[async_trait]
pub trait BaseLoader: Send + Sync {
    /// Loader name, used in logs and the HTTP `User-Agent`.
    fn name(&self) -> &'static str;

    /// Load and normalize one content item.
    async fn load(
        &self,
        source: &SourceContent,
        options: &LoadOptions,
    ) -> Result<LoaderResult, LoadError>;
}

/// Deterministic document id: SHA-256 over the source followed by the content.
pub fn generate_doc_id(source: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Read a local text file as UTF-8.
pub(crate) async fn read_text_file(source: &SourceContent) -> Result<String, LoadError> {
    tokio::fs::read_to_string(source.as_path())
        .await
        .map_err(|e| LoadError::io(&source.source_ref, &e))
}

/// Fetch-or-read routing shared by the text-based structured loaders.
///
/// Returns the raw text and the source label to report.
pub(crate) async fn resolve_text_source(
    source: &SourceContent,
    options: &LoadOptions,
    loader_name: &str,
    accept: &str,
    inline_label: &str,
) -> Result<(String, String), LoadError> {
    if source.is_url() {
        let text = http::fetch_text(&source.source_ref, options, loader_name, accept).await?;
        Ok((text, source.source_ref.clone()))
    } else if source.path_exists() {
        let text = read_text_file(source).await?;
        Ok((text, source.source_ref.clone()))
    } else {
        let label = options
            .source
            .clone()
            .unwrap_or_else(|| inline_label.to_string());
        Ok((source.source_ref.clone(), label))
    }
}

/// Metadata map from `(key, value)` pairs.
pub(crate) fn metadata_of<I>(pairs: I) -> HashMap<String, Value>
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_doc_id_is_stable() {
        let a = generate_doc_id("a.pdf", "hello");
        let b = generate_doc_id("a.pdf", "hello");
        let c = generate_doc_id("a.pdf", "hello!");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_loader_result_default_source() {
        let result: LoaderResult = serde_json::from_str(r#"{"content": "x"}"#).unwrap();
        assert_eq!(result.source, "unknown");
        assert!(result.metadata.is_empty());
        assert!(result.doc_id.is_none());
    }

    #[tokio::test]
    async fn test_resolve_text_source_inline_label() {
        let source = SourceContent::new("a,b\n1,2");
        let (text, label) =
            resolve_text_source(&source, &LoadOptions::default(), "CSVLoader", "text/csv", "csv_string")
                .await
                .unwrap();
        assert_eq!(text, "a,b\n1,2");
        assert_eq!(label, "csv_string");

        let opts = LoadOptions::default().with_source("inline.csv");
        let (_, label) = resolve_text_source(&source, &opts, "CSVLoader", "text/csv", "csv_string")
            .await
            .unwrap();
        assert_eq!(label, "inline.csv");
    }
}
