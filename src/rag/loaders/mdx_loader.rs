//! MDX / Markdown loader.
//!
//! Corresponds to `crewai_tools/rag/loaders/mdx_loader.py`.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::rag::error::LoadError;
use crate::rag::loaders::{metadata_of, resolve_text_source, BaseLoader, LoadOptions, LoaderResult};
use crate::rag::source_content::SourceContent;

const ACCEPT: &str = "text/markdown, text/x-markdown, text/plain";

static IMPORT_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^import\s+.*?\n").unwrap());
static EXPORT_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^export\s+.*?\n").unwrap());
static JSX_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n\s*\n").unwrap());

#[derive(Debug, Clone, Default)]
pub struct MdxLoader;

impl MdxLoader {
    pub fn new() -> Self {
        Self
    }

    /// Strip module statements and JSX tags, leaving the prose.
    pub fn clean(content: &str) -> String {
        let cleaned = IMPORT_LINE.replace_all(content, "");
        let cleaned = EXPORT_LINE.replace_all(&cleaned, "");
        let cleaned = JSX_TAG.replace_all(&cleaned, "");
        let cleaned = BLANK_RUN.replace_all(&cleaned, "\n\n");
        cleaned.trim().to_string()
    }
}

#[async_trait]
impl BaseLoader for MdxLoader {
    fn name(&self) -> &'static str {
        "MDXLoader"
    }

    async fn load(
        &self,
        source: &SourceContent,
        options: &LoadOptions,
    ) -> Result<LoaderResult, LoadError> {
        let (content, source_label) =
            resolve_text_source(source, options, self.name(), ACCEPT, "mdx_string").await?;
        let metadata = metadata_of([("format", json!("mdx"))]);
        Ok(LoaderResult::new(Self::clean(&content), source_label).with_metadata(metadata))
    }
}
