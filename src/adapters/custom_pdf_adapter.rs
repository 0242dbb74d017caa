//! PDF-scoped fallback adapter.
//!
//! Corresponds to `crewai_tools/adapters/custom_pdf_adapter.py`.
//!
//! Queries only see content of the most recently added source.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::adapters::custom_adapter::{SimpleVectorStore, DEFAULT_SOURCE, NO_INFORMATION};
use crate::adapters::{render_matches, AddOptions, Adapter, ContentItem};
use crate::rag::error::Result;
use crate::rag::loaders::{BaseLoader, PdfLoader};
use crate::rag::source_content::SourceContent;

#[derive(Debug, Default)]
pub struct CustomPdfAdapter {
    pub vector_store: SimpleVectorStore,
    pub summarize: bool,
    src: RwLock<Option<String>>,
}

impl CustomPdfAdapter {
    pub fn new(summarize: bool) -> Self {
        Self {
            summarize,
            ..Self::default()
        }
    }

    /// The source queries are restricted to.
    pub fn current_source(&self) -> Option<String> {
        self.src.read().clone()
    }
}

#[async_trait]
impl Adapter for CustomPdfAdapter {
    async fn query(&self, _question: &str) -> Result<String> {
        let src = self.current_source();
        let matches = self
            .vector_store
            .search(src.as_deref())
            .into_iter()
            .map(|(content, _)| content)
            .collect();
        Ok(render_matches(matches, self.summarize, NO_INFORMATION))
    }

    async fn add(&self, items: &[ContentItem], options: &AddOptions) -> Result<()> {
        if items.is_empty() {
            *self.src.write() = None;
            return Ok(());
        }

        let loader = PdfLoader::new();
        for item in items {
            let mut source = item.source_ref();
            if source.is_empty() {
                source = DEFAULT_SOURCE.to_string();
            }
            let content = match loader
                .load(&SourceContent::new(&source), &options.load_options)
                .await
            {
                Ok(result) => result.content,
                Err(e) => {
                    log::warn!("Could not read PDF {}: {}", source, e);
                    format!("Content from PDF: {}", source)
                }
            };
            self.vector_store.add(&source, content);
            *self.src.write() = Some(source);
        }
        Ok(())
    }
}
