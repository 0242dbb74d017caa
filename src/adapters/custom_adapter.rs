//! Dependency-free fallback adapter.
//!
//! Corresponds to `crewai_tools/adapters/custom_adapter.py`.

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::adapters::{render_matches, AddOptions, Adapter, ContentItem};
use crate::rag::error::Result;

/// Source used when an item names none.
pub const DEFAULT_SOURCE: &str = "default";

/// Answer returned when the store holds nothing to match.
pub const NO_INFORMATION: &str = "No relevant information found.";

/// In-memory mapping from source to the contents added under it.
///
/// "Search" is a scan: every stored content matches with score 1.0, in
/// insertion order of sources and then of contents.
#[derive(Debug, Default)]
pub struct SimpleVectorStore {
    data: RwLock<Vec<(String, Vec<String>)>>,
}

impl SimpleVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `content` under `source`.
    pub fn add(&self, source: &str, content: impl Into<String>) {
        let mut data = self.data.write();
        match data.iter_mut().find(|(s, _)| s == source) {
            Some((_, contents)) => contents.push(content.into()),
            None => data.push((source.to_string(), vec![content.into()])),
        }
    }

    /// All contents, or only those under `source` when given.
    pub fn search(&self, source: Option<&str>) -> Vec<(String, f64)> {
        let data = self.data.read();
        data.iter()
            .filter(|(s, _)| source.map_or(true, |wanted| s == wanted))
            .flat_map(|(_, contents)| contents.iter().map(|c| (c.clone(), 1.0)))
            .collect()
    }

    /// Number of stored contents.
    pub fn len(&self) -> usize {
        self.data.read().iter().map(|(_, c)| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Adapter over a [`SimpleVectorStore`].
///
/// Record items append their `content` under their `source`. Text and path
/// items are positional: the first names the source and the second is the
/// content, so `["notes", "rust is fast"]` stores `"rust is fast"` under
/// `"notes"`. A lone positional item is a source without content. Empty
/// content is ignored.
#[derive(Debug, Default)]
pub struct CustomAdapter {
    pub vector_store: SimpleVectorStore,
    /// Return only the first match.
    pub summarize: bool,
}

impl CustomAdapter {
    pub fn new(summarize: bool) -> Self {
        Self {
            vector_store: SimpleVectorStore::new(),
            summarize,
        }
    }

    fn store(&self, source: &str, content: &str) {
        if !content.is_empty() {
            self.vector_store.add(source, content);
        }
    }
}

#[async_trait]
impl Adapter for CustomAdapter {
    async fn query(&self, _question: &str) -> Result<String> {
        let matches = self
            .vector_store
            .search(None)
            .into_iter()
            .map(|(content, _)| content)
            .collect();
        Ok(render_matches(matches, self.summarize, NO_INFORMATION))
    }

    async fn add(&self, items: &[ContentItem], _options: &AddOptions) -> Result<()> {
        let mut positional = Vec::new();
        for item in items {
            match item {
                ContentItem::Record {
                    source, content, ..
                } => self.store(
                    source.as_deref().unwrap_or(DEFAULT_SOURCE),
                    content.as_deref().unwrap_or_default(),
                ),
                other => positional.push(other.source_ref()),
            }
        }
        if positional.len() > 2 {
            log::debug!(
                "CustomAdapter ignores {} positional items after source and content",
                positional.len() - 2
            );
        }
        let mut positional = positional.into_iter();
        if let Some(source) = positional.next() {
            self.store(&source, &positional.next().unwrap_or_default());
        }
        Ok(())
    }
}
