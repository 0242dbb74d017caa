//! Full local RAG pipeline adapter.
//!
//! Corresponds to `crewai_tools/rag/core.py` (`CustomRAGAdapter`).
//!
//! `add` loads each item, splits it with the [`TextChunker`], embeds all
//! chunks in one batch and upserts them with `chunk_index`, `data_type` and
//! `source` metadata. `query` embeds the question and renders the top-k hits
//! as `[Source: s, Relevance: 0.000]` blocks.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::adapters::{AddOptions, Adapter, ContentItem};
use crate::rag::chunker::TextChunker;
use crate::rag::config::{EmbedderConfig, RagToolConfig};
use crate::rag::data_types::{DataType, DataTypes};
use crate::rag::embeddings::{build_embedder, EmbeddingService};
use crate::rag::error::Result;
use crate::rag::factory::create_store;
use crate::rag::loaders::{BaseLoader, DirectoryLoader};
use crate::rag::source_content::SourceContent;
use crate::rag::storage::{MetadataFilter, StoredRecord, VectorStore};

/// Embedding model the adapter defaults to.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-large";

/// Source recorded for inline text without a `source` metadata entry.
pub const TEXT_INPUT_SOURCE: &str = "text_input";

/// Answer returned when a query finds nothing.
pub const NO_CONTENT: &str = "No relevant content found.";

/// One chunk ready to be embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub data_type: DataType,
    #[serde(default)]
    pub source: Option<String>,
}

impl Document {
    /// A document with a fresh random id.
    pub fn new(content: impl Into<String>, data_type: DataType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            metadata: HashMap::new(),
            data_type,
            source: None,
        }
    }

    fn into_record(self, embedding: Vec<f32>) -> StoredRecord {
        let mut metadata = self.metadata;
        metadata.insert("data_type".to_string(), Value::from(self.data_type.as_str()));
        metadata.insert(
            "source".to_string(),
            Value::from(self.source.unwrap_or_else(|| "unknown".to_string())),
        );
        StoredRecord::new(self.id, self.content, metadata, embedding)
    }
}

/// Summary returned by [`CustomRagAdapter::get_collection_info`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub count: usize,
    pub embedding_model: String,
}

/// Text of one item before chunking.
struct LoadedText {
    text: String,
    source: String,
    data_type: DataType,
    metadata: HashMap<String, Value>,
}

pub struct CustomRagAdapter {
    pub collection_name: String,
    /// Directory of the SQLite store; `None` keeps everything in memory.
    pub persist_directory: Option<PathBuf>,
    pub embedding_model: String,
    pub summarize: bool,
    pub top_k: usize,
    pub embedding_config: EmbedderConfig,
    store: Arc<dyn VectorStore>,
    embedder: EmbeddingService,
    chunker: TextChunker,
}

impl std::fmt::Debug for CustomRagAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomRagAdapter")
            .field("collection_name", &self.collection_name)
            .field("persist_directory", &self.persist_directory)
            .field("embedding_model", &self.embedding_model)
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl CustomRagAdapter {
    /// Configuration this adapter uses when nothing else is given.
    pub fn default_config() -> RagToolConfig {
        RagToolConfig {
            embedder: EmbedderConfig::new("openai", DEFAULT_EMBEDDING_MODEL),
            ..RagToolConfig::default()
        }
    }

    /// Build the embedder and store named by `config`.
    pub fn from_config(config: &RagToolConfig) -> Result<Self> {
        let embedder = build_embedder(&config.embedder)?;
        Self::with_embedder(config, embedder)
    }

    /// Build the store named by `config` around an existing embedder.
    pub fn with_embedder(config: &RagToolConfig, embedder: EmbeddingService) -> Result<Self> {
        let store = create_store(&config.vector_store)?;
        let mut collection_metadata = HashMap::new();
        collection_metadata.insert(
            "description".to_string(),
            Value::from("CrewAI Knowledge Base"),
        );
        store.get_or_create_collection(&config.collection_name, &collection_metadata)?;

        Ok(Self {
            collection_name: config.collection_name.clone(),
            persist_directory: config.vector_store.persist_directory.clone(),
            embedding_model: embedder.model().to_string(),
            summarize: config.summarize,
            top_k: config.top_k,
            embedding_config: config.embedder.clone(),
            store,
            embedder,
            chunker: TextChunker::default(),
        })
    }

    /// Replace the chunker.
    pub fn with_chunker(mut self, chunker: TextChunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Query restricted to chunks whose metadata matches `filter`.
    pub async fn query_with_filter(
        &self,
        question: &str,
        filter: Option<&MetadataFilter>,
    ) -> Result<String> {
        let embedding = self.embedder.embed_text(question).await?;
        let hits = self
            .store
            .query(&self.collection_name, &embedding, self.top_k, filter)?;
        if hits.is_empty() {
            return Ok(NO_CONTENT.to_string());
        }

        let take = if self.summarize { 1 } else { hits.len() };
        let rendered: Vec<String> = hits
            .into_iter()
            .take(take)
            .map(|hit| {
                let source = hit
                    .metadata
                    .get("source")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                let score = 1.0 - f64::from(hit.distance);
                format!("[Source: {}, Relevance: {:.3}]\n{}", source, score, hit.document)
            })
            .collect();
        Ok(rendered.join("\n\n"))
    }

    /// Drop the adapter's collection.
    pub fn delete_collection(&self) -> Result<()> {
        self.store.delete_collection(&self.collection_name)?;
        log::info!("Deleted collection: {}", self.collection_name);
        Ok(())
    }

    pub fn get_collection_info(&self) -> Result<CollectionInfo> {
        Ok(CollectionInfo {
            name: self.collection_name.clone(),
            count: self.store.count(&self.collection_name)?,
            embedding_model: self.embedding_model.clone(),
        })
    }

    async fn load_item(&self, item: &ContentItem, options: &AddOptions) -> Result<Vec<LoadedText>> {
        let mut item_metadata = options.metadata.clone();
        if let Some(extra) = item.metadata() {
            item_metadata.extend(extra.clone());
        }

        let inline = match item {
            ContentItem::Text(text) => Some(text.clone()),
            ContentItem::Record {
                content: Some(content),
                ..
            } => Some(content.clone()),
            _ => None,
        };
        if let Some(text) = inline {
            // Inline text is taken verbatim, even when it happens to look
            // like a path.
            let source = match item {
                ContentItem::Record {
                    source: Some(source),
                    ..
                } => source.clone(),
                _ => item_metadata
                    .get("source")
                    .and_then(Value::as_str)
                    .unwrap_or(TEXT_INPUT_SOURCE)
                    .to_string(),
            };
            return Ok(vec![LoadedText {
                text,
                source,
                data_type: options.data_type.unwrap_or(DataType::Text),
                metadata: item_metadata,
            }]);
        }

        let source_ref = item.source_ref();
        let data_type = options
            .data_type
            .unwrap_or_else(|| DataTypes::from_content(Some(&source_ref)));

        if data_type == DataType::Directory {
            let report = DirectoryLoader::new()
                .load_all(&SourceContent::new(source_ref.as_str()).as_path(), &options.load_options)
                .await?;
            return Ok(report
                .results
                .into_iter()
                .map(|file| LoadedText {
                    text: file.result.content,
                    source: file.path.to_string_lossy().to_string(),
                    data_type: file.data_type,
                    metadata: item_metadata.clone(),
                })
                .collect());
        }

        let result = data_type
            .get_loader()
            .load(&SourceContent::new(&source_ref), &options.load_options)
            .await?;
        Ok(vec![LoadedText {
            text: result.content,
            source: source_ref,
            data_type,
            metadata: item_metadata,
        }])
    }
}

#[async_trait]
impl Adapter for CustomRagAdapter {
    async fn query(&self, question: &str) -> Result<String> {
        self.query_with_filter(question, None).await
    }

    async fn add(&self, items: &[ContentItem], options: &AddOptions) -> Result<()> {
        let mut documents: Vec<Document> = Vec::new();
        for item in items {
            for loaded in self.load_item(item, options).await? {
                if loaded.text.trim().is_empty() {
                    continue;
                }
                for (index, chunk) in self.chunker.chunk(&loaded.text).into_iter().enumerate() {
                    let mut document = Document::new(chunk, loaded.data_type);
                    document.metadata = loaded.metadata.clone();
                    document
                        .metadata
                        .insert("chunk_index".to_string(), Value::from(index));
                    document.source = Some(loaded.source.clone());
                    documents.push(document);
                }
            }
        }

        if documents.is_empty() {
            log::warn!("No documents to add");
            return Ok(());
        }

        let contents: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&contents).await?;
        let count = documents.len();
        let records = documents
            .into_iter()
            .zip(embeddings)
            .map(|(doc, embedding)| doc.into_record(embedding))
            .collect();
        self.store.upsert(&self.collection_name, records)?;
        log::info!("Added {} documents to knowledge base", count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::config::RagConfig;
    use crate::rag::embeddings::testing::letter_embedder;
    use serde_json::json;
    use std::fs;

    fn adapter() -> CustomRagAdapter {
        CustomRagAdapter::with_embedder(&RagToolConfig::default(), letter_embedder()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = CustomRagAdapter::default_config();
        assert_eq!(config.collection_name, "crewai_knowledge_base");
        assert_eq!(config.embedder.model, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.top_k, 5);

        let adapter = adapter();
        assert_eq!(adapter.embedding_model, "letters");
        assert!(adapter.persist_directory.is_none());
    }

    #[tokio::test]
    async fn test_add_text_and_query_renders_sources() {
        let adapter = adapter();
        adapter
            .add(&[ContentItem::from("rust has ownership")], &AddOptions::default())
            .await
            .unwrap();

        let answer = adapter.query("rust has ownership").await.unwrap();
        assert!(answer.starts_with("[Source: text_input, Relevance: 1.000]\n"));
        assert!(answer.ends_with("rust has ownership"));
    }

    #[tokio::test]
    async fn test_empty_collection_sentinel() {
        let adapter = adapter();
        assert_eq!(adapter.query("anything").await.unwrap(), NO_CONTENT);
    }

    #[tokio::test]
    async fn test_long_text_is_chunked_with_indexes() {
        let adapter = adapter();
        let sentence = "The borrow checker enforces aliasing rules. ";
        let text = sentence.repeat(60);
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), json!("book"));
        adapter
            .add(
                &[ContentItem::from(text)],
                &AddOptions::default().with_metadata(metadata),
            )
            .await
            .unwrap();

        let info = adapter.get_collection_info().unwrap();
        assert!(info.count > 1);
        assert_eq!(info.name, "crewai_knowledge_base");

        let mut filter = MetadataFilter::new();
        filter.insert("chunk_index".to_string(), json!(0));
        let first = adapter
            .query_with_filter("borrow checker", Some(&filter))
            .await
            .unwrap();
        assert_eq!(first.matches("[Source: book,").count(), 1);
    }

    #[tokio::test]
    async fn test_files_are_loaded_by_data_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.mdx");
        fs::write(&path, "import X from 'x'\n\n# Guide\n<Note>tip</Note>\nUse cargo.").unwrap();

        let adapter = adapter();
        adapter
            .add(&[ContentItem::from(path.as_path())], &AddOptions::default())
            .await
            .unwrap();

        let mut filter = MetadataFilter::new();
        filter.insert("data_type".to_string(), json!("mdx"));
        let answer = adapter
            .query_with_filter("guide cargo", Some(&filter))
            .await
            .unwrap();
        assert!(answer.contains(&path.to_string_lossy().to_string()));
        assert!(answer.contains("Use cargo."));
        assert!(!answer.contains("import X"));
    }

    #[tokio::test]
    async fn test_summarize_returns_best_hit_only() {
        let mut config = RagToolConfig::default();
        config.summarize = true;
        let adapter = CustomRagAdapter::with_embedder(&config, letter_embedder()).unwrap();
        adapter
            .add(
                &[ContentItem::from("apples"), ContentItem::from("apple pie")],
                &AddOptions::default(),
            )
            .await
            .unwrap();
        let answer = adapter.query("apples").await.unwrap();
        assert_eq!(answer.matches("[Source:").count(), 1);
        assert!(answer.ends_with("apples"));
    }

    #[tokio::test]
    async fn test_persistent_store_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let config = RagToolConfig {
            vector_store: RagConfig::sqlite(dir.path()),
            ..RagToolConfig::default()
        };
        {
            let adapter = CustomRagAdapter::with_embedder(&config, letter_embedder()).unwrap();
            adapter
                .add(&[ContentItem::from("kept on disk")], &AddOptions::default())
                .await
                .unwrap();
        }

        let adapter = CustomRagAdapter::with_embedder(&config, letter_embedder()).unwrap();
        assert_eq!(adapter.persist_directory.as_deref(), Some(dir.path()));
        assert_eq!(adapter.get_collection_info().unwrap().count, 1);

        adapter.delete_collection().unwrap();
        assert!(adapter.get_collection_info().is_err());
    }
}
