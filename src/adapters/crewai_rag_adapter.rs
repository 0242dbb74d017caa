//! Adapter over the native RAG client.
//!
//! Corresponds to `crewai_tools/adapters/crewai_rag_adapter.py`.
//!
//! Each item is resolved to a [`DataType`], loaded by that type's loader and
//! turned into one [`BaseRecord`]. Directories are walked file by file; a
//! file that fails to load is logged, reported and skipped. All records of
//! one `add` call go to the client in a single `add_documents` request.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapters::{AddOptions, Adapter, ContentItem};
use crate::rag::core::{BaseClient, CollectionAddParams, CollectionParams, CollectionSearchParams};
use crate::rag::data_types::{DataType, DataTypes};
use crate::rag::error::{LoadError, Result};
use crate::rag::factory::get_rag_client;
use crate::rag::loaders::{BaseLoader, DirectoryLoader, LoadFailure};
use crate::rag::source_content::SourceContent;
use crate::rag::types::BaseRecord;

/// Default collection name.
pub const DEFAULT_COLLECTION: &str = "default";

/// Number of results a query asks for.
pub const QUERY_LIMIT: usize = 5;

/// Answer returned when a search finds nothing.
pub const NO_CONTENT: &str = "No relevant content found.";

/// What one `add` call stored and what it had to skip.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Records sent to the client.
    pub documents_added: usize,
    /// Directory files that could not be loaded.
    pub failures: Vec<LoadFailure>,
}

impl IngestReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct CrewAIRagAdapter {
    pub collection_name: String,
    /// Return only the best match.
    pub summarize: bool,
    client: Arc<dyn BaseClient>,
}

impl std::fmt::Debug for CrewAIRagAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrewAIRagAdapter")
            .field("collection_name", &self.collection_name)
            .field("summarize", &self.summarize)
            .finish()
    }
}

impl CrewAIRagAdapter {
    /// Create the adapter, making sure its collection exists.
    pub async fn new(
        collection_name: impl Into<String>,
        client: Arc<dyn BaseClient>,
    ) -> Result<Self> {
        let adapter = Self {
            collection_name: collection_name.into(),
            summarize: false,
            client,
        };
        adapter
            .client
            .get_or_create_collection(&CollectionParams::new(&adapter.collection_name))
            .await?;
        Ok(adapter)
    }

    /// Create the adapter over [`get_rag_client`] and the default collection.
    pub async fn with_default_client() -> Result<Self> {
        let client: Arc<dyn BaseClient> = Arc::from(get_rag_client()?);
        Self::new(DEFAULT_COLLECTION, client).await
    }

    pub fn with_summarize(mut self, summarize: bool) -> Self {
        self.summarize = summarize;
        self
    }

    pub fn client(&self) -> &Arc<dyn BaseClient> {
        &self.client
    }

    /// Add items and report directory files that were skipped.
    ///
    /// # Errors
    /// A single item that fails to load aborts the call before anything is
    /// stored. Failures of individual files inside a directory do not.
    pub async fn add_with_report(
        &self,
        items: &[ContentItem],
        options: &AddOptions,
    ) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let mut documents: Vec<BaseRecord> = Vec::new();

        for item in items {
            let source_ref = item.source_ref();
            let data_type = options
                .data_type
                .unwrap_or_else(|| DataTypes::from_content(Some(&source_ref)));

            if data_type == DataType::Directory {
                self.load_directory(item, &source_ref, options, &mut documents, &mut report)
                    .await?;
                continue;
            }

            let loader = data_type.get_loader();
            let result = loader
                .load(&SourceContent::new(&source_ref), &options.load_options)
                .await?;

            let mut metadata = options.metadata.clone();
            metadata.extend(result.metadata);
            metadata.insert("data_type".to_string(), Value::from(data_type.as_str()));
            if let Some(item_metadata) = item.metadata() {
                metadata.extend(item_metadata.clone());
            }

            documents.push(BaseRecord {
                doc_id: result.doc_id,
                content: result.content,
                metadata,
            });
        }

        if !documents.is_empty() {
            report.documents_added = documents.len();
            self.client
                .add_documents(&CollectionAddParams::new(&self.collection_name, documents))
                .await?;
        }
        Ok(report)
    }

    async fn load_directory(
        &self,
        item: &ContentItem,
        source_ref: &str,
        options: &AddOptions,
        documents: &mut Vec<BaseRecord>,
        report: &mut IngestReport,
    ) -> Result<()> {
        let dir = SourceContent::new(source_ref).as_path();
        if !dir.is_dir() {
            return Err(LoadError::not_found(
                source_ref,
                format!("Directory does not exist: {}", source_ref),
            )
            .into());
        }

        let loaded = DirectoryLoader::new()
            .load_all(&dir, &options.load_options)
            .await?;

        for file in loaded.results {
            let mut metadata: HashMap<String, Value> = options.metadata.clone();
            metadata.extend(file.result.metadata);
            metadata.insert("data_type".to_string(), Value::from(file.data_type.as_str()));
            metadata.insert("directory_source".to_string(), Value::from(source_ref));
            metadata.insert(
                "file_path".to_string(),
                Value::from(file.path.to_string_lossy().to_string()),
            );
            if let Some(item_metadata) = item.metadata() {
                metadata.extend(item_metadata.clone());
            }
            documents.push(BaseRecord {
                doc_id: file.result.doc_id,
                content: file.result.content,
                metadata,
            });
        }
        report.failures.extend(loaded.failures);
        Ok(())
    }
}

#[async_trait]
impl Adapter for CrewAIRagAdapter {
    async fn query(&self, question: &str) -> Result<String> {
        let results = self
            .client
            .search(&CollectionSearchParams::new(&self.collection_name, question).with_limit(QUERY_LIMIT))
            .await?;

        let contents: Vec<String> = results
            .into_iter()
            .map(|r| r.content)
            .filter(|c| !c.is_empty())
            .collect();
        if contents.is_empty() {
            return Ok(NO_CONTENT.to_string());
        }
        if self.summarize {
            return Ok(contents.into_iter().next().unwrap_or_default());
        }
        Ok(contents.join("\n\n"))
    }

    async fn add(&self, items: &[ContentItem], options: &AddOptions) -> Result<()> {
        self.add_with_report(items, options).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::client::VectorStoreClient;
    use crate::rag::embeddings::testing::letter_embedder;
    use crate::rag::error::{LoadErrorKind, RagError};
    use crate::rag::storage::{MemoryVectorStore, VectorStore};
    use serde_json::json;
    use std::fs;

    async fn adapter() -> (CrewAIRagAdapter, Arc<dyn VectorStore>) {
        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
        let client = VectorStoreClient::new(Arc::clone(&store), letter_embedder());
        let adapter = CrewAIRagAdapter::new(DEFAULT_COLLECTION, Arc::new(client))
            .await
            .unwrap();
        (adapter, store)
    }

    #[tokio::test]
    async fn test_collection_created_at_construction() {
        let (_adapter, store) = adapter().await;
        assert_eq!(store.list_collections().unwrap(), vec!["default".to_string()]);
    }

    #[tokio::test]
    async fn test_add_text_and_query() {
        let (adapter, _) = adapter().await;
        adapter
            .add(&[ContentItem::from("the quick brown fox")], &AddOptions::default())
            .await
            .unwrap();
        let answer = adapter.query("quick brown fox").await.unwrap();
        assert_eq!(answer, "the quick brown fox");
    }

    #[tokio::test]
    async fn test_query_on_empty_collection() {
        let (adapter, _) = adapter().await;
        assert_eq!(adapter.query("anything").await.unwrap(), NO_CONTENT);
    }

    #[tokio::test]
    async fn test_metadata_merge_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "a,b\n1,2\n").unwrap();

        let (adapter, store) = adapter().await;
        let mut base = HashMap::new();
        base.insert("team".to_string(), json!("docs"));
        base.insert("format".to_string(), json!("overridden by loader"));
        let mut record_meta = HashMap::new();
        record_meta.insert("team".to_string(), json!("record wins"));
        let item = ContentItem::Record {
            source: Some(path.to_string_lossy().to_string()),
            content: None,
            metadata: record_meta,
        };

        adapter
            .add(&[item], &AddOptions::default().with_metadata(base))
            .await
            .unwrap();

        let hits = store
            .query("default", &crate::rag::embeddings::testing::letter_vector("a b"), 1, None)
            .unwrap();
        let meta = &hits[0].metadata;
        assert_eq!(meta["format"], json!("csv"));
        assert_eq!(meta["data_type"], json!("csv"));
        assert_eq!(meta["team"], json!("record wins"));
    }

    #[tokio::test]
    async fn test_directory_ingestion_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.txt"), "hello from a good file").unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        fs::create_dir(dir.path().join(".hidden")).unwrap();
        fs::write(dir.path().join(".hidden").join("secret.txt"), "secret").unwrap();

        let (adapter, store) = adapter().await;
        let report = adapter
            .add_with_report(
                &[ContentItem::from(dir.path())],
                &AddOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(report.documents_added, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].path.ends_with("broken.json"));
        assert!(!report.is_complete());
        assert_eq!(store.count("default").unwrap(), 1);

        let hits = store
            .query("default", &crate::rag::embeddings::testing::letter_vector("hello"), 1, None)
            .unwrap();
        let meta = &hits[0].metadata;
        assert_eq!(meta["data_type"], json!("text_file"));
        assert_eq!(
            meta["directory_source"],
            json!(dir.path().to_string_lossy().to_string())
        );
        assert!(meta["file_path"].as_str().unwrap().ends_with("good.txt"));
    }

    #[tokio::test]
    async fn test_forced_directory_type_requires_directory() {
        let (adapter, _) = adapter().await;
        let err = adapter
            .add(
                &[ContentItem::from("/definitely/not/here")],
                &AddOptions::default().with_data_type(DataType::Directory),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Load(ref e) if e.kind == LoadErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_data_type_resolved_per_item() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("facts.json");
        fs::write(&json_path, r#"{"fact": "water is wet"}"#).unwrap();

        let (adapter, store) = adapter().await;
        adapter
            .add(
                &[
                    ContentItem::from(json_path.as_path()),
                    ContentItem::from("plain inline words"),
                ],
                &AddOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(store.count("default").unwrap(), 2);

        let hits = store
            .query(
                "default",
                &crate::rag::embeddings::testing::letter_vector("plain inline words"),
                1,
                None,
            )
            .unwrap();
        assert_eq!(hits[0].metadata["data_type"], json!("text"));
    }
}
