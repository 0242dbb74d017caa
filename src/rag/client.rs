//! Vector store client: embeds text and talks to a [`VectorStore`].
//!
//! Port of crewai/rag/chromadb/client.py, generalized over the stores in
//! [`crate::rag::storage`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::rag::config::RagConfig;
use crate::rag::core::{
    BaseClient, CollectionAddParams, CollectionParams, CollectionSearchParams,
};
use crate::rag::embeddings::EmbeddingService;
use crate::rag::error::{RagError, Result};
use crate::rag::storage::{StoredRecord, VectorStore};
use crate::rag::types::SearchResult;

/// [`BaseClient`] over any [`VectorStore`] and [`EmbeddingService`].
///
/// Documents are embedded in batches of `default_batch_size` and upserted
/// batch by batch. Search scores are `1 - cosine_distance`; results below the
/// score threshold are dropped.
pub struct VectorStoreClient {
    store: Arc<dyn VectorStore>,
    embedder: EmbeddingService,
    /// Default number of results per search.
    pub default_limit: usize,
    /// Default minimum similarity score.
    pub default_score_threshold: f64,
    /// Default number of documents embedded per request.
    pub default_batch_size: usize,
}

impl std::fmt::Debug for VectorStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStoreClient")
            .field("store", &self.store.name())
            .field("embedder", &self.embedder)
            .field("default_limit", &self.default_limit)
            .field("default_score_threshold", &self.default_score_threshold)
            .field("default_batch_size", &self.default_batch_size)
            .finish()
    }
}

impl VectorStoreClient {
    /// Create a client with the default limit (5), threshold (0.6) and batch size (100).
    pub fn new(store: Arc<dyn VectorStore>, embedder: EmbeddingService) -> Self {
        let defaults = RagConfig::default();
        Self {
            store,
            embedder,
            default_limit: defaults.limit,
            default_score_threshold: defaults.score_threshold,
            default_batch_size: defaults.batch_size,
        }
    }

    /// Create a client using the limits of `config`.
    pub fn with_config(
        store: Arc<dyn VectorStore>,
        embedder: EmbeddingService,
        config: &RagConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            embedder,
            default_limit: config.limit,
            default_score_threshold: config.score_threshold,
            default_batch_size: config.batch_size,
        })
    }

    /// The store this client writes to.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// The embedding service this client embeds with.
    pub fn embedder(&self) -> &EmbeddingService {
        &self.embedder
    }

    fn collection_metadata() -> HashMap<String, Value> {
        let mut metadata = HashMap::new();
        metadata.insert(
            "description".to_string(),
            Value::from("CrewAI Knowledge Base"),
        );
        metadata
    }
}

#[async_trait]
impl BaseClient for VectorStoreClient {
    async fn create_collection(&self, params: &CollectionParams) -> Result<()> {
        self.store
            .create_collection(&params.collection_name, &Self::collection_metadata())?;
        log::info!(
            "Created collection {} ({} store)",
            params.collection_name,
            self.store.name()
        );
        Ok(())
    }

    async fn get_or_create_collection(&self, params: &CollectionParams) -> Result<()> {
        let created = self
            .store
            .get_or_create_collection(&params.collection_name, &Self::collection_metadata())?;
        if created {
            log::info!(
                "Created collection {} ({} store)",
                params.collection_name,
                self.store.name()
            );
        }
        Ok(())
    }

    async fn add_documents(&self, params: &CollectionAddParams) -> Result<()> {
        if params.documents.is_empty() {
            return Err(RagError::Store("Documents list cannot be empty".to_string()));
        }
        let batch_size = params.batch_size.unwrap_or(self.default_batch_size).max(1);

        for batch in params.documents.chunks(batch_size) {
            let contents: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&contents).await?;
            let records = batch
                .iter()
                .zip(embeddings)
                .map(|(doc, embedding)| {
                    StoredRecord::new(
                        doc.get_or_generate_id(),
                        doc.content.clone(),
                        doc.metadata.clone(),
                        embedding,
                    )
                })
                .collect();
            self.store.upsert(&params.collection_name, records)?;
        }

        log::info!(
            "Added {} documents to collection {}",
            params.documents.len(),
            params.collection_name
        );
        Ok(())
    }

    async fn search(&self, params: &CollectionSearchParams) -> Result<Vec<SearchResult>> {
        let limit = params.limit.unwrap_or(self.default_limit);
        let threshold = params
            .score_threshold
            .unwrap_or(self.default_score_threshold);

        let embedding = self.embedder.embed_text(&params.query).await?;
        let hits = self.store.query(
            &params.collection_name,
            &embedding,
            limit,
            params.metadata_filter.as_ref(),
        )?;

        Ok(hits
            .into_iter()
            .map(|hit| {
                SearchResult::new(
                    hit.id,
                    hit.document,
                    hit.metadata,
                    1.0 - f64::from(hit.distance),
                )
            })
            .filter(|result| result.score >= threshold)
            .collect())
    }

    async fn delete_collection(&self, params: &CollectionParams) -> Result<()> {
        self.store.delete_collection(&params.collection_name)?;
        log::info!("Deleted collection: {}", params.collection_name);
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.store.reset()?;
        log::info!("Reset {} vector store", self.store.name());
        Ok(())
    }
}
