//! Core abstractions for the RAG system.
//!
//! Port of crewai/rag/core/

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::rag::error::Result;

pub use crate::rag::types::{BaseRecord, Embeddings, SearchResult};

// ---------------------------------------------------------------------------
// BaseClient parameters
// ---------------------------------------------------------------------------

/// Parameters for collection operations.
#[derive(Debug, Clone)]
pub struct CollectionParams {
    /// The name of the collection/index to operate on.
    pub collection_name: String,
}

impl CollectionParams {
    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
        }
    }
}

/// Parameters for adding documents to a collection.
#[derive(Debug, Clone)]
pub struct CollectionAddParams {
    /// The name of the collection to add documents to.
    pub collection_name: String,
    /// List of document records.
    pub documents: Vec<BaseRecord>,
    /// Optional batch size for processing documents.
    pub batch_size: Option<usize>,
}

impl CollectionAddParams {
    pub fn new(collection_name: impl Into<String>, documents: Vec<BaseRecord>) -> Self {
        Self {
            collection_name: collection_name.into(),
            documents,
            batch_size: None,
        }
    }
}

/// Parameters for searching within a collection.
#[derive(Debug, Clone)]
pub struct CollectionSearchParams {
    /// The name of the collection to search in.
    pub collection_name: String,
    /// The text query to search for.
    pub query: String,
    /// Maximum number of results to return.
    pub limit: Option<usize>,
    /// Filter results by metadata fields.
    pub metadata_filter: Option<HashMap<String, Value>>,
    /// Minimum similarity score for results (0-1).
    pub score_threshold: Option<f64>,
}

impl CollectionSearchParams {
    pub fn new(collection_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
            query: query.into(),
            limit: None,
            metadata_filter: None,
            score_threshold: None,
        }
    }

    /// Builder: cap the number of results.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Builder: minimum similarity score.
    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    /// Builder: metadata equality filter.
    pub fn with_filter(mut self, filter: HashMap<String, Value>) -> Self {
        self.metadata_filter = Some(filter);
        self
    }
}

// ---------------------------------------------------------------------------
// BaseClient trait
// ---------------------------------------------------------------------------

/// Trait for vector store client implementations.
///
/// Defines the interface that all vector store client implementations
/// must follow. Provides a consistent API for storing and retrieving
/// documents with their vector embeddings across different backends.
#[async_trait]
pub trait BaseClient: Send + Sync {
    /// Create a new collection. Fails if it already exists.
    async fn create_collection(&self, params: &CollectionParams) -> Result<()>;

    /// Get an existing collection or create it if it doesn't exist.
    async fn get_or_create_collection(&self, params: &CollectionParams) -> Result<()>;

    /// Embed and add documents to a collection.
    async fn add_documents(&self, params: &CollectionAddParams) -> Result<()>;

    /// Search for similar documents using a text query.
    async fn search(&self, params: &CollectionSearchParams) -> Result<Vec<SearchResult>>;

    /// Delete a collection and all its data.
    async fn delete_collection(&self, params: &CollectionParams) -> Result<()>;

    /// Reset the vector database by deleting all collections and data.
    async fn reset(&self) -> Result<()>;
}
