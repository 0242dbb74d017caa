//! Type definitions for RAG (Retrieval-Augmented Generation) systems.
//!
//! Port of crewai/rag/types.py

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// A document record for storage in vector databases.
///
/// Represents a single document with its content, optional ID, and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseRecord {
    /// Optional unique identifier for the document.
    /// If not provided, a content-based ID will be generated using SHA256 hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    /// The text content of the document (required).
    pub content: String,
    /// Optional metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl BaseRecord {
    /// Create a new BaseRecord with only content.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            doc_id: None,
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Create a new BaseRecord with content and a doc_id.
    pub fn with_id(doc_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            doc_id: Some(doc_id.into()),
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Set metadata for this record.
    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Get or generate the document ID.
    ///
    /// If no doc_id was explicitly set, the SHA-256 hex digest of the content
    /// is used, so re-adding identical content overwrites instead of duplicating.
    pub fn get_or_generate_id(&self) -> String {
        match &self.doc_id {
            Some(id) => id.clone(),
            None => hex::encode(Sha256::digest(self.content.as_bytes())),
        }
    }
}

/// Type alias for embedding vectors.
/// Each embedding is a vector of f32 values.
pub type Embeddings = Vec<Vec<f32>>;

/// Standard search result format for vector store queries.
///
/// Provides a consistent interface for search results across different
/// vector store implementations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Unique identifier of the document.
    pub id: String,
    /// The text content of the document.
    pub content: String,
    /// Metadata associated with the document.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Similarity score (higher is better, typically between 0 and 1).
    pub score: f64,
}

impl SearchResult {
    /// Create a new SearchResult.
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        metadata: HashMap<String, Value>,
        score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata,
            score,
        }
    }
}
