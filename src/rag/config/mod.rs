//! RAG configuration for store selection, embedders and the RAG tool.
//!
//! Port of crewai/rag/config/
//!
//! Every struct deserializes with defaults for missing fields, so a YAML
//! file only needs to name what it changes:
//!
//! ```yaml
//! collection_name: handbook
//! embedder:
//!   provider: ollama
//!   model: nomic-embed-text
//! vector_store:
//!   provider: sqlite
//!   persist_directory: ./rag-data
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rag::error::{RagError, Result};

// ---------------------------------------------------------------------------
// Vector store configuration
// ---------------------------------------------------------------------------

/// Supported vector store backends.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Process-local store, lost on exit.
    #[default]
    Memory,
    /// SQLite file under `persist_directory`.
    Sqlite,
}

impl std::fmt::Display for VectorStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorStoreProvider::Memory => write!(f, "memory"),
            VectorStoreProvider::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Configuration for a vector store client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// The store backend.
    #[serde(default)]
    pub provider: VectorStoreProvider,
    /// Directory holding persistent stores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_directory: Option<PathBuf>,
    /// Maximum number of results to return from searches.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Minimum similarity score threshold for search results.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,
    /// Batch size for adding documents.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_limit() -> usize {
    5
}

fn default_score_threshold() -> f64 {
    0.6
}

fn default_batch_size() -> usize {
    100
}

impl Default for RagConfig {
    fn default() -> Self {
        Self::memory()
    }
}

impl RagConfig {
    /// In-memory store configuration.
    pub fn memory() -> Self {
        Self {
            provider: VectorStoreProvider::Memory,
            persist_directory: None,
            limit: default_limit(),
            score_threshold: default_score_threshold(),
            batch_size: default_batch_size(),
        }
    }

    /// SQLite store configuration persisting under `dir`.
    pub fn sqlite(dir: impl Into<PathBuf>) -> Self {
        Self {
            provider: VectorStoreProvider::Sqlite,
            persist_directory: Some(dir.into()),
            ..Self::memory()
        }
    }

    /// Set the search result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the score threshold.
    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Reject configurations the client cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(RagError::Config("batch_size must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(RagError::Config(format!(
                "score_threshold must be between 0 and 1, got {}",
                self.score_threshold
            )));
        }
        if self.provider == VectorStoreProvider::Sqlite && self.persist_directory.is_none() {
            return Err(RagError::Config(
                "sqlite vector store requires persist_directory".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Embedder configuration
// ---------------------------------------------------------------------------

/// Configuration for an embedding provider.
///
/// `extra` carries provider-specific request fields (e.g. `user`,
/// `encoding_format`) that are forwarded verbatim in the request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedderConfig {
    /// Provider name: `openai`, `ollama` or `custom`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Embedding model name.
    #[serde(default = "default_embedding_model", alias = "model_name")]
    pub model: String,
    /// API key; falls back to the provider's environment variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Requested embedding dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Additional request body fields.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, Value>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            api_key: None,
            api_base: None,
            dimensions: None,
            timeout_secs: default_timeout_secs(),
            extra: HashMap::new(),
        }
    }
}

impl EmbedderConfig {
    /// Configuration for the given provider and model.
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Resolve the API key from config or environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .or_else(|| std::env::var("EMBEDDINGS_OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }
}

// ---------------------------------------------------------------------------
// RagTool configuration
// ---------------------------------------------------------------------------

/// Configuration for `RagTool` and the default adapter it builds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagToolConfig {
    /// Collection the default adapter reads and writes.
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
    /// Number of results per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Return only the best match.
    #[serde(default)]
    pub summarize: bool,
    /// Capacity of the per-tool query cache.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    /// Embedding provider settings.
    #[serde(default)]
    pub embedder: EmbedderConfig,
    /// Vector store settings.
    #[serde(default)]
    pub vector_store: RagConfig,
}

fn default_collection_name() -> String {
    "crewai_knowledge_base".to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_cache_size() -> usize {
    128
}

impl Default for RagToolConfig {
    fn default() -> Self {
        Self {
            collection_name: default_collection_name(),
            top_k: default_top_k(),
            summarize: false,
            cache_size: default_cache_size(),
            embedder: EmbedderConfig::default(),
            vector_store: RagConfig::default(),
        }
    }
}

impl RagToolConfig {
    /// Parse a configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.vector_store.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a YAML file on disk.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Defaults overridden by `CREWAI_RAG_*` / `OPENAI_API_BASE` variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// `CREWAI_RAG_PERSIST_DIR` switches the store to SQLite.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(name) = lookup("CREWAI_RAG_COLLECTION") {
            self.collection_name = name;
        }
        if let Some(model) = lookup("CREWAI_RAG_EMBEDDING_MODEL") {
            self.embedder.model = model;
        }
        if let Some(base) = lookup("OPENAI_API_BASE") {
            self.embedder.api_base = Some(base);
        }
        if let Some(dir) = lookup("CREWAI_RAG_PERSIST_DIR") {
            self.vector_store.provider = VectorStoreProvider::Sqlite;
            self.vector_store.persist_directory = Some(PathBuf::from(dir));
        }
        self
    }
}
