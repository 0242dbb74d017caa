//! Factory functions for creating RAG clients from configuration.
//!
//! Port of crewai/rag/factory.py and crewai/rag/config/utils.py

use std::path::PathBuf;
use std::sync::Arc;

use crate::rag::client::VectorStoreClient;
use crate::rag::config::{RagConfig, RagToolConfig, VectorStoreProvider};
use crate::rag::core::BaseClient;
use crate::rag::embeddings::{build_embedder, EmbeddingService};
use crate::rag::error::{RagError, Result};
use crate::rag::storage::{MemoryVectorStore, SqliteVectorStore, VectorStore};

/// Open the vector store named by `config`.
///
/// # Errors
/// Returns `RagError::Config` when the configuration is invalid, or the
/// store's error when a SQLite database cannot be opened.
pub fn create_store(config: &RagConfig) -> Result<Arc<dyn VectorStore>> {
    config.validate()?;
    match config.provider {
        VectorStoreProvider::Memory => {
            log::debug!("Creating in-memory vector store");
            Ok(Arc::new(MemoryVectorStore::new()))
        }
        VectorStoreProvider::Sqlite => {
            let dir = config.persist_directory.as_ref().ok_or_else(|| {
                RagError::Config("sqlite vector store requires persist_directory".to_string())
            })?;
            Ok(Arc::new(SqliteVectorStore::open(dir)?))
        }
    }
}

/// Create a vector database client from configuration.
///
/// # Examples
/// ```rust,no_run
/// use crewai_tools::rag::config::RagConfig;
/// use crewai_tools::rag::embeddings::{EmbeddingService, CustomEmbedding};
/// use crewai_tools::rag::factory::create_client;
///
/// let embedder = EmbeddingService::new(CustomEmbedding::new("zeros", |input: &[String]| {
///     Ok(input.iter().map(|_| vec![0.0; 8]).collect())
/// }));
/// let client = create_client(&RagConfig::memory(), embedder).expect("Failed to create client");
/// ```
pub fn create_client(config: &RagConfig, embedder: EmbeddingService) -> Result<Box<dyn BaseClient>> {
    let store = create_store(config)?;
    log::info!(
        "Creating {} client (limit={}, score_threshold={}, batch_size={})",
        config.provider,
        config.limit,
        config.score_threshold,
        config.batch_size
    );
    Ok(Box::new(VectorStoreClient::with_config(store, embedder, config)?))
}

/// Default persist directory for the SQLite store under the crewAI storage path.
pub fn default_persist_directory() -> PathBuf {
    crate::utilities::paths::db_storage_path().join("rag")
}

/// Build the default client from the environment.
///
/// Uses [`RagToolConfig::from_env`]: OpenAI embeddings (or whatever
/// `CREWAI_RAG_EMBEDDING_MODEL` / `OPENAI_API_BASE` select) and an in-memory
/// store unless `CREWAI_RAG_PERSIST_DIR` is set.
pub fn get_rag_client() -> Result<Box<dyn BaseClient>> {
    let config = RagToolConfig::from_env();
    let embedder = build_embedder(&config.embedder)?;
    create_client(&config.vector_store, embedder)
}
