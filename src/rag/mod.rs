//! RAG (Retrieval-Augmented Generation) pipeline for crewAI tools.
//!
//! Content references are classified into a [`DataType`], loaded by the
//! matching loader, split by the [`TextChunker`], embedded through an
//! [`EmbeddingService`] and stored in a vector store behind a
//! [`BaseClient`]. Queries embed the question and return the nearest chunks.

pub mod cache;
pub mod chunker;
pub mod client;
pub mod config;
pub mod core;
pub mod data_types;
pub mod embeddings;
pub mod error;
pub mod factory;
pub mod loaders;
pub mod source_content;
pub mod storage;
pub mod types;

pub use cache::QueryCache;
pub use chunker::TextChunker;
pub use client::VectorStoreClient;
pub use config::{EmbedderConfig, RagConfig, RagToolConfig};
pub use core::BaseClient;
pub use data_types::{DataType, DataTypes};
pub use embeddings::{EmbeddingFunction, EmbeddingService};
pub use error::{LoadError, LoadErrorKind, RagError, Result};
pub use factory::{create_client, get_rag_client};
pub use loaders::{BaseLoader, LoadOptions, LoaderResult};
pub use source_content::SourceContent;
pub use types::{BaseRecord, Embeddings, SearchResult};
