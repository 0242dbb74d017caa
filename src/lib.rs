//! # crewAI Tools - RAG pipeline
//!
//! Rust port of the knowledge-base machinery of the `crewai_tools` package:
//! content loaders, chunking, embeddings, vector stores, the `Adapter`
//! contract with its backends, and the `RagTool` that agents call.
//!
//! ```text
//! source ──▶ DataType ──▶ loader ──▶ chunker ──▶ embedder ──▶ vector store
//!                                                                  │
//! question ──────────────────────────────▶ embedder ──▶ search ◀───┘
//! ```

pub mod adapters;
pub mod rag;
pub mod tools;
pub mod utilities;

// Re-exports matching crewai_tools' public surface
pub use adapters::{
    AddOptions, Adapter, ContentItem, CrewAIRagAdapter, CustomAdapter, CustomPdfAdapter,
    CustomRagAdapter, ElasticsearchAdapter,
};
pub use rag::{DataType, RagError, RagToolConfig};
pub use tools::{BaseTool, RagTool};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
