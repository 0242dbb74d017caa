//! Embedding provider implementations.
//!
//! Port of crewai/rag/embeddings/providers/
//!
//! # Supported Providers
//!
//! | Provider | Module | Provider Literal |
//! |---|---|---|
//! | Custom | [`custom`] | `"custom"` |
//! | Ollama | [`ollama`] | `"ollama"` |
//! | OpenAI (and compatible servers) | [`openai`] | `"openai"` |

pub mod custom;
pub mod ollama;
pub mod openai;

pub use custom::CustomEmbedding;
pub use openai::OpenAIEmbedding;

/// Allowed embedding provider name literals.
pub const ALLOWED_EMBEDDING_PROVIDERS: &[&str] = &["custom", "ollama", "openai"];
