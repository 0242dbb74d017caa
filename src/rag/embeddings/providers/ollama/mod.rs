//! Ollama embedding provider.
//!
//! Port of crewai/rag/embeddings/providers/ollama/
//!
//! Talks to a locally-running Ollama server through its OpenAI-compatible
//! endpoint, so it shares the OpenAI client. No API key is sent unless one
//! is configured.

use std::time::Duration;

use crate::rag::config::EmbedderConfig;
use crate::rag::embeddings::providers::openai::OpenAIEmbedding;
use crate::rag::error::Result;

/// Default local endpoint.
pub const DEFAULT_API_BASE: &str = "http://localhost:11434/v1";

/// Default embedding model.
pub const DEFAULT_MODEL: &str = "nomic-embed-text";

/// Build an Ollama-backed embedding function.
pub fn from_config(config: &EmbedderConfig) -> Result<OpenAIEmbedding> {
    let api_base = config
        .api_base
        .clone()
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let mut embedding = OpenAIEmbedding::new(
        &config.model,
        config.api_key.clone(),
        api_base,
        Duration::from_secs(config.timeout_secs),
    )?;
    if let Some(dimensions) = config.dimensions {
        embedding = embedding.with_dimensions(dimensions);
    }
    Ok(embedding.with_extra(config.extra.clone()))
}
