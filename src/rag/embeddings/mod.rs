//! Embeddings service, factory and provider registry for the RAG system.
//!
//! Port of crewai/rag/embeddings/ and the `EmbeddingService` of
//! crewai_tools/rag/core.py.
//!
//! This module provides:
//! - The [`EmbeddingFunction`] trait every provider implements
//! - [`EmbeddingService`], the handle clients and adapters embed through
//! - Factory functions for building a service from config or a JSON spec

pub mod providers;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::rag::config::EmbedderConfig;
use crate::rag::error::{RagError, Result};
use crate::rag::types::Embeddings;

pub use providers::{CustomEmbedding, OpenAIEmbedding, ALLOWED_EMBEDDING_PROVIDERS};

// ---------------------------------------------------------------------------
// EmbeddingFunction trait
// ---------------------------------------------------------------------------

/// Converts input texts into embedding vectors, one per input, in order.
#[async_trait]
pub trait EmbeddingFunction: Send + Sync {
    /// Embed a batch of texts.
    async fn embed(&self, input: &[String]) -> Result<Embeddings>;

    /// The model this function embeds with.
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// EmbeddingService
// ---------------------------------------------------------------------------

/// Cheaply clonable handle over an [`EmbeddingFunction`].
///
/// Provider failures are logged and returned; nothing is retried.
#[derive(Clone)]
pub struct EmbeddingService {
    function: Arc<dyn EmbeddingFunction>,
}

impl fmt::Debug for EmbeddingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingService")
            .field("model", &self.model())
            .finish()
    }
}

impl EmbeddingService {
    /// Wrap an embedding function.
    pub fn new<F>(function: F) -> Self
    where
        F: EmbeddingFunction + 'static,
    {
        Self {
            function: Arc::new(function),
        }
    }

    /// Wrap an already shared embedding function.
    pub fn from_arc(function: Arc<dyn EmbeddingFunction>) -> Self {
        Self { function }
    }

    /// The model name of the underlying function.
    pub fn model(&self) -> &str {
        self.function.model_name()
    }

    /// Embed a single text.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self
            .function
            .embed(&[text.to_string()])
            .await
            .map_err(|e| {
                log::error!("Error generating embedding: {}", e);
                e
            })?;
        embeddings.pop().ok_or_else(|| {
            RagError::Embedding(format!("model {} returned no embedding", self.model()))
        })
    }

    /// Embed a batch of texts. An empty batch makes no provider call.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Embeddings> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embeddings = self.function.embed(texts).await.map_err(|e| {
            log::error!("Error generating batch embeddings: {}", e);
            e
        })?;
        if embeddings.len() != texts.len() {
            let err = RagError::Embedding(format!(
                "model {} returned {} embeddings for {} inputs",
                self.model(),
                embeddings.len(),
                texts.len()
            ));
            log::error!("{}", err);
            return Err(err);
        }
        Ok(embeddings)
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Build an embedding service from an [`EmbedderConfig`].
///
/// # Errors
/// Returns `RagError::Config` for unknown providers, for `custom` (which
/// needs a function, see [`CustomEmbedding`]) and when a hosted provider has
/// no API key.
pub fn build_embedder(config: &EmbedderConfig) -> Result<EmbeddingService> {
    match config.provider.as_str() {
        "openai" => Ok(EmbeddingService::new(OpenAIEmbedding::from_config(config)?)),
        "ollama" => Ok(EmbeddingService::new(providers::ollama::from_config(config)?)),
        "custom" => Err(RagError::Config(
            "the custom provider needs an embedding function; build it with CustomEmbedding::new"
                .to_string(),
        )),
        other => Err(RagError::Config(format!(
            "Unknown provider: {}. Available providers: {:?}",
            other, ALLOWED_EMBEDDING_PROVIDERS
        ))),
    }
}

/// Build an embedding service from a dictionary description.
///
/// # Arguments
/// * `spec` - A JSON value with a "provider" key and an optional "config"
///   object using [`EmbedderConfig`] field names (`model_name` is accepted
///   for `model`).
pub fn build_embedder_from_dict(spec: &Value) -> Result<EmbeddingService> {
    let provider = spec
        .get("provider")
        .and_then(|p| p.as_str())
        .ok_or_else(|| RagError::Config("Missing 'provider' key in embedder description".to_string()))?;

    let mut config = match spec.get("config") {
        Some(Value::Object(map)) => {
            serde_json::from_value::<EmbedderConfig>(Value::Object(map.clone()))?
        }
        Some(Value::Null) | None => EmbedderConfig::default(),
        Some(other) => {
            return Err(RagError::Config(format!(
                "'config' must be an object, got {}",
                other
            )))
        }
    };
    config.provider = provider.to_string();
    if spec.get("config").and_then(|c| c.get("model")).is_none()
        && spec.get("config").and_then(|c| c.get("model_name")).is_none()
        && provider == "ollama"
    {
        config.model = providers::ollama::DEFAULT_MODEL.to_string();
    }
    build_embedder(&config)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic embedders for tests.

    use super::*;

    /// Bag-of-letters embedding: counts of `a..z`, so texts sharing words
    /// land close together.
    pub fn letter_embedder() -> EmbeddingService {
        EmbeddingService::new(CustomEmbedding::new("letters", |input: &[String]| {
            Ok(input.iter().map(|t| letter_vector(t)).collect())
        }))
    }

    pub fn letter_vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; 26];
        for c in text.to_ascii_lowercase().chars() {
            if c.is_ascii_lowercase() {
                v[(c as u8 - b'a') as usize] += 1.0;
            }
        }
        v
    }
}
