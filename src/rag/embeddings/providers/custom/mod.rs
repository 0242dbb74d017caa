//! Custom embedding provider.
//!
//! Port of crewai/rag/embeddings/providers/custom/
//!
//! Allows users to provide their own embedding function implementation.
//! The custom provider wraps a user-supplied callable that converts text to vectors.

use std::sync::Arc;

use async_trait::async_trait;

use crate::rag::embeddings::EmbeddingFunction;
use crate::rag::error::Result;
use crate::rag::types::Embeddings;

/// Type alias for a custom embedding closure.
pub type CustomEmbedFn = Arc<dyn Fn(&[String]) -> Result<Embeddings> + Send + Sync>;

/// Custom embedding provider.
///
/// Wraps a user-supplied embedding function. Since closures are not
/// serializable, this struct holds a type-erased function reference.
#[derive(Clone)]
pub struct CustomEmbedding {
    /// Name reported as the model.
    pub model: String,
    /// The user-supplied embedding function.
    pub embed_fn: CustomEmbedFn,
}

impl CustomEmbedding {
    /// Create a custom embedding provider with the given function.
    pub fn new<F>(model: impl Into<String>, embed_fn: F) -> Self
    where
        F: Fn(&[String]) -> Result<Embeddings> + Send + Sync + 'static,
    {
        Self {
            model: model.into(),
            embed_fn: Arc::new(embed_fn),
        }
    }
}

impl std::fmt::Debug for CustomEmbedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomEmbedding")
            .field("model", &self.model)
            .field("embed_fn", &"<custom function>")
            .finish()
    }
}

#[async_trait]
impl EmbeddingFunction for CustomEmbedding {
    async fn embed(&self, input: &[String]) -> Result<Embeddings> {
        (self.embed_fn)(input)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
