//! OpenAI embedding provider.
//!
//! Port of crewai/rag/embeddings/providers/openai/
//!
//! Generates embeddings through the OpenAI Embeddings API, or any server
//! exposing the same `POST {api_base}/embeddings` contract. Requires an
//! `OPENAI_API_KEY` environment variable or explicit API key configuration
//! when talking to the hosted API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::rag::config::EmbedderConfig;
use crate::rag::embeddings::EmbeddingFunction;
use crate::rag::error::{RagError, Result};
use crate::rag::types::Embeddings;

/// Default endpoint of the hosted API.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Routing prefixes dropped from model names before they go on the wire.
pub const ROUTING_PREFIXES: &[&str] = &["openai", "ollama"];

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// OpenAI-compatible embedding function.
///
/// Model names may carry a known `provider/` routing prefix
/// (`openai/text-embedding-3-small`); that prefix is dropped before the
/// request is sent. Other slashes are part of the model name
/// (`BAAI/bge-small-en-v1.5`).
#[derive(Debug, Clone)]
pub struct OpenAIEmbedding {
    client: reqwest::Client,
    model: String,
    api_key: Option<String>,
    api_base: String,
    dimensions: Option<usize>,
    extra: HashMap<String, Value>,
}

impl OpenAIEmbedding {
    /// Create a provider for `model` against `api_base`.
    pub fn new(
        model: impl Into<String>,
        api_key: Option<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            model: model.into(),
            api_key,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            dimensions: None,
            extra: HashMap::new(),
        })
    }

    /// Build from an [`EmbedderConfig`]. The hosted API needs an API key.
    pub fn from_config(config: &EmbedderConfig) -> Result<Self> {
        let api_key = config.resolve_api_key();
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        if api_key.is_none() && api_base == DEFAULT_API_BASE {
            return Err(RagError::Config(
                "OpenAI API key not found: set OPENAI_API_KEY or embedder.api_key".to_string(),
            ));
        }

        let mut embedding = Self::new(
            &config.model,
            api_key,
            api_base,
            Duration::from_secs(config.timeout_secs),
        )?;
        embedding.dimensions = config.dimensions;
        Ok(embedding.with_extra(config.extra.clone()))
    }

    /// Builder: requested output dimensions.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Builder: extra fields merged into every request body.
    pub fn with_extra(mut self, extra: HashMap<String, Value>) -> Self {
        self.extra = extra;
        self
    }

    /// The model name as sent on the wire.
    pub fn wire_model(&self) -> &str {
        match self.model.split_once('/') {
            Some((prefix, model))
                if !model.is_empty() && ROUTING_PREFIXES.contains(&prefix) =>
            {
                model
            }
            _ => &self.model,
        }
    }

    pub(crate) fn request_body(&self, input: &[String]) -> Value {
        let mut body = Map::new();
        for (key, value) in &self.extra {
            body.insert(key.clone(), value.clone());
        }
        body.insert("model".to_string(), Value::from(self.wire_model()));
        body.insert("input".to_string(), Value::from(input.to_vec()));
        if let Some(dimensions) = self.dimensions {
            body.insert("dimensions".to_string(), Value::from(dimensions));
        }
        Value::Object(body)
    }
}

#[async_trait]
impl EmbeddingFunction for OpenAIEmbedding {
    async fn embed(&self, input: &[String]) -> Result<Embeddings> {
        log::debug!(
            "OpenAI embed (model={}): {} inputs",
            self.wire_model(),
            input.len()
        );

        let mut request = self
            .client
            .post(format!("{}/embeddings", self.api_base))
            .json(&self.request_body(input));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => format!("<unreadable body: {}>", e),
            };
            return Err(RagError::Embedding(format!(
                "embeddings request failed with status {}: {}",
                status.as_u16(),
                body
            )));
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    #[test]
    fn test_wire_model_strips_routing_prefix() {
        let e = OpenAIEmbedding::new("openai/text-embedding-3-small", None, "http://x", Duration::from_secs(1)).unwrap();
        assert_eq!(e.wire_model(), "text-embedding-3-small");
        assert_eq!(e.model_name(), "openai/text-embedding-3-small");

        let e = OpenAIEmbedding::new("text-embedding-3-small", None, "http://x", Duration::from_secs(1)).unwrap();
        assert_eq!(e.wire_model(), "text-embedding-3-small");
    }

    #[test]
    fn test_wire_model_keeps_organization_paths() {
        let e = OpenAIEmbedding::new("BAAI/bge-small-en-v1.5", None, "http://x", Duration::from_secs(1)).unwrap();
        assert_eq!(e.wire_model(), "BAAI/bge-small-en-v1.5");

        let e = OpenAIEmbedding::new("ollama/nomic-ai/nomic-embed-text", None, "http://x", Duration::from_secs(1)).unwrap();
        assert_eq!(e.wire_model(), "nomic-ai/nomic-embed-text");
    }

    #[test]
    fn test_hosted_api_requires_key() {
        let config = EmbedderConfig {
            api_key: None,
            ..EmbedderConfig::default()
        };
        // Only meaningful when the environment carries no key.
        if config.resolve_api_key().is_none() {
            assert!(matches!(
                OpenAIEmbedding::from_config(&config),
                Err(RagError::Config(_))
            ));
        }
    }

    #[test]
    fn test_request_body_includes_extras_and_dimensions() {
        let mut config = EmbedderConfig::new("openai", "text-embedding-3-large").with_api_key("k");
        config.dimensions = Some(256);
        config.extra.insert("user".to_string(), json!("crew-1"));
        let e = OpenAIEmbedding::from_config(&config).unwrap();

        let body = e.request_body(&["hi".to_string()]);
        assert_eq!(body["model"], json!("text-embedding-3-large"));
        assert_eq!(body["input"], json!(["hi"]));
        assert_eq!(body["dimensions"], json!(256));
        assert_eq!(body["user"], json!("crew-1"));
    }

    #[tokio::test]
    async fn test_embed_against_compatible_server() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth != "Bearer sk-test" {
                    return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
                }
                let inputs = body["input"].as_array().cloned().unwrap_or_default();
                // Reply out of order to exercise index sorting.
                let data: Vec<Value> = inputs
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(i, text)| {
                        let len = text.as_str().unwrap_or_default().len() as f32;
                        json!({"index": i, "embedding": [len, 1.0]})
                    })
                    .collect();
                (StatusCode::OK, Json(json!({"data": data, "model": body["model"]})))
            }),
        );
        let base = serve(router).await;

        let config = EmbedderConfig::new("openai", "text-embedding-3-small")
            .with_api_key("sk-test")
            .with_api_base(base.clone());
        let e = OpenAIEmbedding::from_config(&config).unwrap();
        let out = e.embed(&["a".to_string(), "abc".to_string()]).await.unwrap();
        assert_eq!(out, vec![vec![1.0, 1.0], vec![3.0, 1.0]]);

        let bad = EmbedderConfig::new("openai", "m")
            .with_api_key("wrong")
            .with_api_base(base);
        let err = OpenAIEmbedding::from_config(&bad)
            .unwrap()
            .embed(&["a".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
    }
}
