//! Elasticsearch-backed adapter.
//!
//! Corresponds to `crewai_tools/adapters/elasticsearch_adapter.py`.
//!
//! Talks to the Elasticsearch REST API directly over `reqwest`: `_search`
//! for hybrid (vector + keyword) queries and `_bulk` for indexing.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Map, Value};

use crate::adapters::{AddOptions, Adapter, ContentItem};
use crate::rag::config::EmbedderConfig;
use crate::rag::data_types::DataTypes;
use crate::rag::embeddings::{build_embedder, EmbeddingService};
use crate::rag::error::{RagError, Result};
use crate::rag::loaders::BaseLoader;
use crate::rag::source_content::SourceContent;

const BACKEND: &str = "Elasticsearch";

/// Embedding model used when no embedder is supplied.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Default number of hits per query.
pub const DEFAULT_TOP_K: usize = 3;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials sent with every request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ElasticsearchAuth {
    #[default]
    None,
    /// `Authorization: ApiKey <key>`.
    ApiKey(String),
    /// HTTP basic authentication.
    Basic { username: String, password: String },
}

impl ElasticsearchAuth {
    fn header(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::ApiKey(key) => Some(format!("ApiKey {}", key)),
            Self::Basic { username, password } => {
                let credentials = format!("{}:{}", username, password);
                let encoded =
                    base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
                Some(format!("Basic {}", encoded))
            }
        }
    }
}

/// Decode an Elastic Cloud id (`name:base64(host$es_uuid$kibana_uuid)`)
/// into the cluster URL.
pub fn cloud_id_to_url(cloud_id: &str) -> Result<String> {
    let invalid = |why: &str| RagError::Config(format!("Invalid cloud_id {}: {}", cloud_id, why));

    let encoded = cloud_id
        .split_once(':')
        .map(|(_, data)| data)
        .unwrap_or(cloud_id);
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(encoded))
        .map_err(|e| invalid(&e.to_string()))?;
    let decoded = String::from_utf8(decoded).map_err(|e| invalid(&e.to_string()))?;

    let mut parts = decoded.split('$');
    let host = parts.next().filter(|h| !h.is_empty()).ok_or_else(|| invalid("missing host"))?;
    let es_uuid = parts
        .next()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| invalid("missing cluster id"))?;

    let (host, port) = match host.rsplit_once(':') {
        Some((h, p)) => (h, p),
        None => (host, "443"),
    };
    Ok(format!("https://{}.{}:{}", es_uuid, host, port))
}

pub struct ElasticsearchAdapter {
    pub es_url: String,
    pub index_name: String,
    pub top_k: usize,
    auth: ElasticsearchAuth,
    embedder: EmbeddingService,
    client: reqwest::Client,
}

impl std::fmt::Debug for ElasticsearchAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchAdapter")
            .field("es_url", &self.es_url)
            .field("index_name", &self.index_name)
            .field("top_k", &self.top_k)
            .field("embedder", &self.embedder)
            .finish()
    }
}

impl ElasticsearchAdapter {
    pub fn new(
        es_url: impl Into<String>,
        index_name: impl Into<String>,
        embedder: EmbeddingService,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            es_url: es_url.into().trim_end_matches('/').to_string(),
            index_name: index_name.into(),
            top_k: DEFAULT_TOP_K,
            auth: ElasticsearchAuth::None,
            embedder,
            client,
        })
    }

    /// Use OpenAI `text-embedding-ada-002` embeddings.
    pub fn with_default_embedder(
        es_url: impl Into<String>,
        index_name: impl Into<String>,
    ) -> Result<Self> {
        let embedder = build_embedder(&EmbedderConfig::new("openai", DEFAULT_EMBEDDING_MODEL))?;
        Self::new(es_url, index_name, embedder)
    }

    /// Authenticate with an API key. Takes precedence over basic auth.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.auth = ElasticsearchAuth::ApiKey(api_key.into());
        self
    }

    /// Authenticate with username and password unless an API key is set.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        if !matches!(self.auth, ElasticsearchAuth::ApiKey(_)) {
            self.auth = ElasticsearchAuth::Basic {
                username: username.into(),
                password: password.into(),
            };
        }
        self
    }

    /// Connect to an Elastic Cloud deployment instead of `es_url`.
    pub fn with_cloud_id(mut self, cloud_id: &str) -> Result<Self> {
        self.es_url = cloud_id_to_url(cloud_id)?;
        Ok(self)
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn auth(&self) -> &ElasticsearchAuth {
        &self.auth
    }

    /// Hybrid query: cosine similarity on `embedding` plus a boosted
    /// keyword match on `text`.
    pub fn search_body(&self, question: &str, query_vector: &[f32]) -> Value {
        json!({
            "query": {
                "bool": {
                    "should": [
                        {
                            "script_score": {
                                "query": {"match_all": {}},
                                "script": {
                                    "source": "cosineSimilarity(params.query_vector, 'embedding') + 1.0",
                                    "params": {"query_vector": query_vector}
                                }
                            }
                        },
                        {
                            "match": {
                                "text": {
                                    "query": question,
                                    "boost": 0.3
                                }
                            }
                        }
                    ]
                }
            },
            "size": self.top_k
        })
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(format!("{}/{}/{}", self.es_url, self.index_name, path));
        if let Some(header) = self.auth.header() {
            request = request.header(reqwest::header::AUTHORIZATION, header);
        }
        request
    }

    async fn send(&self, request: reqwest::RequestBuilder, operation: &str) -> Result<Value> {
        let response = request.send().await.map_err(|e| {
            log::error!("Elasticsearch {} failed: {}", operation, e);
            RagError::backend(BACKEND, format!("{} failed: {}", operation, e))
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| {
            log::error!(
                "Elasticsearch {} returned {} with an unreadable body: {}",
                operation,
                status,
                e
            );
            RagError::backend(
                BACKEND,
                format!(
                    "{} failed with status {}: could not read response body: {}",
                    operation,
                    status.as_u16(),
                    e
                ),
            )
        })?;
        if !status.is_success() {
            log::error!("Elasticsearch {} returned {}: {}", operation, status, body);
            return Err(RagError::backend(
                BACKEND,
                format!("{} failed with status {}: {}", operation, status.as_u16(), body),
            ));
        }
        serde_json::from_str(&body).map_err(|e| {
            RagError::backend(BACKEND, format!("{} returned invalid JSON: {}", operation, e))
        })
    }

    /// Inline text and record content are indexed verbatim; anything else is
    /// loaded through its data type's loader first.
    async fn item_text(&self, item: &ContentItem, options: &AddOptions) -> Result<String> {
        match item {
            ContentItem::Text(text) => Ok(text.clone()),
            ContentItem::Record {
                content: Some(content),
                ..
            } => Ok(content.clone()),
            other => {
                let source_ref = other.source_ref();
                let data_type = options
                    .data_type
                    .unwrap_or_else(|| DataTypes::from_content(Some(&source_ref)));
                let result = data_type
                    .get_loader()
                    .load(&SourceContent::new(&source_ref), &options.load_options)
                    .await?;
                Ok(result.content)
            }
        }
    }
}

#[async_trait]
impl Adapter for ElasticsearchAdapter {
    async fn query(&self, question: &str) -> Result<String> {
        let query_vector = self.embedder.embed_text(question).await?;
        let body = self.search_body(question, &query_vector);
        let response = self.send(self.request("_search").json(&body), "search").await?;

        let hits = response["hits"]["hits"].as_array().cloned().unwrap_or_default();
        let texts: Vec<&str> = hits
            .iter()
            .filter_map(|hit| hit["_source"]["text"].as_str())
            .collect();
        Ok(texts.join("\n"))
    }

    async fn add(&self, items: &[ContentItem], options: &AddOptions) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let mut texts = Vec::with_capacity(items.len());
        for item in items {
            texts.push(self.item_text(item, options).await?);
        }
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let mut ndjson = String::new();
        let action = json!({"index": {"_index": self.index_name}}).to_string();
        for ((item, text), embedding) in items.iter().zip(texts).zip(embeddings) {
            let mut doc = Map::new();
            for (key, value) in &options.metadata {
                doc.insert(key.clone(), value.clone());
            }
            if let Some(item_metadata) = item.metadata() {
                for (key, value) in item_metadata {
                    doc.insert(key.clone(), value.clone());
                }
            }
            doc.insert("text".to_string(), Value::from(text));
            doc.insert("embedding".to_string(), json!(embedding));

            ndjson.push_str(&action);
            ndjson.push('\n');
            ndjson.push_str(&Value::Object(doc).to_string());
            ndjson.push('\n');
        }

        let request = self
            .request("_bulk")
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(ndjson);
        let response = self.send(request, "bulk indexing").await?;

        if response["errors"].as_bool().unwrap_or(false) {
            let items = response["items"].as_array().cloned().unwrap_or_default();
            let failed: Vec<String> = items
                .iter()
                .filter_map(|i| i["index"]["error"]["reason"].as_str().map(str::to_string))
                .collect();
            log::error!(
                "Elasticsearch bulk indexing rejected {} of {} documents",
                failed.len(),
                items.len()
            );
            return Err(RagError::backend(
                BACKEND,
                format!(
                    "bulk indexing rejected {} of {} documents: {}",
                    failed.len(),
                    items.len(),
                    failed.first().map(String::as_str).unwrap_or("unknown error")
                ),
            ));
        }
        log::info!("Indexed {} documents into {}", items.len(), self.index_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::embeddings::testing::letter_embedder;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_cloud_id_decoding() {
        let payload = base64::engine::general_purpose::STANDARD
            .encode("us-east-1.aws.found.io$abc123$kib456");
        let url = cloud_id_to_url(&format!("my-deploy:{}", payload)).unwrap();
        assert_eq!(url, "https://abc123.us-east-1.aws.found.io:443");

        let with_port = base64::engine::general_purpose::STANDARD
            .encode("example.com:9243$cluster$kibana");
        assert_eq!(
            cloud_id_to_url(&format!("x:{}", with_port)).unwrap(),
            "https://cluster.example.com:9243"
        );

        assert!(cloud_id_to_url("x:!!!").is_err());
    }

    #[test]
    fn test_auth_headers() {
        assert_eq!(ElasticsearchAuth::None.header(), None);
        assert_eq!(
            ElasticsearchAuth::ApiKey("k".to_string()).header().as_deref(),
            Some("ApiKey k")
        );
        let basic = ElasticsearchAuth::Basic {
            username: "elastic".to_string(),
            password: "pw".to_string(),
        };
        assert_eq!(basic.header().as_deref(), Some("Basic ZWxhc3RpYzpwdw=="));

        let adapter = ElasticsearchAdapter::new("http://localhost:9200", "kb", letter_embedder())
            .unwrap()
            .with_api_key("key")
            .with_basic_auth("u", "p");
        assert_eq!(adapter.auth(), &ElasticsearchAuth::ApiKey("key".to_string()));
    }

    #[test]
    fn test_search_body_shape() {
        let adapter = ElasticsearchAdapter::new("http://localhost:9200/", "kb", letter_embedder())
            .unwrap();
        assert_eq!(adapter.es_url, "http://localhost:9200");
        let body = adapter.search_body("rust", &[0.5, 1.0]);
        assert_eq!(body["size"], json!(3));
        let should = body["query"]["bool"]["should"].as_array().unwrap();
        assert_eq!(
            should[0]["script_score"]["script"]["params"]["query_vector"],
            json!([0.5, 1.0])
        );
        assert_eq!(should[1]["match"]["text"]["boost"], json!(0.3));
    }

    #[tokio::test]
    async fn test_query_and_bulk_add() {
        let bulk_bodies: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&bulk_bodies);
        let router = Router::new()
            .route(
                "/kb/_search",
                post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("ApiKey secret") {
                        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})));
                    }
                    assert_eq!(body["size"], json!(2));
                    (
                        StatusCode::OK,
                        Json(json!({"hits": {"hits": [
                            {"_source": {"text": "first hit"}},
                            {"_source": {"text": "second hit"}}
                        ]}})),
                    )
                }),
            )
            .route(
                "/kb/_bulk",
                post(move |body: String| {
                    let captured = Arc::clone(&captured);
                    async move {
                        captured.lock().push(body);
                        Json(json!({"errors": false, "items": []}))
                    }
                }),
            );
        let base = serve(router).await;

        let adapter = ElasticsearchAdapter::new(&base, "kb", letter_embedder())
            .unwrap()
            .with_api_key("secret")
            .with_top_k(2);
        assert_eq!(adapter.query("anything").await.unwrap(), "first hit\nsecond hit");

        let mut metadata = HashMap::new();
        metadata.insert("team".to_string(), json!("docs"));
        adapter
            .add(
                &[ContentItem::from("alpha"), ContentItem::from("beta")],
                &AddOptions::default().with_metadata(metadata),
            )
            .await
            .unwrap();

        let bodies = bulk_bodies.lock();
        let lines: Vec<&str> = bodies[0].lines().collect();
        assert_eq!(lines.len(), 4);
        let action: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], json!("kb"));
        let doc: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(doc["text"], json!("alpha"));
        assert_eq!(doc["team"], json!("docs"));
        assert_eq!(doc["embedding"].as_array().unwrap().len(), 26);
    }

    #[tokio::test]
    async fn test_failures_become_backend_errors() {
        let router = Router::new()
            .route(
                "/kb/_search",
                post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
            )
            .route(
                "/kb/_bulk",
                post(|| async {
                    Json(json!({"errors": true, "items": [
                        {"index": {"status": 400, "error": {"reason": "mapper_parsing_exception"}}}
                    ]}))
                }),
            );
        let base = serve(router).await;
        let adapter = ElasticsearchAdapter::new(&base, "kb", letter_embedder()).unwrap();

        let err = adapter.query("q").await.unwrap_err();
        assert!(matches!(err, RagError::Backend { .. }));
        assert!(err.to_string().contains("500"));

        let err = adapter
            .add(&[ContentItem::from("x")], &AddOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("mapper_parsing_exception"));
    }

    /// Answer one request with `head` and a body shorter than its
    /// declared length, then hang up.
    async fn serve_truncated(head: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_lowercase();
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(b"partial").await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_unreadable_error_body_is_reported() {
        let base = serve_truncated(
            "HTTP/1.1 503 Service Unavailable\r\ncontent-type: text/plain\r\ncontent-length: 64\r\n\r\n",
        )
        .await;
        let adapter = ElasticsearchAdapter::new(&base, "kb", letter_embedder()).unwrap();

        let err = adapter.query("anything").await.unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, RagError::Backend { .. }), "{}", message);
        assert!(message.contains("status 503"), "{}", message);
        assert!(message.contains("could not read response body"), "{}", message);
    }
}
