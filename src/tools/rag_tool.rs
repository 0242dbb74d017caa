//! Knowledge-base tool.
//!
//! Corresponds to `crewai_tools/tools/rag/rag_tool.py`.
//!
//! `RagTool` answers a `query` argument from an [`Adapter`]. The adapter is
//! either injected or built on first use from the tool's [`RagToolConfig`];
//! answers are memoised in a per-tool [`QueryCache`] that every `add` clears.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use crate::adapters::{AddOptions, Adapter, ContentItem, CustomAdapter, CustomRagAdapter};
use crate::rag::cache::QueryCache;
use crate::rag::config::RagToolConfig;
use crate::rag::error::Result;
use crate::tools::base_tool::{required_str_arg, BaseTool, EnvVar, ToolError};

pub const DEFAULT_NAME: &str = "Knowledge base";
pub const DEFAULT_DESCRIPTION: &str = "A knowledge base that can be used to answer questions.";

pub struct RagTool {
    pub name: String,
    pub description: String,
    pub summarize: bool,
    pub config: RagToolConfig,
    adapter: OnceCell<Arc<dyn Adapter>>,
    cache: QueryCache,
    /// Bumped by every `add`; answers computed across a bump are not cached.
    generation: AtomicU64,
    env_vars: Vec<EnvVar>,
}

impl std::fmt::Debug for RagTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagTool")
            .field("name", &self.name)
            .field("summarize", &self.summarize)
            .field("config", &self.config)
            .field("adapter_ready", &self.adapter.initialized())
            .field("cached_queries", &self.cache.len())
            .finish()
    }
}

impl Default for RagTool {
    fn default() -> Self {
        Self::new(RagToolConfig::default())
    }
}

impl RagTool {
    /// A tool whose adapter is built from `config` on first use.
    pub fn new(config: RagToolConfig) -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            summarize: config.summarize,
            cache: QueryCache::new(config.cache_size),
            config,
            adapter: OnceCell::new(),
            generation: AtomicU64::new(0),
            env_vars: vec![
                EnvVar::optional("OPENAI_API_KEY", "API key for OpenAI embeddings"),
                EnvVar::optional("CREWAI_RAG_PERSIST_DIR", "Directory for the SQLite vector store"),
            ],
        }
    }

    /// A tool over an existing adapter.
    pub fn with_adapter(adapter: Arc<dyn Adapter>) -> Self {
        let tool = Self::new(RagToolConfig::default());
        // A fresh cell cannot already be set.
        let _ = tool.adapter.set(adapter);
        tool
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_summarize(mut self, summarize: bool) -> Self {
        self.summarize = summarize;
        self
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// The adapter, building the default one on first call.
    pub async fn adapter(&self) -> &Arc<dyn Adapter> {
        self.adapter
            .get_or_init(|| async { self.default_adapter() })
            .await
    }

    fn default_adapter(&self) -> Arc<dyn Adapter> {
        let mut config = self.config.clone();
        config.summarize = self.summarize;
        match CustomRagAdapter::from_config(&config) {
            Ok(adapter) => {
                log::info!(
                    "RagTool using collection {} with model {}",
                    adapter.collection_name,
                    adapter.embedding_model
                );
                Arc::new(adapter)
            }
            Err(e) => {
                log::warn!(
                    "Could not build the RAG adapter ({}), falling back to the in-memory adapter",
                    e
                );
                Arc::new(CustomAdapter::new(self.summarize))
            }
        }
    }

    /// Add content to the knowledge base and invalidate cached answers.
    pub async fn add(&self, items: &[ContentItem], options: &AddOptions) -> Result<()> {
        let adapter = self.adapter().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        let result = adapter.add(items, options).await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.clear();
        result
    }

    /// Answer `question`, prefixed with `"Relevant Content:\n"`.
    pub async fn query(&self, question: &str) -> Result<String> {
        if let Some(hit) = self.cache.get(question) {
            log::debug!("Query cache hit for {:?}", question);
            return Ok(hit);
        }
        let generation = self.generation.load(Ordering::SeqCst);
        let answer = self.adapter().await.query(question).await?;
        let rendered = format!("Relevant Content:\n{}", answer);
        if self.generation.load(Ordering::SeqCst) == generation {
            self.cache.put(question, rendered.clone());
        }
        Ok(rendered)
    }
}

#[async_trait]
impl BaseTool for RagTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn args_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The question to answer from the knowledge base"
                }
            },
            "required": ["query"]
        })
    }

    fn env_vars(&self) -> &[EnvVar] {
        &self.env_vars
    }

    async fn run(&self, args: HashMap<String, Value>) -> std::result::Result<Value, ToolError> {
        let question = required_str_arg(&args, "query")?;
        Ok(Value::String(self.query(question).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::custom_adapter::NO_INFORMATION;
    use crate::rag::config::EmbedderConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingAdapter {
        queries: AtomicUsize,
        adds: AtomicUsize,
    }

    #[async_trait]
    impl Adapter for CountingAdapter {
        async fn query(&self, question: &str) -> Result<String> {
            let n = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("{} #{}", question, n))
        }

        async fn add(&self, _items: &[ContentItem], _options: &AddOptions) -> Result<()> {
            self.adds.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_prefixes_answer() {
        let tool = RagTool::with_adapter(Arc::new(CustomAdapter::new(false)));
        tool.add(&[ContentItem::record(Some("a"), "rust is fast")], &AddOptions::default())
            .await
            .unwrap();

        let mut args = HashMap::new();
        args.insert("query".to_string(), json!("what is rust?"));
        let out = tool.run(args).await.unwrap();
        assert_eq!(out, json!("Relevant Content:\nrust is fast"));
    }

    #[tokio::test]
    async fn test_run_requires_query() {
        let tool = RagTool::with_adapter(Arc::new(CustomAdapter::new(false)));
        let err = tool.run(HashMap::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::MissingArgument(ref name) if name == "query"));
    }

    #[tokio::test]
    async fn test_answers_are_cached_until_add() {
        let adapter = Arc::new(CountingAdapter::default());
        let tool = RagTool::with_adapter(adapter.clone());

        assert_eq!(tool.query("q").await.unwrap(), "Relevant Content:\nq #1");
        assert_eq!(tool.query("q").await.unwrap(), "Relevant Content:\nq #1");
        assert_eq!(adapter.queries.load(Ordering::SeqCst), 1);
        assert_eq!(tool.cache().stats().hits, 1);

        tool.add(&[ContentItem::from("new")], &AddOptions::default())
            .await
            .unwrap();
        assert_eq!(adapter.adds.load(Ordering::SeqCst), 1);
        assert!(tool.cache().is_empty());
        assert_eq!(tool.query("q").await.unwrap(), "Relevant Content:\nq #2");
    }

    /// Answers with the number of adds seen when the query started; the
    /// first query parks until released.
    #[derive(Default)]
    struct SlowAdapter {
        adds: AtomicUsize,
        parked: std::sync::atomic::AtomicBool,
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl Adapter for SlowAdapter {
        async fn query(&self, _question: &str) -> Result<String> {
            let version = self.adds.load(Ordering::SeqCst);
            if !self.parked.swap(true, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(format!("version {}", version))
        }

        async fn add(&self, _items: &[ContentItem], _options: &AddOptions) -> Result<()> {
            self.adds.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_answer_from_before_add_is_not_cached() {
        let adapter = Arc::new(SlowAdapter::default());
        let tool = Arc::new(RagTool::with_adapter(adapter.clone()));

        let in_flight = {
            let tool = Arc::clone(&tool);
            tokio::spawn(async move { tool.query("q").await })
        };
        adapter.entered.notified().await;
        tool.add(&[ContentItem::from("new")], &AddOptions::default())
            .await
            .unwrap();
        adapter.release.notify_one();

        assert_eq!(
            in_flight.await.unwrap().unwrap(),
            "Relevant Content:\nversion 0"
        );
        assert!(tool.cache().is_empty());
        assert_eq!(tool.query("q").await.unwrap(), "Relevant Content:\nversion 1");
        assert_eq!(tool.query("q").await.unwrap(), "Relevant Content:\nversion 1");
        assert_eq!(tool.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_in_memory_adapter() {
        let config = RagToolConfig {
            embedder: EmbedderConfig::new("custom", "unused"),
            ..RagToolConfig::default()
        };
        let tool = RagTool::new(config);
        assert_eq!(
            tool.query("anything").await.unwrap(),
            format!("Relevant Content:\n{}", NO_INFORMATION)
        );
    }

    #[test]
    fn test_tool_metadata() {
        let tool = RagTool::default().with_name("Docs");
        assert_eq!(tool.name(), "Docs");
        assert_eq!(tool.description(), DEFAULT_DESCRIPTION);
        assert_eq!(tool.args_schema()["required"], json!(["query"]));
        assert!(!tool.result_as_answer());
        assert_eq!(tool.env_vars().len(), 2);
    }
}
