//! Knowledge-base adapters.
//!
//! Corresponds to `crewai_tools/adapters/` and the `Adapter` ABC in
//! `crewai_tools/tools/rag/rag_tool.py`.
//!
//! An [`Adapter`] answers questions from, and accepts content into, some
//! knowledge base. `RagTool` and every other caller depend on the trait only.
//!
//! | Adapter | Backing store |
//! |---|---|
//! | [`CustomAdapter`] | in-memory source → contents map |
//! | [`CustomPdfAdapter`] | same, scoped to the last added PDF |
//! | [`CrewAIRagAdapter`] | any [`BaseClient`](crate::rag::core::BaseClient) |
//! | [`CustomRagAdapter`] | chunk + embed + vector store, full local pipeline |
//! | [`ElasticsearchAdapter`] | remote Elasticsearch index |

pub mod crewai_rag_adapter;
pub mod custom_adapter;
pub mod custom_pdf_adapter;
pub mod custom_rag_adapter;
pub mod elasticsearch_adapter;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rag::data_types::DataType;
use crate::rag::error::Result;
use crate::rag::loaders::LoadOptions;

pub use crewai_rag_adapter::{CrewAIRagAdapter, IngestReport};
pub use custom_adapter::{CustomAdapter, SimpleVectorStore};
pub use custom_pdf_adapter::CustomPdfAdapter;
pub use custom_rag_adapter::{CollectionInfo, CustomRagAdapter, Document};
pub use elasticsearch_adapter::{ElasticsearchAdapter, ElasticsearchAuth};

// ---------------------------------------------------------------------------
// ContentItem
// ---------------------------------------------------------------------------

/// One item handed to [`Adapter::add`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentItem {
    /// A content reference or inline text; resolved by data type.
    Text(String),
    /// A local file or directory.
    Path(PathBuf),
    /// An explicit record. `source` is loaded when `content` is absent.
    Record {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default)]
        metadata: HashMap<String, Value>,
    },
}

impl ContentItem {
    /// A record carrying inline content.
    pub fn record(source: Option<&str>, content: impl Into<String>) -> Self {
        Self::Record {
            source: source.map(str::to_string),
            content: Some(content.into()),
            metadata: HashMap::new(),
        }
    }

    /// The reference used to resolve this item's data type: the text, the
    /// path, or a record's `source` falling back to its `content`.
    pub fn source_ref(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Path(path) => path.to_string_lossy().to_string(),
            Self::Record {
                source, content, ..
            } => source
                .clone()
                .or_else(|| content.clone())
                .unwrap_or_default(),
        }
    }

    /// Metadata attached to the item itself (records only).
    pub fn metadata(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Self::Record { metadata, .. } => Some(metadata),
            _ => None,
        }
    }
}

impl From<&str> for ContentItem {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ContentItem {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<PathBuf> for ContentItem {
    fn from(p: PathBuf) -> Self {
        Self::Path(p)
    }
}

impl From<&Path> for ContentItem {
    fn from(p: &Path) -> Self {
        Self::Path(p.to_path_buf())
    }
}

// ---------------------------------------------------------------------------
// AddOptions
// ---------------------------------------------------------------------------

/// Options shared by every item of one `add` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddOptions {
    /// Force a data type instead of resolving it per item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    /// Base metadata merged into every stored document.
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    /// Options passed to the loaders.
    #[serde(default)]
    pub load_options: LoadOptions,
}

impl AddOptions {
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_load_options(mut self, load_options: LoadOptions) -> Self {
        self.load_options = load_options;
        self
    }
}

// ---------------------------------------------------------------------------
// Adapter trait
// ---------------------------------------------------------------------------

/// A knowledge base that can be queried and extended.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Answer `question` from the knowledge base.
    async fn query(&self, question: &str) -> Result<String>;

    /// Add content to the knowledge base.
    async fn add(&self, items: &[ContentItem], options: &AddOptions) -> Result<()>;
}

/// Render simple-store matches: best match only when `summarize`, else all.
pub(crate) fn render_matches(matches: Vec<String>, summarize: bool, empty: &str) -> String {
    if matches.is_empty() {
        return empty.to_string();
    }
    if summarize {
        return matches.into_iter().next().unwrap_or_default();
    }
    matches.join("\n\n")
}
