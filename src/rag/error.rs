//! Error types for the RAG pipeline.
//!
//! Corresponds to the ad hoc `ValueError` / `FileNotFoundError` /
//! `RuntimeError` raises scattered across `crewai_tools/rag/` and
//! `crewai_tools/adapters/`, collapsed into one typed loader error and one
//! crate-level error.

use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// LoadError
// ---------------------------------------------------------------------------

/// Classification of a loader failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    /// The referenced local file does not exist.
    NotFound,
    /// The source is not of the format the loader handles.
    InvalidFormat,
    /// The document is encrypted and no password was supplied.
    Encrypted,
    /// The supplied password did not decrypt the document.
    Decryption,
    /// A requested page index is outside the document.
    PageOutOfRange,
    /// Fetching a remote source failed.
    Network,
    /// Structured content (CSV/JSON/XML) could not be parsed.
    Parse,
    /// Local I/O failed.
    Io,
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::InvalidFormat => "invalid format",
            Self::Encrypted => "encrypted",
            Self::Decryption => "decryption failed",
            Self::PageOutOfRange => "page out of range",
            Self::Network => "network error",
            Self::Parse => "parse error",
            Self::Io => "io error",
        };
        write!(f, "{}", s)
    }
}

/// A failure while loading one content item.
///
/// Every loader returns this type, so callers can decide per item whether to
/// abort or skip-and-continue (directory ingestion does the latter).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LoadError {
    /// What went wrong.
    pub kind: LoadErrorKind,
    /// The content reference that was being loaded.
    pub source_ref: String,
    /// Human-readable description, including the underlying cause.
    pub message: String,
}

impl LoadError {
    /// Create a new load error.
    pub fn new(
        kind: LoadErrorKind,
        source_ref: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source_ref: source_ref.into(),
            message: message.into(),
        }
    }

    pub fn not_found(source_ref: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LoadErrorKind::NotFound, source_ref, message)
    }

    pub fn invalid_format(source_ref: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LoadErrorKind::InvalidFormat, source_ref, message)
    }

    pub fn network(source_ref: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LoadErrorKind::Network, source_ref, message)
    }

    pub fn parse(source_ref: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(LoadErrorKind::Parse, source_ref, message)
    }

    pub fn io(source_ref: impl Into<String>, err: &std::io::Error) -> Self {
        let source_ref = source_ref.into();
        let message = format!("Failed to read {}: {}", source_ref, err);
        Self::new(LoadErrorKind::Io, source_ref, message)
    }
}

// ---------------------------------------------------------------------------
// RagError
// ---------------------------------------------------------------------------

/// Crate-level error for ingestion, embedding, storage and retrieval.
#[derive(Debug, Error)]
pub enum RagError {
    /// A content item could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The embedding provider failed or returned malformed data.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// A vector store operation failed.
    #[error("Vector store error: {0}")]
    Store(String),

    /// A remote search backend (e.g. Elasticsearch) rejected an operation.
    #[error("{backend} error: {message}")]
    Backend { backend: String, message: String },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A data type name did not match any known `DataType`.
    #[error("Unknown data type: {0}")]
    UnknownDataType(String),

    /// SQLite failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Build a backend error for the named remote store.
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, RagError>;
