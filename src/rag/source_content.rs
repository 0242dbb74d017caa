//! Content reference handed to loaders.
//!
//! Corresponds to `crewai_tools/rag/source_content.py`.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::rag::data_types::{DataType, DataTypes};

/// A content reference: a URL, a local path, or inline text.
///
/// Classification is done on demand; nothing is cached because the
/// filesystem may change between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContent {
    /// The raw reference as given by the caller.
    pub source_ref: String,
}

impl SourceContent {
    /// Wrap a content reference.
    pub fn new(source_ref: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
        }
    }

    /// Wrap a filesystem path.
    pub fn from_path(path: &Path) -> Self {
        Self::new(path.to_string_lossy().to_string())
    }

    /// Whether the reference is a network URL (has both scheme and host).
    pub fn is_url(&self) -> bool {
        parse_network_url(&self.source_ref).is_some()
    }

    /// Parsed URL, if the reference is one.
    pub fn url(&self) -> Option<Url> {
        parse_network_url(&self.source_ref)
    }

    /// Whether the reference names an existing file or directory.
    pub fn path_exists(&self) -> bool {
        !self.is_url() && self.as_path().exists()
    }

    /// Whether the reference names an existing regular file.
    pub fn is_file(&self) -> bool {
        !self.is_url() && self.as_path().is_file()
    }

    /// Whether the reference names an existing directory.
    pub fn is_dir(&self) -> bool {
        !self.is_url() && self.as_path().is_dir()
    }

    /// The reference interpreted as a path; `file://` URLs resolve to
    /// their local path.
    pub fn as_path(&self) -> PathBuf {
        file_url_path(&self.source_ref).unwrap_or_else(|| PathBuf::from(&self.source_ref))
    }

    /// Resolve the data type of this reference.
    pub fn data_type(&self) -> DataType {
        DataTypes::from_content(Some(&self.source_ref))
    }
}

impl fmt::Display for SourceContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_ref)
    }
}

impl From<&str> for SourceContent {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceContent {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&Path> for SourceContent {
    fn from(p: &Path) -> Self {
        Self::from_path(p)
    }
}

/// Parse `s` as a URL with both a scheme and a non-empty host.
pub(crate) fn parse_network_url(s: &str) -> Option<Url> {
    let url = Url::parse(s).ok()?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Some(url),
        _ => None,
    }
}

/// The local path named by a `file://` URL.
pub(crate) fn file_url_path(s: &str) -> Option<PathBuf> {
    let url = Url::parse(s).ok()?;
    if url.scheme() != "file" {
        return None;
    }
    url.to_file_path().ok()
}
