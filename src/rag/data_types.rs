//! Data type classification and loader dispatch.
//!
//! Corresponds to `crewai_tools/rag/data_types.py`.
//!
//! `DataTypes::from_content` classifies a content reference (URL, path, or
//! inline text) and `DataType::get_loader` maps the classification to a
//! loader through a fixed `match`, so there is no runtime lookup to fail.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::rag::error::RagError;
use crate::rag::loaders::{
    BaseLoader, CsvLoader, DirectoryLoader, DocxLoader, JsonLoader, MdxLoader, PdfLoader,
    TextFileLoader, TextLoader, WebPageLoader, XmlLoader,
};
use crate::rag::source_content::{file_url_path, parse_network_url};

/// Shape or origin of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    PdfFile,
    TextFile,
    Csv,
    Json,
    Txt,
    Xml,
    Docx,
    Mdx,

    // Database types
    Mysql,
    Postgres,

    // Repository types
    Github,
    Directory,

    // Web types
    Website,
    DocsSite,

    // Raw types
    Text,
    Raw,
}

impl DataType {
    /// Every variant, in declaration order.
    pub const ALL: [DataType; 16] = [
        DataType::PdfFile,
        DataType::TextFile,
        DataType::Csv,
        DataType::Json,
        DataType::Txt,
        DataType::Xml,
        DataType::Docx,
        DataType::Mdx,
        DataType::Mysql,
        DataType::Postgres,
        DataType::Github,
        DataType::Directory,
        DataType::Website,
        DataType::DocsSite,
        DataType::Text,
        DataType::Raw,
    ];

    /// The wire name of this data type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PdfFile => "pdf_file",
            Self::TextFile => "text_file",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Txt => "txt",
            Self::Xml => "xml",
            Self::Docx => "docx",
            Self::Mdx => "mdx",
            Self::Mysql => "mysql",
            Self::Postgres => "postgres",
            Self::Github => "github",
            Self::Directory => "directory",
            Self::Website => "website",
            Self::DocsSite => "docs_site",
            Self::Text => "text",
            Self::Raw => "raw",
        }
    }

    /// Whether content of this type normally lives in a local file.
    pub fn is_file_based(&self) -> bool {
        matches!(
            self,
            Self::PdfFile
                | Self::TextFile
                | Self::Csv
                | Self::Json
                | Self::Txt
                | Self::Xml
                | Self::Docx
                | Self::Mdx
        )
    }

    /// Return the loader responsible for this data type.
    ///
    /// Types without a dedicated loader (raw text, database references)
    /// fall back to the plain [`TextLoader`].
    pub fn get_loader(&self) -> Box<dyn BaseLoader> {
        match self {
            Self::PdfFile => Box::new(PdfLoader::new()),
            Self::TextFile | Self::Txt => Box::new(TextFileLoader::new()),
            Self::Csv => Box::new(CsvLoader::new()),
            Self::Json => Box::new(JsonLoader::new()),
            Self::Xml => Box::new(XmlLoader::new()),
            Self::Docx => Box::new(DocxLoader::new()),
            Self::Mdx => Box::new(MdxLoader::new()),
            Self::Directory => Box::new(DirectoryLoader::new()),
            Self::Website | Self::DocsSite | Self::Github => Box::new(WebPageLoader::new()),
            Self::Text | Self::Raw | Self::Mysql | Self::Postgres => Box::new(TextLoader::new()),
        }
    }

    /// Map a file extension (without the dot) to a data type.
    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::PdfFile),
            "csv" => Some(Self::Csv),
            "mdx" | "md" => Some(Self::Mdx),
            "docx" => Some(Self::Docx),
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            "txt" => Some(Self::TextFile),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DataType {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized == "pdf" {
            return Ok(Self::PdfFile);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|dt| dt.as_str() == normalized)
            .ok_or_else(|| RagError::UnknownDataType(s.to_string()))
    }
}

/// Resolver from content references to [`DataType`]s.
pub struct DataTypes;

impl DataTypes {
    /// Classify a content reference. Never fails; unknown input is `Text`.
    pub fn from_content(content: Option<&str>) -> DataType {
        let content = match content {
            Some(c) => c,
            None => return DataType::Text,
        };

        if let Some(data_type) = Self::classify_url(content) {
            return data_type;
        }

        let file_url = file_url_path(content);
        let path = file_url.as_deref().unwrap_or_else(|| Path::new(content));
        if path.is_file() {
            return path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(DataType::from_extension)
                .unwrap_or(DataType::TextFile);
        }
        if path.is_dir() {
            return DataType::Directory;
        }
        if file_url.is_some() {
            // A missing file still names a file, not inline text.
            return path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(DataType::from_extension)
                .unwrap_or(DataType::TextFile);
        }

        DataType::Text
    }

    /// Classify a filesystem path.
    pub fn from_path(path: &Path) -> DataType {
        Self::from_content(Some(&path.to_string_lossy()))
    }

    /// Classify `content` if it is a network URL (scheme + host).
    fn classify_url(content: &str) -> Option<DataType> {
        let url = parse_network_url(content)?;

        let by_suffix = Path::new(url.path())
            .extension()
            .and_then(|e| e.to_str())
            .and_then(DataType::from_extension);
        if let Some(data_type) = by_suffix {
            return Some(data_type);
        }

        let host = url.host_str().unwrap_or_default();
        if host.contains("docs") || url.path().contains("docs") {
            return Some(DataType::DocsSite);
        }
        if host.contains("github.com") {
            return Some(DataType::Github);
        }
        Some(DataType::Website)
    }
}
