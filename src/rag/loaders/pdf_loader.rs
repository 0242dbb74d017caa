//! PDF loader.
//!
//! Corresponds to `crewai_tools/rag/loaders/pdf_loader.py`.
//!
//! Text extraction runs on the blocking pool through `lopdf`. Pages are
//! rendered as `--- Page N ---` sections (1-based headers, 0-based page
//! selection in [`LoadOptions::pages`]). A page that fails to extract is
//! reported inline and does not abort the document.

use std::path::Path;

use async_trait::async_trait;
use lopdf::Document;
use serde_json::{json, Value};

use crate::rag::error::{LoadError, LoadErrorKind};
use crate::rag::loaders::{generate_doc_id, http, BaseLoader, LoadOptions, LoaderResult};
use crate::rag::source_content::SourceContent;

const ACCEPT: &str = "application/pdf";

/// The operations extraction needs from a parsed PDF.
pub(crate) trait PdfDocument {
    fn is_encrypted(&self) -> bool;

    fn decrypt(&mut self, password: &str) -> Result<(), String>;

    fn page_count(&self) -> usize;

    /// Text of the page at 0-based `index`.
    fn page_text(&self, index: usize) -> Result<String, String>;
}

impl PdfDocument for Document {
    fn is_encrypted(&self) -> bool {
        Document::is_encrypted(self)
    }

    fn decrypt(&mut self, password: &str) -> Result<(), String> {
        Document::decrypt(self, password).map_err(|e| e.to_string())
    }

    fn page_count(&self) -> usize {
        self.get_pages().len()
    }

    fn page_text(&self, index: usize) -> Result<String, String> {
        let page_number = self
            .get_pages()
            .keys()
            .nth(index)
            .copied()
            .ok_or_else(|| format!("no page at index {}", index))?;
        self.extract_text(&[page_number]).map_err(|e| e.to_string())
    }
}

/// Text of a document plus whether it had to be decrypted first.
#[derive(Debug)]
pub(crate) struct Extracted {
    pub text: String,
    pub was_encrypted: bool,
}

/// Unlock `doc` if needed and render the selected pages.
pub(crate) fn extract_document<D: PdfDocument>(
    doc: &mut D,
    source_ref: &str,
    pages: Option<&[usize]>,
    password: Option<&str>,
) -> Result<Extracted, LoadError> {
    let was_encrypted = doc.is_encrypted();
    if was_encrypted {
        let password = password.ok_or_else(|| {
            LoadError::new(
                LoadErrorKind::Encrypted,
                source_ref,
                "PDF is encrypted but no password provided",
            )
        })?;
        doc.decrypt(password).map_err(|e| {
            log::debug!("Decrypting {} failed: {}", source_ref, e);
            LoadError::new(
                LoadErrorKind::Decryption,
                source_ref,
                "Failed to decrypt PDF with provided password",
            )
        })?;
    }

    let total = doc.page_count();
    let selected: Vec<usize> = match pages {
        None => (0..total).collect(),
        Some(requested) => {
            if let Some(bad) = requested.iter().find(|&&n| n >= total) {
                return Err(LoadError::new(
                    LoadErrorKind::PageOutOfRange,
                    source_ref,
                    format!(
                        "Page number {} is out of range. PDF has {} pages.",
                        bad, total
                    ),
                ));
            }
            requested.to_vec()
        }
    };

    let mut sections = Vec::with_capacity(selected.len());
    for index in selected {
        match doc.page_text(index) {
            Ok(text) => {
                if !text.trim().is_empty() {
                    sections.push(format!("--- Page {} ---\n{}", index + 1, text.trim_end()));
                }
            }
            Err(e) => {
                log::warn!("Failed to extract page {} of {}: {}", index + 1, source_ref, e);
                sections.push(format!(
                    "--- Page {} ---\n[Error extracting text: {}]",
                    index + 1,
                    e
                ));
            }
        }
    }
    Ok(Extracted {
        text: sections.join("\n\n"),
        was_encrypted,
    })
}

#[derive(Debug, Clone, Default)]
pub struct PdfLoader;

impl PdfLoader {
    pub fn new() -> Self {
        Self
    }

    /// Extract the selected pages of an in-memory PDF.
    fn extract_text(
        bytes: &[u8],
        source_ref: &str,
        pages: Option<&[usize]>,
        password: Option<&str>,
    ) -> Result<Extracted, LoadError> {
        let mut doc = Document::load_mem(bytes).map_err(|e| {
            LoadError::invalid_format(
                source_ref,
                format!("Error extracting text from PDF {}: {}", source_ref, e),
            )
        })?;
        extract_document(&mut doc, source_ref, pages, password)
    }

    fn build_result(
        extracted: Extracted,
        source_ref: &str,
        local_path: Option<&Path>,
        options: &LoadOptions,
    ) -> LoaderResult {
        let content = extracted.text;
        let mut metadata = std::collections::HashMap::new();
        metadata.insert("source_type".to_string(), json!("pdf"));
        metadata.insert(
            "word_count".to_string(),
            json!(content.split_whitespace().count()),
        );
        metadata.insert(
            "character_count".to_string(),
            json!(content.chars().count()),
        );

        if let Some(path) = local_path {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let extension = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            metadata.insert("file_name".to_string(), json!(file_name));
            if let Ok(meta) = std::fs::metadata(path) {
                metadata.insert("file_size".to_string(), json!(meta.len()));
            }
            metadata.insert("file_extension".to_string(), json!(extension));
        }

        if let Some(pages) = &options.pages {
            metadata.insert("extracted_pages".to_string(), json!(pages));
        }
        if extracted.was_encrypted {
            metadata.insert("was_encrypted".to_string(), Value::Bool(true));
        }

        let doc_id = generate_doc_id(source_ref, &content);
        LoaderResult::new(content, source_ref)
            .with_metadata(metadata)
            .with_doc_id(doc_id)
    }
}

#[async_trait]
impl BaseLoader for PdfLoader {
    fn name(&self) -> &'static str {
        "PDFLoader"
    }

    async fn load(
        &self,
        source: &SourceContent,
        options: &LoadOptions,
    ) -> Result<LoaderResult, LoadError> {
        let source_ref = source.source_ref.clone();

        let (bytes, local_path) = if source.is_url() {
            let body = http::fetch(&source_ref, options, self.name(), ACCEPT).await?;
            (body.bytes.to_vec(), None)
        } else if source.path_exists() {
            let path = source.as_path();
            let is_pdf = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
            if !is_pdf {
                return Err(LoadError::invalid_format(
                    &source_ref,
                    format!("File is not a PDF: {}", source_ref),
                ));
            }
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| LoadError::io(&source_ref, &e))?;
            (bytes, Some(path))
        } else {
            return Err(LoadError::not_found(
                &source_ref,
                format!("PDF file not found: {}", source_ref),
            ));
        };

        let pages = options.pages.clone();
        let password = options.password.clone();
        let task_ref = source_ref.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            Self::extract_text(&bytes, &task_ref, pages.as_deref(), password.as_deref())
        })
        .await
        .map_err(|e| {
            LoadError::new(
                LoadErrorKind::Io,
                &source_ref,
                format!("PDF extraction task failed: {}", e),
            )
        })??;

        Ok(Self::build_result(
            extracted,
            &source_ref,
            local_path.as_deref(),
            options,
        ))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extracts_pages_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        fixtures::write_pdf(&path, &["Quarterly revenue grew", "Outlook remains stable"]);

        let result = PdfLoader::new()
            .load(&SourceContent::from_path(&path), &LoadOptions::default())
            .await
            .unwrap();

        assert!(result.content.starts_with("--- Page 1 ---\n"));
        assert!(result.content.contains("Quarterly revenue grew"));
        assert!(result.content.contains("\n\n--- Page 2 ---\n"));
        assert!(result.content.contains("Outlook remains stable"));
        assert_eq!(result.metadata["source_type"], json!("pdf"));
        assert_eq!(result.metadata["file_name"], json!("report.pdf"));
        assert_eq!(result.metadata["file_extension"], json!(".pdf"));
        assert!(result.metadata["file_size"].as_u64().unwrap() > 0);
        assert!(result.metadata["word_count"].as_u64().unwrap() >= 6);
        assert!(result.doc_id.is_some());
    }

    #[tokio::test]
    async fn test_page_selection_and_range_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two.pdf");
        fixtures::write_pdf(&path, &["alpha page", "beta page"]);
        let source = SourceContent::from_path(&path);

        let opts = LoadOptions::default().with_pages(vec![1]);
        let result = PdfLoader::new().load(&source, &opts).await.unwrap();
        assert!(result.content.starts_with("--- Page 2 ---"));
        assert!(!result.content.contains("alpha"));
        assert_eq!(result.metadata["extracted_pages"], json!([1]));

        let opts = LoadOptions::default().with_pages(vec![5]);
        let err = PdfLoader::new().load(&source, &opts).await.unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::PageOutOfRange);
        assert_eq!(
            err.to_string(),
            "Page number 5 is out of range. PDF has 2 pages."
        );
    }

    #[tokio::test]
    async fn test_doc_id_stable_until_content_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        let source = SourceContent::from_path(&path);
        let loader = PdfLoader::new();

        fixtures::write_pdf(&path, &["first version"]);
        let a = loader.load(&source, &LoadOptions::default()).await.unwrap();
        let b = loader.load(&source, &LoadOptions::default()).await.unwrap();
        assert_eq!(a.doc_id, b.doc_id);

        fixtures::write_pdf(&path, &["second version"]);
        let c = loader.load(&source, &LoadOptions::default()).await.unwrap();
        assert_ne!(a.doc_id, c.doc_id);
    }

    #[tokio::test]
    async fn test_missing_and_non_pdf_files() {
        let err = PdfLoader::new()
            .load(&SourceContent::new("/no/such/file.pdf"), &LoadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::NotFound);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain").unwrap();
        let err = PdfLoader::new()
            .load(&SourceContent::from_path(&path), &LoadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::InvalidFormat);
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_invalid_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4 garbage").unwrap();
        let err = PdfLoader::new()
            .load(&SourceContent::from_path(&path), &LoadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::InvalidFormat);
    }

    #[test]
    fn test_encrypted_without_password() {
        let mut doc = fixtures::FakePdf::locked("s3cret", vec![Some("hidden")]);
        let err = extract_document(&mut doc, "locked.pdf", None, None).unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::Encrypted);
        assert_eq!(err.to_string(), "PDF is encrypted but no password provided");
    }

    #[test]
    fn test_encrypted_with_wrong_password() {
        let mut doc = fixtures::FakePdf::locked("s3cret", vec![Some("hidden")]);
        let err = extract_document(&mut doc, "locked.pdf", None, Some("guess")).unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::Decryption);
        assert_eq!(err.to_string(), "Failed to decrypt PDF with provided password");
    }

    #[test]
    fn test_encrypted_with_correct_password() {
        let mut doc = fixtures::FakePdf::locked("s3cret", vec![Some("hidden ledger")]);
        let extracted = extract_document(&mut doc, "locked.pdf", None, Some("s3cret")).unwrap();
        assert!(extracted.was_encrypted);
        assert_eq!(extracted.text, "--- Page 1 ---\nhidden ledger");

        let result = PdfLoader::build_result(
            extracted,
            "locked.pdf",
            None,
            &LoadOptions::default(),
        );
        assert_eq!(result.metadata["was_encrypted"], json!(true));
    }

    #[test]
    fn test_password_on_plain_document_is_ignored() {
        let mut doc = fixtures::FakePdf::plain(vec![Some("open text")]);
        let extracted = extract_document(&mut doc, "open.pdf", None, Some("unused")).unwrap();
        assert!(!extracted.was_encrypted);

        let options = LoadOptions {
            password: Some("unused".to_string()),
            ..LoadOptions::default()
        };
        let result = PdfLoader::build_result(extracted, "open.pdf", None, &options);
        assert!(result.metadata.get("was_encrypted").is_none());
    }

    #[test]
    fn test_failed_page_is_reported_inline() {
        let mut doc = fixtures::FakePdf::plain(vec![Some("first"), None, Some("third")]);
        let extracted = extract_document(&mut doc, "mixed.pdf", None, None).unwrap();
        assert_eq!(
            extracted.text,
            "--- Page 1 ---\nfirst\n\n\
             --- Page 2 ---\n[Error extracting text: unsupported font encoding]\n\n\
             --- Page 3 ---\nthird"
        );
    }
}
