//! DOCX loader.
//!
//! Corresponds to `crewai_tools/rag/loaders/docx_loader.py`.
//!
//! A `.docx` file is a zip archive; the body lives in `word/document.xml`.
//! Only body-level paragraphs contribute text. Paragraphs nested in tables
//! are counted under `tables`, not `paragraphs`.

use std::io::{Cursor, Read};

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::json;

use crate::rag::error::LoadError;
use crate::rag::loaders::{http, metadata_of, BaseLoader, LoadOptions, LoaderResult};
use crate::rag::source_content::SourceContent;

const ACCEPT: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Clone, Default)]
pub struct DocxLoader;

/// Text and structure counts pulled from `word/document.xml`.
#[derive(Debug, Default)]
struct DocxBody {
    paragraphs: Vec<String>,
    paragraph_count: usize,
    table_count: usize,
}

impl DocxLoader {
    pub fn new() -> Self {
        Self
    }

    fn read_document_xml(bytes: &[u8]) -> Result<String, String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
        let mut part = archive.by_name(DOCUMENT_PART).map_err(|e| e.to_string())?;
        let mut xml = String::new();
        part.read_to_string(&mut xml).map_err(|e| e.to_string())?;
        Ok(xml)
    }

    fn parse_body(xml: &str) -> Result<DocxBody, String> {
        let mut reader = Reader::from_str(xml);
        let mut body = DocxBody::default();
        let mut stack: Vec<Vec<u8>> = Vec::new();
        // Text of the body-level paragraph being read, and the stack depth it opened at.
        let mut current: Option<(String, usize)> = None;

        let parent_is_body =
            |stack: &[Vec<u8>]| stack.last().map(|n| n.as_slice()) == Some(&b"body"[..]);

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let local = e.local_name().as_ref().to_vec();
                    if parent_is_body(&stack) {
                        match local.as_slice() {
                            b"p" => current = Some((String::new(), stack.len())),
                            b"tbl" => body.table_count += 1,
                            _ => {}
                        }
                    }
                    stack.push(local);
                }
                Ok(Event::Empty(e)) => {
                    let local = e.local_name();
                    if parent_is_body(&stack) && local.as_ref() == b"p" {
                        body.paragraph_count += 1;
                    } else if let Some((text, _)) = current.as_mut() {
                        match local.as_ref() {
                            b"tab" => text.push('\t'),
                            b"br" | b"cr" => text.push('\n'),
                            _ => {}
                        }
                    }
                }
                Ok(Event::Text(t)) => {
                    let in_run_text = stack.last().map(|n| n.as_slice()) == Some(&b"t"[..]);
                    if let (true, Some((text, _))) = (in_run_text, current.as_mut()) {
                        text.push_str(&t.unescape().map_err(|e| e.to_string())?);
                    }
                }
                Ok(Event::End(_)) => {
                    let closed = stack.pop();
                    let closes_paragraph = matches!(
                        (&current, closed.as_deref()),
                        (Some((_, depth)), Some(b"p")) if *depth == stack.len()
                    );
                    if closes_paragraph {
                        if let Some((text, _)) = current.take() {
                            body.paragraph_count += 1;
                            if !text.trim().is_empty() {
                                body.paragraphs.push(text);
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(e.to_string()),
            }
        }
        Ok(body)
    }

    fn load_bytes(&self, bytes: &[u8], source_label: &str) -> Result<LoaderResult, LoadError> {
        let body = Self::read_document_xml(bytes)
            .and_then(|xml| Self::parse_body(&xml))
            .map_err(|e| {
                LoadError::invalid_format(source_label, format!("Error loading DOCX file: {}", e))
            })?;

        let metadata = metadata_of([
            ("format", json!("docx")),
            ("paragraphs", json!(body.paragraph_count)),
            ("tables", json!(body.table_count)),
        ]);
        Ok(LoaderResult::new(body.paragraphs.join("\n"), source_label).with_metadata(metadata))
    }
}

#[async_trait]
impl BaseLoader for DocxLoader {
    fn name(&self) -> &'static str {
        "DOCXLoader"
    }

    async fn load(
        &self,
        source: &SourceContent,
        options: &LoadOptions,
    ) -> Result<LoaderResult, LoadError> {
        let bytes = if source.is_url() {
            http::fetch(&source.source_ref, options, self.name(), ACCEPT)
                .await?
                .bytes
                .to_vec()
        } else if source.path_exists() {
            tokio::fs::read(source.as_path())
                .await
                .map_err(|e| LoadError::io(&source.source_ref, &e))?
        } else {
            return Err(LoadError::invalid_format(
                &source.source_ref,
                format!(
                    "Source must be a valid file path or URL, got: {}",
                    source.source_ref
                ),
            ));
        };
        self.load_bytes(&bytes, &source.source_ref)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::error::LoadErrorKind;

    #[tokio::test]
    async fn test_body_paragraphs_and_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.docx");
        fixtures::write_docx(&path, &["First paragraph", "  ", "Second paragraph"]);

        let result = DocxLoader::new()
            .load(&SourceContent::from_path(&path), &LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(result.content, "First paragraph\nSecond paragraph");
        assert_eq!(result.metadata["paragraphs"], json!(3));
        assert_eq!(result.metadata["tables"], json!(1));
        assert_eq!(result.metadata["format"], json!("docx"));
    }

    #[tokio::test]
    async fn test_inline_string_is_rejected() {
        let err = DocxLoader::new()
            .load(&SourceContent::new("not a docx"), &LoadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::InvalidFormat);
    }

    #[tokio::test]
    async fn test_corrupt_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"PK not really a zip").unwrap();

        let err = DocxLoader::new()
            .load(&SourceContent::from_path(&path), &LoadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::InvalidFormat);
        assert!(err.to_string().starts_with("Error loading DOCX file"));
    }
}
