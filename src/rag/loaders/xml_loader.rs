//! XML loader.
//!
//! Corresponds to `crewai_tools/rag/loaders/xml_loader.py`.
//!
//! Extracts the leading text of every element in document order. Text that
//! follows a child element (the "tail") is not part of the output.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::json;

use crate::rag::error::LoadError;
use crate::rag::loaders::{metadata_of, resolve_text_source, BaseLoader, LoadOptions, LoaderResult};
use crate::rag::source_content::SourceContent;

const ACCEPT: &str = "application/xml, text/xml, text/plain";

#[derive(Debug, Clone, Default)]
pub struct XmlLoader;

/// Extracted element texts and the root tag name.
struct ParsedXml {
    texts: Vec<String>,
    root_tag: String,
}

impl XmlLoader {
    pub fn new() -> Self {
        Self
    }

    fn parse(content: &str) -> Result<ParsedXml, String> {
        let mut reader = Reader::from_str(content);
        let mut texts = Vec::new();
        let mut root_tag: Option<String> = None;
        let mut depth = 0usize;
        // Leading text of the element opened most recently, until a child
        // or its end tag shows up.
        let mut pending: Option<String> = None;

        let flush = |pending: &mut Option<String>, texts: &mut Vec<String>| {
            if let Some(buf) = pending.take() {
                let trimmed = buf.trim();
                if !trimmed.is_empty() {
                    texts.push(trimmed.to_string());
                }
            }
        };

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    flush(&mut pending, &mut texts);
                    if root_tag.is_none() {
                        root_tag = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                    }
                    depth += 1;
                    pending = Some(String::new());
                }
                Ok(Event::Empty(e)) => {
                    flush(&mut pending, &mut texts);
                    if root_tag.is_none() {
                        root_tag = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                    }
                }
                Ok(Event::End(_)) => {
                    flush(&mut pending, &mut texts);
                    depth = depth.saturating_sub(1);
                }
                Ok(Event::Text(t)) => {
                    if let Some(buf) = pending.as_mut() {
                        let text = t.unescape().map_err(|e| e.to_string())?;
                        buf.push_str(&text);
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(buf) = pending.as_mut() {
                        buf.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(format!(
                        "error at position {}: {}",
                        reader.buffer_position(),
                        e
                    ))
                }
            }
        }
        flush(&mut pending, &mut texts);

        if depth != 0 {
            return Err("unclosed element at end of document".to_string());
        }
        let root_tag = root_tag.ok_or_else(|| "no element found".to_string())?;
        Ok(ParsedXml { texts, root_tag })
    }
}

#[async_trait]
impl BaseLoader for XmlLoader {
    fn name(&self) -> &'static str {
        "XMLLoader"
    }

    async fn load(
        &self,
        source: &SourceContent,
        options: &LoadOptions,
    ) -> Result<LoaderResult, LoadError> {
        let (content, source_label) =
            resolve_text_source(source, options, self.name(), ACCEPT, "xml_string").await?;

        match Self::parse(&content) {
            Ok(parsed) => {
                let metadata = metadata_of([
                    ("format", json!("xml")),
                    ("root_tag", json!(parsed.root_tag)),
                ]);
                Ok(LoaderResult::new(parsed.texts.join("\n"), source_label).with_metadata(metadata))
            }
            Err(e) if options.lenient_parse => {
                log::warn!("XML parse error in {}: {}", source_label, e);
                let metadata = metadata_of([("format", json!("xml")), ("parse_error", json!(e))]);
                Ok(LoaderResult::new(content, source_label).with_metadata(metadata))
            }
            Err(e) => Err(LoadError::parse(
                &source_label,
                format!("Failed to parse XML from {}: {}", source_label, e),
            )),
        }
    }
}
