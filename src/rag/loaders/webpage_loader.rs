//! Web page loader for `website`, `docs_site` and `github` sources.
//!
//! Fetches the page and reduces the HTML to readable text: `script` and
//! `style` blocks are dropped, block-level tags become line breaks, the
//! remaining tags are stripped and common entities decoded.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::json;

use crate::rag::error::LoadError;
use crate::rag::loaders::{http, metadata_of, BaseLoader, LoadOptions, LoaderResult};
use crate::rag::source_content::SourceContent;

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

static SCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
static STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").unwrap());
static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(p|div|br|li|ul|ol|tr|table|section|article|header|footer|h[1-6]|pre|blockquote)\b[^>]*>")
        .unwrap()
});
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").unwrap());
static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

#[derive(Debug, Clone, Default)]
pub struct WebPageLoader;

impl WebPageLoader {
    pub fn new() -> Self {
        Self
    }

    /// Reduce an HTML document to plain text.
    pub fn html_to_text(html: &str) -> String {
        let text = SCRIPT.replace_all(html, "");
        let text = STYLE.replace_all(&text, "");
        let text = COMMENT.replace_all(&text, "");
        let text = BLOCK_TAG.replace_all(&text, "\n");
        let text = ANY_TAG.replace_all(&text, "");
        let text = decode_entities(&text);

        text.lines()
            .map(|line| INLINE_SPACE.replace_all(line, " ").trim().to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn title(html: &str) -> Option<String> {
        TITLE
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| decode_entities(m.as_str()).trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Decode named and numeric (`&#39;`, `&#x2019;`) character references in
/// one pass. Unknown or invalid references are left as written.
fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name {
                "nbsp" => Some(' '),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "amp" => Some('&'),
                _ => name
                    .strip_prefix("#x")
                    .or_else(|| name.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| name.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(|code| code.ok())
                    .and_then(char::from_u32),
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[async_trait]
impl BaseLoader for WebPageLoader {
    fn name(&self) -> &'static str {
        "WebPageLoader"
    }

    async fn load(
        &self,
        source: &SourceContent,
        options: &LoadOptions,
    ) -> Result<LoaderResult, LoadError> {
        if !source.is_url() {
            return Err(LoadError::invalid_format(
                &source.source_ref,
                format!("Source must be a URL, got: {}", source.source_ref),
            ));
        }

        let body = http::fetch(&source.source_ref, options, self.name(), ACCEPT).await?;
        let html = String::from_utf8_lossy(&body.bytes);

        let metadata = metadata_of([
            ("format", json!("html")),
            ("url", json!(source.source_ref)),
            ("title", json!(Self::title(&html))),
            ("status_code", json!(body.status)),
        ]);
        Ok(LoaderResult::new(Self::html_to_text(&html), &source.source_ref).with_metadata(metadata))
    }
}
