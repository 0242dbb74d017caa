//! JSON loader.
//!
//! Corresponds to `crewai_tools/rag/loaders/json_loader.py`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::rag::error::LoadError;
use crate::rag::loaders::{http, metadata_of, read_text_file, BaseLoader, LoadOptions, LoaderResult};
use crate::rag::source_content::SourceContent;

const ACCEPT: &str = "application/json";

#[derive(Debug, Clone, Default)]
pub struct JsonLoader;

impl JsonLoader {
    pub fn new() -> Self {
        Self
    }

    fn render(data: &Value) -> String {
        match data {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, to_string_indent0(v)))
                .collect::<Vec<_>>()
                .join("\n"),
            Value::Array(items) => items
                .iter()
                .map(to_string_indent0)
                .collect::<Vec<_>>()
                .join("\n"),
            other => to_string_indent0(other),
        }
    }
}

/// Python-style type name of a JSON value.
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "dict",
        Value::Array(_) => "list",
        Value::String(_) => "str",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::Bool(_) => "bool",
        Value::Null => "NoneType",
    }
}

/// Render a value with newlines between members and no indentation.
fn to_string_indent0(value: &Value) -> String {
    to_string_with_indent(value, b"")
}

fn to_string_with_indent(value: &Value, indent: &[u8]) -> String {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => value.to_string(),
    }
}

#[async_trait]
impl BaseLoader for JsonLoader {
    fn name(&self) -> &'static str {
        "JSONLoader"
    }

    async fn load(
        &self,
        source: &SourceContent,
        options: &LoadOptions,
    ) -> Result<LoaderResult, LoadError> {
        let (content, source_label) = if source.is_url() {
            let text =
                http::fetch_text(&source.source_ref, options, self.name(), ACCEPT).await?;
            // Responses that are JSON get re-rendered with 2-space indentation.
            let text = match serde_json::from_str::<Value>(&text) {
                Ok(v) => to_string_with_indent(&v, b"  "),
                Err(_) => text,
            };
            (text, source.source_ref.clone())
        } else if source.path_exists() {
            (read_text_file(source).await?, source.source_ref.clone())
        } else {
            let label = options
                .source
                .clone()
                .unwrap_or_else(|| "json_string".to_string());
            (source.source_ref.clone(), label)
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(data) => {
                let size = match &data {
                    Value::Object(m) => m.len(),
                    Value::Array(a) => a.len(),
                    _ => 1,
                };
                let metadata = metadata_of([
                    ("format", json!("json")),
                    ("type", json!(type_name(&data))),
                    ("size", json!(size)),
                ]);
                Ok(LoaderResult::new(Self::render(&data), source_label).with_metadata(metadata))
            }
            Err(e) if options.lenient_parse => {
                log::warn!("JSON parse error in {}: {}", source_label, e);
                let metadata = metadata_of([
                    ("format", json!("json")),
                    ("parse_error", json!(e.to_string())),
                ]);
                Ok(LoaderResult::new(content, source_label).with_metadata(metadata))
            }
            Err(e) => Err(LoadError::parse(
                &source_label,
                format!("Failed to parse JSON from {}: {}", source_label, e),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::error::LoadErrorKind;
    use crate::rag::loaders::http::test_server;

    async fn load(content: &str, options: &LoadOptions) -> Result<LoaderResult, LoadError> {
        JsonLoader::new().load(&SourceContent::new(content), options).await
    }

    #[tokio::test]
    async fn test_object_renders_key_lines() {
        let result = load(r#"{"name": "Ada", "tags": ["x", "y"]}"#, &LoadOptions::default())
            .await
            .unwrap();
        assert_eq!(result.content, "name: \"Ada\"\ntags: [\n\"x\",\n\"y\"\n]");
        assert_eq!(result.metadata["type"], json!("dict"));
        assert_eq!(result.metadata["size"], json!(2));
        assert_eq!(result.source, "json_string");
    }

    #[tokio::test]
    async fn test_array_renders_one_line_per_item() {
        let result = load("[1, 2.5, null]", &LoadOptions::default()).await.unwrap();
        assert_eq!(result.content, "1\n2.5\nnull");
        assert_eq!(result.metadata["type"], json!("list"));
        assert_eq!(result.metadata["size"], json!(3));
    }

    #[tokio::test]
    async fn test_scalar() {
        let result = load("42", &LoadOptions::default()).await.unwrap();
        assert_eq!(result.content, "42");
        assert_eq!(result.metadata["type"], json!("int"));
        assert_eq!(result.metadata["size"], json!(1));
    }

    #[tokio::test]
    async fn test_invalid_json_is_strict_by_default() {
        let err = load("{not json", &LoadOptions::default()).await.unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::Parse);
    }

    #[tokio::test]
    async fn test_invalid_json_lenient_keeps_raw() {
        let result = load("{not json", &LoadOptions::default().lenient()).await.unwrap();
        assert_eq!(result.content, "{not json");
        assert!(result.metadata.contains_key("parse_error"));
    }

    #[tokio::test]
    async fn test_url_json() {
        let base = test_server::serve(vec![(
            "/api.json",
            "application/json",
            br#"{"ok":true}"#.to_vec(),
        )])
        .await;
        let result = JsonLoader::new()
            .load(
                &SourceContent::new(format!("{}/api.json", base)),
                &LoadOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(result.content, "ok: true");
        assert_eq!(result.metadata["type"], json!("dict"));
    }
}
