//! CSV loader.
//!
//! Corresponds to `crewai_tools/rag/loaders/csv_loader.py`.
//!
//! Rows are flattened into `Row n: column: value | ...` lines under a
//! header line, which keeps column names next to every value once the text
//! is chunked.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::rag::error::LoadError;
use crate::rag::loaders::{metadata_of, resolve_text_source, BaseLoader, LoadOptions, LoaderResult};
use crate::rag::source_content::SourceContent;

const ACCEPT: &str = "text/csv, application/csv, text/plain";

#[derive(Debug, Clone, Default)]
pub struct CsvLoader;

impl CsvLoader {
    pub fn new() -> Self {
        Self
    }

    fn parse(&self, content: &str, source: &str) -> Result<LoaderResult, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        if headers.is_empty() {
            let metadata = metadata_of([
                ("format", json!("csv")),
                ("columns", Value::Null),
                ("rows", json!(0)),
            ]);
            return Ok(LoaderResult::new("", source).with_metadata(metadata));
        }

        let mut lines = vec![
            format!("Headers: {}", headers.join(" | ")),
            "-".repeat(50),
        ];
        let mut rows = 0usize;
        for record in reader.records() {
            let record = record?;
            rows += 1;
            let row_text = headers
                .iter()
                .zip(record.iter())
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect::<Vec<_>>()
                .join(" | ");
            lines.push(format!("Row {}: {}", rows, row_text));
        }

        let metadata = metadata_of([
            ("format", json!("csv")),
            ("columns", json!(headers)),
            ("rows", json!(rows)),
        ]);
        Ok(LoaderResult::new(lines.join("\n"), source).with_metadata(metadata))
    }
}

#[async_trait]
impl BaseLoader for CsvLoader {
    fn name(&self) -> &'static str {
        "CSVLoader"
    }

    async fn load(
        &self,
        source: &SourceContent,
        options: &LoadOptions,
    ) -> Result<LoaderResult, LoadError> {
        let (content, source_label) =
            resolve_text_source(source, options, self.name(), ACCEPT, "csv_string").await?;

        match self.parse(&content, &source_label) {
            Ok(result) => Ok(result),
            Err(e) if options.lenient_parse => {
                log::warn!("CSV parse error in {}: {}", source_label, e);
                let metadata = metadata_of([
                    ("format", json!("csv")),
                    ("parse_error", json!(e.to_string())),
                ]);
                Ok(LoaderResult::new(content, source_label).with_metadata(metadata))
            }
            Err(e) => Err(LoadError::parse(
                &source_label,
                format!("Failed to parse CSV from {}: {}", source_label, e),
            )),
        }
    }
}
