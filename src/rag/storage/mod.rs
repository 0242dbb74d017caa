//! Vector store abstraction.
//!
//! Corresponds to the collection API the RAG pipeline uses from its vector
//! database (`get_or_create_collection`, `add`/`upsert`, `query`, `count`,
//! `delete_collection`, `reset`). Two stores ship with the crate:
//!
//! * [`MemoryVectorStore`]: process-local, lost on drop.
//! * [`SqliteVectorStore`]: persisted under a directory.
//!
//! Both rank by cosine distance with a brute-force scan; collections are
//! expected to hold thousands of chunks, not millions.

pub mod memory;
pub mod sqlite;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rag::error::{RagError, Result};

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

/// Metadata key recording the distance space of a collection.
pub const DISTANCE_SPACE_KEY: &str = "hnsw:space";

/// The only distance space supported.
pub const COSINE_SPACE: &str = "cosine";

/// Metadata equality filter: every key must be present with an equal value.
pub type MetadataFilter = HashMap<String, Value>;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A record as written into a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub document: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    pub embedding: Vec<f32>,
}

impl StoredRecord {
    pub fn new(
        id: impl Into<String>,
        document: impl Into<String>,
        metadata: HashMap<String, Value>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
            metadata,
            embedding,
        }
    }
}

/// One nearest-neighbour match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: HashMap<String, Value>,
    /// Cosine distance, `1 - cosine_similarity`. Smaller is closer.
    pub distance: f32,
}

// ---------------------------------------------------------------------------
// VectorStore trait
// ---------------------------------------------------------------------------

/// A store of named collections of embedded documents.
///
/// Invariants shared by every implementation:
/// * a collection's embedding dimension is fixed by its first upsert;
/// * upserting an existing id replaces the record in place;
/// * `query` orders hits by ascending cosine distance, ties in insertion order.
pub trait VectorStore: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Create a collection, failing if it already exists.
    fn create_collection(&self, name: &str, metadata: &HashMap<String, Value>) -> Result<()>;

    /// Create the collection if missing. Returns `true` when it was created.
    fn get_or_create_collection(
        &self,
        name: &str,
        metadata: &HashMap<String, Value>,
    ) -> Result<bool>;

    /// Delete a collection and all its records.
    fn delete_collection(&self, name: &str) -> Result<()>;

    /// Names of all collections, sorted.
    fn list_collections(&self) -> Result<Vec<String>>;

    /// Metadata recorded for a collection.
    fn collection_metadata(&self, name: &str) -> Result<HashMap<String, Value>>;

    /// Insert or replace records.
    fn upsert(&self, name: &str, records: Vec<StoredRecord>) -> Result<()>;

    /// The `n` nearest records to `embedding` that pass `filter`.
    fn query(
        &self,
        name: &str,
        embedding: &[f32],
        n: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>>;

    /// Number of records in a collection.
    fn count(&self, name: &str) -> Result<usize>;

    /// Drop every collection.
    fn reset(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Collection metadata with the distance space recorded.
pub(crate) fn collection_metadata_with_space(
    metadata: &HashMap<String, Value>,
) -> HashMap<String, Value> {
    let mut merged = metadata.clone();
    merged
        .entry(DISTANCE_SPACE_KEY.to_string())
        .or_insert_with(|| Value::from(COSINE_SPACE));
    merged
}

pub(crate) fn missing_collection(name: &str) -> RagError {
    RagError::Store(format!("Collection {} does not exist", name))
}

pub(crate) fn existing_collection(name: &str) -> RagError {
    RagError::Store(format!("Collection {} already exists", name))
}

/// Check a batch against the collection dimension; returns the dimension the
/// collection has after the batch.
pub(crate) fn check_dimensions(
    collection: &str,
    current: Option<usize>,
    records: &[StoredRecord],
) -> Result<Option<usize>> {
    let mut dimension = current;
    for record in records {
        if record.embedding.is_empty() {
            return Err(RagError::Store(format!(
                "Record {} has an empty embedding",
                record.id
            )));
        }
        match dimension {
            Some(expected) if expected != record.embedding.len() => {
                return Err(RagError::Store(format!(
                    "Embedding dimension mismatch in collection {}: expected {}, got {}",
                    collection,
                    expected,
                    record.embedding.len()
                )));
            }
            Some(_) => {}
            None => dimension = Some(record.embedding.len()),
        }
    }
    Ok(dimension)
}

/// Cosine distance between two vectors. Zero vectors are maximally distant.
///
/// Returns `None` when the lengths differ: vectors from different embedding
/// spaces have no meaningful distance.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(1.0);
    }
    Some(1.0 - dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Reject a query embedding whose length differs from the collection's.
/// Collections without records have no dimension yet and accept any query.
pub(crate) fn check_query_dimension(
    collection: &str,
    dimension: Option<usize>,
    embedding: &[f32],
) -> Result<()> {
    if embedding.is_empty() {
        return Err(RagError::Store("Query embedding is empty".to_string()));
    }
    match dimension {
        Some(expected) if expected != embedding.len() => Err(RagError::Store(format!(
            "Query embedding dimension mismatch in collection {}: expected {}, got {}",
            collection,
            expected,
            embedding.len()
        ))),
        _ => Ok(()),
    }
}

/// Whether `metadata` satisfies every equality in `filter`.
pub fn matches_filter(metadata: &HashMap<String, Value>, filter: Option<&MetadataFilter>) -> bool {
    match filter {
        None => true,
        Some(filter) => filter
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected)),
    }
}

/// Brute-force nearest neighbours over records in insertion order.
pub(crate) fn rank<'a, I>(
    collection: &str,
    records: I,
    embedding: &[f32],
    n: usize,
    filter: Option<&MetadataFilter>,
) -> Result<Vec<QueryHit>>
where
    I: IntoIterator<Item = &'a StoredRecord>,
{
    let mut hits = Vec::new();
    for record in records {
        if !matches_filter(&record.metadata, filter) {
            continue;
        }
        let distance = cosine_distance(&record.embedding, embedding).ok_or_else(|| {
            RagError::Store(format!(
                "Embedding dimension mismatch in collection {}: record {} has {}, query has {}",
                collection,
                record.id,
                record.embedding.len(),
                embedding.len()
            ))
        })?;
        hits.push(QueryHit {
            id: record.id.clone(),
            document: record.document.clone(),
            metadata: record.metadata.clone(),
            distance,
        });
    }
    // Stable sort keeps insertion order among equal distances.
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(n);
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, embedding: Vec<f32>, meta: &[(&str, Value)]) -> StoredRecord {
        let metadata = meta
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        StoredRecord::new(id, format!("doc {}", id), metadata, embedding)
    }

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).unwrap().abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]).unwrap() - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() - 2.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), Some(1.0));
        assert_eq!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0, 5.0]), None);
    }

    #[test]
    fn test_check_query_dimension() {
        assert!(check_query_dimension("c", None, &[1.0, 2.0, 3.0]).is_ok());
        assert!(check_query_dimension("c", Some(2), &[1.0, 2.0]).is_ok());
        let err = check_query_dimension("c", Some(2), &[1.0, 0.0, 5.0]).unwrap_err();
        assert!(matches!(err, RagError::Store(ref m) if m.contains("expected 2, got 3")));
        assert!(check_query_dimension("c", None, &[]).is_err());
    }

    #[test]
    fn test_rank_rejects_mismatched_records() {
        let records = vec![record("a", vec![1.0, 0.0], &[])];
        assert!(matches!(
            rank("c", &records, &[1.0, 0.0, 5.0], 5, None),
            Err(RagError::Store(_))
        ));
    }

    #[test]
    fn test_matches_filter() {
        let meta: HashMap<String, Value> =
            [("source".to_string(), json!("a.txt")), ("page".to_string(), json!(2))]
                .into_iter()
                .collect();
        assert!(matches_filter(&meta, None));

        let mut filter = MetadataFilter::new();
        filter.insert("source".to_string(), json!("a.txt"));
        assert!(matches_filter(&meta, Some(&filter)));

        filter.insert("page".to_string(), json!(3));
        assert!(!matches_filter(&meta, Some(&filter)));

        let mut missing = MetadataFilter::new();
        missing.insert("lang".to_string(), json!("en"));
        assert!(!matches_filter(&meta, Some(&missing)));
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let records = vec![
            record("far", vec![0.0, 1.0], &[]),
            record("near", vec![1.0, 0.1], &[]),
            record("exact", vec![1.0, 0.0], &[]),
        ];
        let hits = rank("c", &records, &[1.0, 0.0], 2, None).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
    }

    #[test]
    fn test_rank_ties_keep_insertion_order() {
        let records = vec![
            record("first", vec![1.0, 0.0], &[]),
            record("second", vec![2.0, 0.0], &[]),
        ];
        let hits = rank("c", &records, &[1.0, 0.0], 5, None).unwrap();
        assert_eq!(hits[0].id, "first");
        assert_eq!(hits[1].id, "second");
    }

    #[test]
    fn test_check_dimensions() {
        let batch = vec![record("a", vec![1.0, 2.0], &[]), record("b", vec![3.0, 4.0], &[])];
        assert_eq!(check_dimensions("c", None, &batch).unwrap(), Some(2));
        assert!(matches!(
            check_dimensions("c", Some(3), &batch),
            Err(RagError::Store(_))
        ));
        let empty = vec![record("e", vec![], &[])];
        assert!(check_dimensions("c", None, &empty).is_err());
    }

    #[test]
    fn test_collection_metadata_records_space() {
        let meta = collection_metadata_with_space(&HashMap::new());
        assert_eq!(meta[DISTANCE_SPACE_KEY], json!("cosine"));
    }
}
