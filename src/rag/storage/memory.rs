//! In-memory vector store.

use std::collections::HashMap;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use crate::rag::error::Result;
use crate::rag::storage::{
    check_dimensions, check_query_dimension, collection_metadata_with_space, existing_collection, missing_collection,
    rank, MetadataFilter, QueryHit, StoredRecord, VectorStore,
};

#[derive(Debug, Default)]
struct Collection {
    metadata: HashMap<String, Value>,
    dimension: Option<usize>,
    records: Vec<StoredRecord>,
}

/// Process-local store; contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    collections: DashMap<String, Collection>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorStore for MemoryVectorStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn create_collection(&self, name: &str, metadata: &HashMap<String, Value>) -> Result<()> {
        match self.collections.entry(name.to_string()) {
            Entry::Occupied(_) => Err(existing_collection(name)),
            Entry::Vacant(slot) => {
                slot.insert(Collection {
                    metadata: collection_metadata_with_space(metadata),
                    ..Collection::default()
                });
                Ok(())
            }
        }
    }

    fn get_or_create_collection(
        &self,
        name: &str,
        metadata: &HashMap<String, Value>,
    ) -> Result<bool> {
        match self.collections.entry(name.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(Collection {
                    metadata: collection_metadata_with_space(metadata),
                    ..Collection::default()
                });
                Ok(true)
            }
        }
    }

    fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| missing_collection(name))
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    fn collection_metadata(&self, name: &str) -> Result<HashMap<String, Value>> {
        self.collections
            .get(name)
            .map(|c| c.metadata.clone())
            .ok_or_else(|| missing_collection(name))
    }

    fn upsert(&self, name: &str, records: Vec<StoredRecord>) -> Result<()> {
        let mut collection = self
            .collections
            .get_mut(name)
            .ok_or_else(|| missing_collection(name))?;
        collection.dimension = check_dimensions(name, collection.dimension, &records)?;

        for record in records {
            match collection.records.iter().position(|r| r.id == record.id) {
                Some(pos) => collection.records[pos] = record,
                None => collection.records.push(record),
            }
        }
        Ok(())
    }

    fn query(
        &self,
        name: &str,
        embedding: &[f32],
        n: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>> {
        let collection = self
            .collections
            .get(name)
            .ok_or_else(|| missing_collection(name))?;
        check_query_dimension(name, collection.dimension, embedding)?;
        rank(name, &collection.records, embedding, n, filter)
    }

    fn count(&self, name: &str) -> Result<usize> {
        self.collections
            .get(name)
            .map(|c| c.records.len())
            .ok_or_else(|| missing_collection(name))
    }

    fn reset(&self) -> Result<()> {
        self.collections.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::error::RagError;
    use serde_json::json;

    fn rec(id: &str, doc: &str, embedding: Vec<f32>) -> StoredRecord {
        StoredRecord::new(id, doc, HashMap::new(), embedding)
    }

    #[test]
    fn test_collection_lifecycle() {
        let store = MemoryVectorStore::new();
        assert!(store.get_or_create_collection("kb", &HashMap::new()).unwrap());
        assert!(!store.get_or_create_collection("kb", &HashMap::new()).unwrap());
        assert!(store.create_collection("kb", &HashMap::new()).is_err());
        assert_eq!(store.collection_metadata("kb").unwrap()["hnsw:space"], json!("cosine"));
        assert_eq!(store.list_collections().unwrap(), vec!["kb".to_string()]);

        store.delete_collection("kb").unwrap();
        assert!(store.list_collections().unwrap().is_empty());
        assert!(store.delete_collection("kb").is_err());
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let store = MemoryVectorStore::new();
        store.create_collection("kb", &HashMap::new()).unwrap();
        store
            .upsert("kb", vec![rec("1", "old", vec![1.0, 0.0]), rec("2", "other", vec![0.0, 1.0])])
            .unwrap();
        store.upsert("kb", vec![rec("1", "new", vec![1.0, 0.0])]).unwrap();

        assert_eq!(store.count("kb").unwrap(), 2);
        let hits = store.query("kb", &[1.0, 0.0], 1, None).unwrap();
        assert_eq!(hits[0].document, "new");
    }

    #[test]
    fn test_dimension_is_fixed_by_first_upsert() {
        let store = MemoryVectorStore::new();
        store.create_collection("kb", &HashMap::new()).unwrap();
        store.upsert("kb", vec![rec("1", "a", vec![1.0, 0.0])]).unwrap();
        let err = store.upsert("kb", vec![rec("2", "b", vec![1.0, 0.0, 0.0])]).unwrap_err();
        assert!(matches!(err, RagError::Store(_)));
        assert_eq!(store.count("kb").unwrap(), 1);
    }

    #[test]
    fn test_query_dimension_must_match_collection() {
        let store = MemoryVectorStore::new();
        store.create_collection("c", &HashMap::new()).unwrap();
        assert!(store.query("c", &[1.0, 0.0, 5.0], 5, None).unwrap().is_empty());

        store.upsert("c", vec![rec("a", "doc", vec![1.0, 0.0])]).unwrap();
        let err = store.query("c", &[1.0, 0.0, 5.0], 5, None).unwrap_err();
        assert!(matches!(err, RagError::Store(ref m) if m.contains("expected 2, got 3")));
        assert!(store.query("c", &[1.0], 5, None).is_err());
        assert_eq!(store.query("c", &[1.0, 0.0], 5, None).unwrap().len(), 1);
    }

    #[test]
    fn test_query_with_filter() {
        let store = MemoryVectorStore::new();
        store.create_collection("kb", &HashMap::new()).unwrap();
        let mut tagged = rec("1", "tagged", vec![0.0, 1.0]);
        tagged.metadata.insert("source".to_string(), json!("a.txt"));
        store
            .upsert("kb", vec![tagged, rec("2", "untagged", vec![1.0, 0.0])])
            .unwrap();

        let mut filter = MetadataFilter::new();
        filter.insert("source".to_string(), json!("a.txt"));
        let hits = store.query("kb", &[1.0, 0.0], 5, Some(&filter)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document, "tagged");
        assert!((hits[0].distance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_collection_errors() {
        let store = MemoryVectorStore::new();
        assert!(store.query("nope", &[1.0], 1, None).is_err());
        assert!(store.upsert("nope", vec![rec("1", "a", vec![1.0])]).is_err());
        assert!(store.count("nope").is_err());
    }

    #[test]
    fn test_reset() {
        let store = MemoryVectorStore::new();
        store.create_collection("a", &HashMap::new()).unwrap();
        store.create_collection("b", &HashMap::new()).unwrap();
        store.reset().unwrap();
        assert!(store.list_collections().unwrap().is_empty());
    }
}
