//! SQLite-backed vector store.
//!
//! Persists collections in `<persist_directory>/rag_store.sqlite3`.
//! Embeddings are stored as little-endian `f32` blobs and ranked in process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::rag::error::{RagError, Result};
use crate::rag::storage::{
    check_dimensions, check_query_dimension, collection_metadata_with_space, existing_collection, missing_collection,
    rank, MetadataFilter, QueryHit, StoredRecord, VectorStore,
};

/// File name of the database inside the persist directory.
pub const DB_FILE_NAME: &str = "rag_store.sqlite3";

/// Vector store persisted in a SQLite file.
pub struct SqliteVectorStore {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVectorStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}

impl SqliteVectorStore {
    /// Open (creating if needed) the store under `persist_directory`.
    pub fn open(persist_directory: &Path) -> Result<Self> {
        std::fs::create_dir_all(persist_directory)?;
        let db_path = persist_directory.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path)?;
        let store = Self {
            db_path,
            conn: Mutex::new(conn),
        };
        store.initialize_db()?;
        log::debug!("Opened SQLite vector store at {}", store.db_path.display());
        Ok(store)
    }

    fn initialize_db(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                metadata TEXT NOT NULL,
                dimension INTEGER,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                document TEXT NOT NULL,
                metadata TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );",
        )?;
        Ok(())
    }

    fn collection_dimension(conn: &Connection, name: &str) -> Result<Option<Option<usize>>> {
        let row: Option<Option<i64>> = conn
            .query_row(
                "SELECT dimension FROM collections WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row.map(|dim| dim.map(|d| d as usize)))
    }

    fn insert_collection(
        conn: &Connection,
        name: &str,
        metadata: &HashMap<String, Value>,
    ) -> Result<()> {
        let metadata_json = serde_json::to_string(&collection_metadata_with_space(metadata))?;
        conn.execute(
            "INSERT INTO collections (name, metadata, dimension, created_at)
             VALUES (?1, ?2, NULL, ?3)",
            params![name, metadata_json, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn load_records(conn: &Connection, name: &str) -> Result<Vec<StoredRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, document, metadata, embedding
             FROM records
             WHERE collection = ?1
             ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![name], |row| {
            let id: String = row.get(0)?;
            let document: String = row.get(1)?;
            let metadata: String = row.get(2)?;
            let embedding: Vec<u8> = row.get(3)?;
            Ok((id, document, metadata, embedding))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, document, metadata, embedding) = row?;
            let metadata: HashMap<String, Value> = serde_json::from_str(&metadata)?;
            records.push(StoredRecord {
                id,
                document,
                metadata,
                embedding: decode_embedding(&embedding)?,
            });
        }
        Ok(records)
    }
}

/// Encode an embedding as little-endian `f32` bytes.
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode little-endian `f32` bytes.
pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(RagError::Store(format!(
            "Corrupt embedding blob of {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

impl VectorStore for SqliteVectorStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn create_collection(&self, name: &str, metadata: &HashMap<String, Value>) -> Result<()> {
        let conn = self.conn.lock();
        if Self::collection_dimension(&conn, name)?.is_some() {
            return Err(existing_collection(name));
        }
        Self::insert_collection(&conn, name, metadata)
    }

    fn get_or_create_collection(
        &self,
        name: &str,
        metadata: &HashMap<String, Value>,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        if Self::collection_dimension(&conn, name)?.is_some() {
            return Ok(false);
        }
        Self::insert_collection(&conn, name, metadata)?;
        Ok(true)
    }

    fn delete_collection(&self, name: &str) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM records WHERE collection = ?1", params![name])?;
        let removed = tx.execute("DELETE FROM collections WHERE name = ?1", params![name])?;
        if removed == 0 {
            return Err(missing_collection(name));
        }
        tx.commit()?;
        Ok(())
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT name FROM collections ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    fn collection_metadata(&self, name: &str) -> Result<HashMap<String, Value>> {
        let conn = self.conn.lock();
        let metadata: Option<String> = conn
            .query_row(
                "SELECT metadata FROM collections WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        match metadata {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(missing_collection(name)),
        }
    }

    fn upsert(&self, name: &str, records: Vec<StoredRecord>) -> Result<()> {
        let mut conn = self.conn.lock();
        let current = Self::collection_dimension(&conn, name)?.ok_or_else(|| missing_collection(name))?;
        let dimension = check_dimensions(name, current, &records)?;

        let now = chrono::Utc::now().to_rfc3339();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (collection, id, document, metadata, embedding, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(collection, id) DO UPDATE SET
                    document = excluded.document,
                    metadata = excluded.metadata,
                    embedding = excluded.embedding",
            )?;
            for record in &records {
                let metadata_json = serde_json::to_string(&record.metadata)?;
                stmt.execute(params![
                    name,
                    record.id,
                    record.document,
                    metadata_json,
                    encode_embedding(&record.embedding),
                    now
                ])?;
            }
        }
        if dimension != current {
            tx.execute(
                "UPDATE collections SET dimension = ?1 WHERE name = ?2",
                params![dimension.map(|d| d as i64), name],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn query(
        &self,
        name: &str,
        embedding: &[f32],
        n: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>> {
        let conn = self.conn.lock();
        let dimension =
            Self::collection_dimension(&conn, name)?.ok_or_else(|| missing_collection(name))?;
        check_query_dimension(name, dimension, embedding)?;
        let records = Self::load_records(&conn, name)?;
        rank(name, &records, embedding, n, filter)
    }

    fn count(&self, name: &str) -> Result<usize> {
        let conn = self.conn.lock();
        if Self::collection_dimension(&conn, name)?.is_none() {
            return Err(missing_collection(name));
        }
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn reset(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch("DELETE FROM records; DELETE FROM collections;")?;
        Ok(())
    }
}
