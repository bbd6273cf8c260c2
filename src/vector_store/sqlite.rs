//! SQLite-based vector store implementation.
//!
//! Uses SQLite with cosine similarity computed in Rust for simplicity.
//! For large corpora, point the pipeline at a hosted index instead.

use super::{cosine_similarity, rank, Match, RecordMetadata, VectorIndex, VectorRecord};
use crate::error::{ResonateError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS vectors (
        id TEXT PRIMARY KEY,
        embedding BLOB NOT NULL,
        question TEXT NOT NULL,
        solution TEXT NOT NULL,
        source TEXT NOT NULL,
        indexed_at TEXT NOT NULL
    );
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Create a new SQLite vector store.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            ResonateError::VectorStore(format!("Failed to acquire lock: {}", e))
        })
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let conn = self.lock()?;

        // One transaction per call: either the whole batch lands or none of it.
        let tx = conn.unchecked_transaction()?;
        let indexed_at = Utc::now().to_rfc3339();

        for record in records {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO vectors
                (id, embedding, question, solution, source, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    record.id,
                    Self::embedding_to_bytes(&record.values),
                    record.metadata.question,
                    record.metadata.solution,
                    record.metadata.source,
                    indexed_at,
                ],
            )?;
        }

        tx.commit()?;
        debug!("Batch upserted {} vectors", records.len());
        Ok(records.len())
    }

    #[instrument(skip(self, vector))]
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<Match>> {
        let conn = self.lock()?;

        let mut stmt =
            conn.prepare("SELECT id, embedding, question, solution, source FROM vectors")?;

        let rows = stmt.query_map([], |row| {
            let embedding_bytes: Vec<u8> = row.get(1)?;
            let metadata = RecordMetadata {
                question: row.get(2)?,
                solution: row.get(3)?,
                source: row.get(4)?,
            };
            Ok((row.get::<_, String>(0)?, Self::bytes_to_embedding(&embedding_bytes), metadata))
        })?;

        let mut matches = Vec::new();
        for row in rows {
            let (id, values, metadata) = row?;
            matches.push(Match {
                id,
                score: cosine_similarity(vector, &values),
                metadata: include_metadata.then_some(metadata),
            });
        }

        let ranked = rank(matches, top_k);
        debug!("Found {} matching vectors", ranked.len());
        Ok(ranked)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM vectors", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
