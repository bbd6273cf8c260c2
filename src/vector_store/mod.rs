//! Vector index abstraction for Resonate.
//!
//! Provides a trait-based interface for different vector database backends.

mod memory;
mod pinecone;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use pinecone::PineconeIndex;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata stored alongside each vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordMetadata {
    pub question: String,
    pub solution: String,
    pub source: String,
}

/// A vector keyed by a stable id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Unique id. Writing the same id again replaces the previous entry.
    pub id: String,
    /// Embedding vector.
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// A nearest-neighbour match.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub id: String,
    /// Similarity score (higher is better).
    pub score: f32,
    /// Present when metadata was requested and stored.
    pub metadata: Option<RecordMetadata>,
}

/// Trait for vector index implementations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records by id. Returns the number written.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize>;

    /// Return up to `top_k` matches ordered by descending similarity.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<Match>>;

    /// Get total record count.
    async fn count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort matches by descending score and keep the first `top_k`.
pub(crate) fn rank(mut matches: Vec<Match>, top_k: usize) -> Vec<Match> {
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    matches.truncate(top_k);
    matches
}
