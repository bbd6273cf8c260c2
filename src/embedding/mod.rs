//! Embedding generation for semantic search and retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::chunking::TokenChunker;
use crate::error::{ResonateError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embeddings for multiple texts, one vector per text, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ResonateError::Embedding("Empty embedding response".to_string()))
    }

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Splits large batches into token-bounded requests against an inner embedder.
///
/// Output vector `i` always belongs to input text `i`. A failure in any
/// request fails the whole call.
pub struct ChunkedEmbedder {
    inner: Arc<dyn Embedder>,
    chunker: TokenChunker,
}

impl ChunkedEmbedder {
    /// Wrap `inner`, splitting batches with `chunker`.
    pub fn new(inner: Arc<dyn Embedder>, chunker: TokenChunker) -> Self {
        Self { inner, chunker }
    }
}

#[async_trait]
impl Embedder for ChunkedEmbedder {
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let chunks = self.chunker.chunk(texts);
        if chunks.len() > 1 {
            warn!(
                "Large batch: splitting {} texts into {} chunks (budget {} tokens)",
                texts.len(),
                chunks.len(),
                self.chunker.max_tokens()
            );
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for (i, chunk) in chunks.iter().enumerate() {
            debug!(
                "Embedding chunk {}/{} ({} texts, {} tokens)",
                i + 1,
                chunks.len(),
                chunk.len(),
                chunk.tokens
            );

            let embeddings = self.inner.embed_batch(&texts[chunk.range.clone()]).await?;
            if embeddings.len() != chunk.len() {
                return Err(ResonateError::Embedding(format!(
                    "Embedder returned {} vectors for a chunk of {} texts",
                    embeddings.len(),
                    chunk.len()
                )));
            }
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}
