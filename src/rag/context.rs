//! Context building for reasoning prompts.

use super::{FewShotExample, RetrievalResult, FEW_SHOT_LIMIT};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{Match, VectorIndex};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Turns a free-text query into context and few-shot examples.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    /// Create a retriever over `index`, embedding queries with `embedder`.
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Retrieve the `k` nearest records for `query`.
    ///
    /// An empty index yields an empty result rather than an error.
    #[instrument(skip(self, query))]
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        let vector = self.embedder.embed(query).await?;

        let mut matches = self.index.query(&vector, k, true).await?;
        matches.truncate(k);
        debug!("Retrieved {} matches", matches.len());

        Ok(RetrievalResult {
            context_text: format_context(&matches),
            few_shot_examples: matches
                .iter()
                .take(FEW_SHOT_LIMIT)
                .map(FewShotExample::from)
                .collect(),
            matches,
        })
    }
}

/// Render matches as `Q:`/`A:` blocks separated by a blank line.
pub fn format_context(matches: &[Match]) -> String {
    matches
        .iter()
        .map(|m| {
            let example = FewShotExample::from(m);
            format!("Q: {}\nA: {}", example.question, example.solution)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
