//! Token-budget chunking of text batches for embedding requests.
//!
//! Units are never split: the chunker only decides where one request ends and
//! the next begins.

mod tokens;

pub use tokens::{Cl100kTokenizer, TokenCounter};

use std::ops::Range;
use std::sync::Arc;

/// Default token budget per embedding request (the model's hard limit is 8192).
pub const DEFAULT_MAX_TOKENS_PER_CHUNK: usize = 6000;

/// A contiguous run of input units submitted together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Positions of the units in the original input.
    pub range: Range<usize>,
    /// Sum of the unit token counts.
    pub tokens: usize,
}

impl Chunk {
    /// Number of units in this chunk.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Always false for chunks produced by [`pack_by_budget`].
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Greedily pack units with the given token costs into chunks.
///
/// A unit closes the running chunk when adding it would push the total past
/// `max_tokens` and the running chunk already holds something. A unit that is
/// over budget on its own therefore ends up alone in its chunk.
pub fn pack_by_budget(costs: &[usize], max_tokens: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut running = 0usize;

    for (i, &cost) in costs.iter().enumerate() {
        if running.saturating_add(cost) > max_tokens && i > start {
            chunks.push(Chunk {
                range: start..i,
                tokens: running,
            });
            start = i;
            running = 0;
        }
        running = running.saturating_add(cost);
    }

    if start < costs.len() {
        chunks.push(Chunk {
            range: start..costs.len(),
            tokens: running,
        });
    }

    chunks
}

/// Splits text batches into token-bounded chunks.
#[derive(Clone)]
pub struct TokenChunker {
    counter: Arc<dyn TokenCounter>,
    max_tokens: usize,
}

impl TokenChunker {
    /// Create a chunker with the given counter and budget.
    pub fn new(counter: Arc<dyn TokenCounter>, max_tokens: usize) -> Self {
        Self {
            counter,
            max_tokens,
        }
    }

    /// The configured token budget.
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Partition `texts` into chunks, preserving input order.
    pub fn chunk(&self, texts: &[String]) -> Vec<Chunk> {
        let costs: Vec<usize> = texts.iter().map(|t| self.counter.count(t)).collect();
        pack_by_budget(&costs, self.max_tokens)
    }
}
