//! Fakes shared by unit tests.

use crate::checkpoint::{Checkpoint, CheckpointStore, MemoryCheckpointStore};
use crate::embedding::Embedder;
use crate::error::{ResonateError, Result};
use crate::rag::Generator;
use crate::vector_store::{Match, MemoryVectorStore, VectorIndex, VectorRecord};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Embedder returning a deterministic vector per text and recording every input.
pub struct RecordingEmbedder {
    dims: usize,
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
}

impl RecordingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
        }
    }

    /// The vector this embedder produces for `text`.
    pub fn vector_for(text: &str, dims: usize) -> Vec<f32> {
        (0..dims)
            .map(|d| {
                let sum: usize = text
                    .bytes()
                    .enumerate()
                    .map(|(i, b)| (i + 1) * (d + 1) * b as usize)
                    .sum();
                (sum % 997) as f32 + 1.0
            })
            .collect()
    }

    /// Number of `embed_batch` calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every text embedded so far, in call order.
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Embedder for RecordingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().unwrap().extend(texts.iter().cloned());
        Ok(texts.iter().map(|t| Self::vector_for(t, self.dims)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Embedder that succeeds until its n-th call (one-based), which fails.
pub struct FailingEmbedder {
    fail_on: usize,
    calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn failing_on_call(fail_on: usize) -> Self {
        Self {
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(ResonateError::Embedding(format!("injected failure on call {}", call)));
        }
        Ok(texts.iter().map(|t| RecordingEmbedder::vector_for(t, 2)).collect())
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Index over a shared memory store whose n-th upsert (one-based) fails.
pub struct FlakyIndex {
    inner: Arc<MemoryVectorStore>,
    fail_on: usize,
    upserts: AtomicUsize,
}

impl FlakyIndex {
    pub fn failing_on_call(inner: Arc<MemoryVectorStore>, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            upserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VectorIndex for FlakyIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        let call = self.upserts.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(ResonateError::VectorStore(format!("injected failure on upsert {}", call)));
        }
        self.inner.upsert(records).await
    }

    async fn query(&self, vector: &[f32], top_k: usize, include_metadata: bool) -> Result<Vec<Match>> {
        self.inner.query(vector, top_k, include_metadata).await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }
}

/// Checkpoint store over a shared memory store whose n-th write (one-based) fails.
pub struct FailingCheckpointStore {
    inner: Arc<MemoryCheckpointStore>,
    fail_on: usize,
    writes: AtomicUsize,
}

impl FailingCheckpointStore {
    pub fn failing_on_write(inner: Arc<MemoryCheckpointStore>, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            writes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CheckpointStore for FailingCheckpointStore {
    async fn read(&self) -> Result<Option<Checkpoint>> {
        self.inner.read().await
    }

    async fn write(&self, checkpoint: &Checkpoint) -> Result<()> {
        let call = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(ResonateError::Checkpoint(format!("injected failure on write {}", call)));
        }
        self.inner.write(checkpoint).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

/// Embedder that drops the last vector of every response.
pub struct ShortEmbedder;

#[async_trait]
impl Embedder for ShortEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .skip(1)
            .map(|t| RecordingEmbedder::vector_for(t, 2))
            .collect())
    }

    fn dimensions(&self) -> usize {
        2
    }
}

/// Index that answers every query with the same matches.
pub struct StaticIndex {
    matches: Vec<Match>,
    last_query: Mutex<Option<(usize, bool)>>,
}

impl StaticIndex {
    pub fn new(matches: Vec<Match>) -> Self {
        Self {
            matches,
            last_query: Mutex::new(None),
        }
    }

    /// `(top_k, include_metadata)` of the most recent query.
    pub fn last_query(&self) -> Option<(usize, bool)> {
        *self.last_query.lock().unwrap()
    }
}

#[async_trait]
impl VectorIndex for StaticIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        Ok(records.len())
    }

    async fn query(&self, _vector: &[f32], top_k: usize, include_metadata: bool) -> Result<Vec<Match>> {
        *self.last_query.lock().unwrap() = Some((top_k, include_metadata));
        Ok(self.matches.clone())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.matches.len())
    }
}

/// Generator that records prompts and answers `answer <n>`.
#[derive(Default)]
pub struct RecordingGenerator {
    fail: bool,
    requests: Mutex<Vec<(String, u32)>>,
}

impl RecordingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn max_tokens(&self) -> Vec<u32> {
        self.requests.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        if self.fail {
            return Err(ResonateError::Generation("injected failure".to_string()));
        }
        let mut requests = self.requests.lock().unwrap();
        requests.push((prompt.to_string(), max_tokens));
        Ok(format!("answer {}", requests.len()))
    }
}
