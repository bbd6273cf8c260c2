//! Pipeline orchestrator for Resonate.
//!
//! Builds the embedder, vector index, checkpoint store and generator from
//! [`Settings`] and hands out the pipelines that use them.

use crate::checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
use crate::chunking::{Cl100kTokenizer, TokenChunker};
use crate::config::{Prompts, Settings, VectorStoreProvider};
use crate::embedding::{ChunkedEmbedder, Embedder, OpenAIEmbedder};
use crate::error::{ResonateError, Result};
use crate::ingest::{BatchSummary, IngestConfig, IngestPipeline, IngestReport};
use crate::rag::{Generator, OpenAIGenerator, PromptAssembler, ReasoningEngine, Retriever};
use crate::vector_store::{MemoryVectorStore, PineconeIndex, SqliteVectorStore, VectorIndex};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::{info, instrument};

/// Snapshot of ingestion progress and index size.
#[derive(Debug, Clone)]
pub struct IndexStatus {
    pub provider: VectorStoreProvider,
    pub checkpoint: Option<Checkpoint>,
    pub indexed_records: usize,
}

/// The main orchestrator for the Resonate pipeline.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    checkpoints: Arc<dyn CheckpointStore>,
    generator: Arc<dyn Generator>,
}

impl Orchestrator {
    /// Create an orchestrator from settings.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;

        let timeout = Duration::from_secs(settings.embedding.timeout_secs);
        let openai = Arc::new(OpenAIEmbedder::with_config(
            &settings.embedding.model,
            settings.embedding.dimensions,
            timeout,
        )?);
        let chunker = TokenChunker::new(
            Arc::new(Cl100kTokenizer::new()?),
            settings.embedding.max_tokens_per_chunk,
        );
        let embedder: Arc<dyn Embedder> = Arc::new(ChunkedEmbedder::new(openai, chunker));

        let index = create_index(&settings)?;
        let checkpoints = create_checkpoint_store(&settings);

        let generator: Arc<dyn Generator> = Arc::new(OpenAIGenerator::new(
            &settings.generation.model,
            settings.generation.temperature,
            timeout,
        )?);

        Ok(Self {
            settings,
            prompts,
            embedder,
            index,
            checkpoints,
            generator,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        checkpoints: Arc<dyn CheckpointStore>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            settings,
            prompts,
            embedder,
            index,
            checkpoints,
            generator,
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Build an ingestion pipeline, optionally overriding the batch size.
    pub fn ingest_pipeline(&self, batch_size: Option<usize>) -> IngestPipeline {
        let ingest = &self.settings.ingest;
        let config = IngestConfig {
            batch_size: batch_size.unwrap_or(ingest.batch_size),
            limits: ingest.text_limits(),
            default_source: ingest.default_source.clone(),
        };
        IngestPipeline::new(
            self.embedder.clone(),
            self.index.clone(),
            self.checkpoints.clone(),
            config,
        )
    }

    /// Ingest a newline-delimited JSON file.
    #[instrument(skip(self, path, shutdown, on_batch), fields(path = %path.display()))]
    pub async fn ingest_file(
        &self,
        path: &Path,
        batch_size: Option<usize>,
        shutdown: Arc<AtomicBool>,
        on_batch: impl Fn(&BatchSummary) + Send + Sync + 'static,
    ) -> Result<IngestReport> {
        let file = tokio::fs::File::open(path).await.map_err(|e| {
            ResonateError::InvalidInput(format!("Cannot open {}: {}", path.display(), e))
        })?;
        info!("Streaming records from {}", path.display());

        self.ingest_pipeline(batch_size)
            .with_shutdown(shutdown)
            .on_batch(on_batch)
            .ingest(BufReader::new(file))
            .await
    }

    /// Forget ingestion progress so the next run starts at line 1.
    pub async fn reset_checkpoint(&self) -> Result<()> {
        self.checkpoints.clear().await
    }

    /// Build a retriever over the configured index.
    pub fn retriever(&self) -> Retriever {
        Retriever::new(self.embedder.clone(), self.index.clone())
    }

    /// Build the reasoning engine with configured prompts and limits.
    pub fn reasoning_engine(&self) -> ReasoningEngine {
        ReasoningEngine::new(self.retriever(), self.generator.clone())
            .with_prompts(PromptAssembler::new(self.prompts.reasoning.clone()))
            .with_top_k(self.settings.retrieval.top_k)
            .with_query_chars(self.settings.retrieval.query_chars)
            .with_max_tokens(self.settings.generation.max_tokens)
    }

    /// Current checkpoint and number of indexed records.
    pub async fn status(&self) -> Result<IndexStatus> {
        Ok(IndexStatus {
            provider: self.settings.vector_store.provider,
            checkpoint: self.checkpoints.read().await?,
            indexed_records: self.index.count().await?,
        })
    }
}

/// Open the vector index selected in settings.
pub fn create_index(settings: &Settings) -> Result<Arc<dyn VectorIndex>> {
    let store = &settings.vector_store;
    let index: Arc<dyn VectorIndex> = match store.provider {
        VectorStoreProvider::Sqlite => Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?),
        VectorStoreProvider::Memory => Arc::new(MemoryVectorStore::new()),
        VectorStoreProvider::Pinecone => {
            let api_key = store.resolved_pinecone_api_key().ok_or_else(|| {
                ResonateError::Config(
                    "Pinecone API key not set (vector_store.pinecone_api_key or PINECONE_API_KEY)"
                        .to_string(),
                )
            })?;
            let host = store.pinecone_host.as_deref().ok_or_else(|| {
                ResonateError::Config("vector_store.pinecone_host is not set".to_string())
            })?;
            Arc::new(PineconeIndex::new(
                &api_key,
                host,
                store.pinecone_namespace.clone(),
                Duration::from_secs(store.timeout_secs),
                store.max_retries,
            )?)
        }
    };
    info!("Using {} vector index", store.provider);
    Ok(index)
}

/// Open the checkpoint store that matches the index's lifetime.
///
/// An in-process index is gone when the process exits, so its progress must
/// not outlive it in a file.
pub fn create_checkpoint_store(settings: &Settings) -> Arc<dyn CheckpointStore> {
    match settings.vector_store.provider {
        VectorStoreProvider::Memory => Arc::new(MemoryCheckpointStore::new()),
        VectorStoreProvider::Sqlite | VectorStoreProvider::Pinecone => {
            Arc::new(FileCheckpointStore::new(settings.checkpoint_path()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingEmbedder, RecordingGenerator};
    use std::io::Write;

    fn orchestrator(settings: Settings, generator: Arc<RecordingGenerator>) -> Orchestrator {
        Orchestrator::with_components(
            settings,
            Prompts::default(),
            Arc::new(RecordingEmbedder::new(8)),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(MemoryCheckpointStore::new()),
            generator,
        )
    }

    #[tokio::test]
    async fn test_ingest_file_then_resonate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..5 {
            writeln!(
                file,
                r#"{{"id": "p{}", "question": "Problem {}", "solution": "Answer {}"}}"#,
                i, i, i
            )
            .unwrap();
        }

        let mut settings = Settings::default();
        settings.retrieval.top_k = 4;
        settings.generation.max_tokens = 123;
        let generator = Arc::new(RecordingGenerator::new());
        let orchestrator = orchestrator(settings, generator.clone());

        let report = orchestrator
            .ingest_file(file.path(), Some(2), Arc::new(AtomicBool::new(false)), |_| {})
            .await
            .unwrap();
        assert_eq!(report.total_processed, 5);
        assert_eq!(report.batches_committed, 3);

        let status = orchestrator.status().await.unwrap();
        assert_eq!(status.indexed_records, 5);
        assert_eq!(status.checkpoint.unwrap().last_processed_line, 5);

        let response = orchestrator
            .reasoning_engine()
            .resonate("We studied problems.", Some("Problem 3"))
            .await
            .unwrap();
        assert_eq!(response.retrieval.matches.len(), 4);
        assert_eq!(response.retrieval.few_shot_examples.len(), 3);
        assert_eq!(generator.max_tokens(), vec![123, 123]);
    }

    #[tokio::test]
    async fn test_reset_checkpoint() {
        let orchestrator = orchestrator(Settings::default(), Arc::new(RecordingGenerator::new()));
        orchestrator
            .checkpoints
            .write(&Checkpoint {
                last_processed_line: 3,
                total_processed: 3,
            })
            .await
            .unwrap();

        orchestrator.reset_checkpoint().await.unwrap();
        assert!(orchestrator.status().await.unwrap().checkpoint.is_none());
    }

    #[tokio::test]
    async fn test_missing_input_file() {
        let orchestrator = orchestrator(Settings::default(), Arc::new(RecordingGenerator::new()));
        let err = orchestrator
            .ingest_file(
                Path::new("/nonexistent/corpus.jsonl"),
                None,
                Arc::new(AtomicBool::new(false)),
                |_| {},
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ResonateError::InvalidInput(_)));
    }

    #[test]
    fn test_pinecone_requires_host() {
        let mut settings = Settings::default();
        settings.vector_store.provider = VectorStoreProvider::Pinecone;
        settings.vector_store.pinecone_api_key = Some("key".to_string());

        let err = create_index(&settings).err().unwrap();
        assert!(matches!(err, ResonateError::Config(_)));
    }

    #[test]
    fn test_memory_provider() {
        let mut settings = Settings::default();
        settings.vector_store.provider = VectorStoreProvider::Memory;
        assert!(create_index(&settings).is_ok());
    }

    #[tokio::test]
    async fn test_memory_provider_ignores_checkpoint_file() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint_path = dir.path().join("checkpoint.json");
        let committed = Checkpoint {
            last_processed_line: 3,
            total_processed: 3,
        };
        FileCheckpointStore::new(&checkpoint_path)
            .write(&committed)
            .await
            .unwrap();

        let mut settings = Settings::default();
        settings.ingest.checkpoint_path = checkpoint_path.display().to_string();

        settings.vector_store.provider = VectorStoreProvider::Memory;
        let store = create_checkpoint_store(&settings);
        assert_eq!(store.read().await.unwrap(), None);

        // A fresh in-memory index starts from line 1 and indexes every record.
        let orchestrator = Orchestrator::with_components(
            settings.clone(),
            Prompts::default(),
            Arc::new(RecordingEmbedder::new(8)),
            create_index(&settings).unwrap(),
            store,
            Arc::new(RecordingGenerator::new()),
        );
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..3 {
            writeln!(file, r#"{{"question": "q{}", "solution": "a{}"}}"#, i, i).unwrap();
        }
        let report = orchestrator
            .ingest_file(file.path(), None, Arc::new(AtomicBool::new(false)), |_| {})
            .await
            .unwrap();
        assert_eq!(report.processed_this_run, 3);
        assert_eq!(orchestrator.status().await.unwrap().indexed_records, 3);

        settings.vector_store.provider = VectorStoreProvider::Sqlite;
        let durable = create_checkpoint_store(&settings);
        assert_eq!(durable.read().await.unwrap(), Some(committed));
    }
}
