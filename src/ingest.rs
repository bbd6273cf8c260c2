//! Resumable batch ingestion of a newline-delimited JSON corpus.
//!
//! Lines are read in one forward pass. Parsed records are grouped into
//! batches; each batch is embedded, upserted and only then checkpointed.
//! Batches are processed strictly one after another.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::corpus::{Record, TextLimits, DEFAULT_SOURCE};
use crate::embedding::Embedder;
use crate::error::{ResonateError, Result};
use crate::vector_store::{VectorIndex, VectorRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, instrument, warn};

/// Characters of a malformed line echoed in the log.
const PREVIEW_CHARS: usize = 80;

/// Knobs for an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Records per embed/upsert round trip.
    pub batch_size: usize,
    pub limits: TextLimits,
    /// Source tag for records without one.
    pub default_source: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            limits: TextLimits::default(),
            default_source: DEFAULT_SOURCE.to_string(),
        }
    }
}

/// Progress notification sent after each committed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    /// One-based batch number within this run.
    pub batch_number: usize,
    pub records: usize,
    pub checkpoint: Checkpoint,
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Checkpoint found at start, if any.
    pub resumed_from: Option<Checkpoint>,
    /// Records committed across all runs.
    pub total_processed: usize,
    /// Records committed by this run.
    pub processed_this_run: usize,
    pub batches_committed: usize,
    /// Non-blank lines that failed to parse.
    pub malformed_lines: usize,
    /// Last line covered by a committed batch.
    pub last_processed_line: usize,
    /// The run stopped early on request.
    pub interrupted: bool,
}

type BatchCallback = Box<dyn Fn(&BatchSummary) + Send + Sync>;

/// Streams records into a vector index.
pub struct IngestPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    checkpoints: Arc<dyn CheckpointStore>,
    config: IngestConfig,
    shutdown: Arc<AtomicBool>,
    on_batch: Option<BatchCallback>,
}

impl IngestPipeline {
    /// Create a pipeline over the given capabilities.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        checkpoints: Arc<dyn CheckpointStore>,
        config: IngestConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            checkpoints,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            on_batch: None,
        }
    }

    /// Share a flag that stops the run at the next line or batch boundary.
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Call `callback` after every committed batch.
    pub fn on_batch(mut self, callback: impl Fn(&BatchSummary) + Send + Sync + 'static) -> Self {
        self.on_batch = Some(Box::new(callback));
        self
    }

    /// Ingest every line of `source` not already covered by the checkpoint.
    #[instrument(skip_all, fields(batch_size = self.config.batch_size))]
    pub async fn ingest<R>(&self, source: R) -> Result<IngestReport>
    where
        R: AsyncBufRead + Unpin,
    {
        if self.config.batch_size == 0 {
            return Err(ResonateError::Config("batch size must be at least 1".to_string()));
        }

        let resumed_from = self.checkpoints.read().await?;
        let skip_through = resumed_from.map(|c| c.last_processed_line).unwrap_or(0);
        if let Some(checkpoint) = &resumed_from {
            info!(
                "Resuming from line {} ({} records already processed)",
                checkpoint.last_processed_line + 1,
                checkpoint.total_processed
            );
        }

        let mut report = IngestReport {
            resumed_from,
            total_processed: resumed_from.map(|c| c.total_processed).unwrap_or(0),
            last_processed_line: skip_through,
            ..IngestReport::default()
        };

        let mut batch: Vec<Record> = Vec::with_capacity(self.config.batch_size);
        let mut lines = source.lines();
        let mut line_number = 0usize;

        while let Some(line) = lines.next_line().await? {
            if self.shutdown.load(Ordering::SeqCst) {
                report.interrupted = true;
                break;
            }

            line_number += 1;
            if line_number <= skip_through {
                continue;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match Record::parse_line(trimmed, line_number) {
                Ok(record) => batch.push(record),
                Err(e) => {
                    warn!("Could not parse line, skipping: {} ({})", preview(trimmed), e);
                    report.malformed_lines += 1;
                    continue;
                }
            }

            if batch.len() >= self.config.batch_size {
                self.flush(&mut batch, line_number, &mut report).await?;
            }
        }

        if report.interrupted {
            if !batch.is_empty() {
                info!("Interrupted; discarding {} uncommitted records", batch.len());
            }
        } else if !batch.is_empty() {
            self.flush(&mut batch, line_number, &mut report).await?;
        }

        info!(
            "Ingestion {}. Total records processed: {}",
            if report.interrupted { "interrupted" } else { "complete" },
            report.total_processed
        );
        Ok(report)
    }

    /// Embed, upsert and checkpoint one batch. The checkpoint is written last.
    async fn flush(
        &self,
        batch: &mut Vec<Record>,
        line_number: usize,
        report: &mut IngestReport,
    ) -> Result<()> {
        let limits = &self.config.limits;
        let texts: Vec<String> = batch.iter().map(|r| r.embedding_text(limits)).collect();

        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != batch.len() {
            return Err(ResonateError::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                embeddings.len()
            )));
        }

        let base = report.total_processed;
        let records: Vec<VectorRecord> = batch
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (record, values))| VectorRecord {
                id: record.vector_id(base + i),
                values,
                metadata: record.metadata(limits, &self.config.default_source),
            })
            .collect();

        self.index.upsert(&records).await?;

        let checkpoint = Checkpoint {
            last_processed_line: line_number,
            total_processed: base + batch.len(),
        };
        self.checkpoints.write(&checkpoint).await?;

        report.total_processed = checkpoint.total_processed;
        report.processed_this_run += batch.len();
        report.batches_committed += 1;
        report.last_processed_line = line_number;

        info!(
            "Upserted batch of {} records (total: {})",
            batch.len(),
            checkpoint.total_processed
        );

        if let Some(callback) = &self.on_batch {
            callback(&BatchSummary {
                batch_number: report.batches_committed,
                records: batch.len(),
                checkpoint,
            });
        }

        batch.clear();
        Ok(())
    }
}

fn preview(line: &str) -> &str {
    crate::corpus::truncate_chars(line, PREVIEW_CHARS)
}
