//! Durable ingestion progress.
//!
//! A checkpoint records the last input line covered by a committed batch and
//! the running record total. It is written only after a batch's upsert
//! succeeded, so the stored value never runs ahead of the index.

use crate::error::{ResonateError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Ingestion progress marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// One-based number of the last input line covered by a committed batch.
    pub last_processed_line: usize,
    /// Records committed so far, across all runs.
    pub total_processed: usize,
}

/// Storage for the ingestion checkpoint.
///
/// Writes must be atomic relative to reads: a reader sees either the previous
/// checkpoint or the new one, never a mix.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read the stored checkpoint, `None` when nothing was committed yet.
    async fn read(&self) -> Result<Option<Checkpoint>>;

    /// Replace the stored checkpoint.
    async fn write(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Forget all progress.
    async fn clear(&self) -> Result<()>;
}

/// Checkpoint stored as a small JSON file.
///
/// New contents go to a temporary file in the same directory which is then
/// renamed over the old one.
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Store the checkpoint at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the checkpoint file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn checkpoint_error(&self, action: &str, err: impl std::fmt::Display) -> ResonateError {
        ResonateError::Checkpoint(format!("failed to {} {:?}: {}", action, self.path, err))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn read(&self) -> Result<Option<Checkpoint>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.checkpoint_error("read", e)),
        };

        let checkpoint = serde_json::from_str(&content).map_err(|e| self.checkpoint_error("parse", e))?;
        Ok(Some(checkpoint))
    }

    async fn write(&self, checkpoint: &Checkpoint) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| self.checkpoint_error("create directory for", e))?;

        let json = serde_json::to_string_pretty(checkpoint)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| self.checkpoint_error("stage", e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| self.checkpoint_error("write", e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.checkpoint_error("replace", e.error))?;

        debug!(
            "Checkpoint saved: line {}, total {}",
            checkpoint.last_processed_line, checkpoint.total_processed
        );
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.checkpoint_error("remove", e)),
        }
    }
}

/// Checkpoint held in memory. Useful for tests and one-off runs.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    current: Mutex<Option<Checkpoint>>,
    writes: Mutex<Vec<Checkpoint>>,
}

impl MemoryCheckpointStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every checkpoint written so far, oldest first.
    pub fn history(&self) -> Vec<Checkpoint> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn read(&self) -> Result<Option<Checkpoint>> {
        let current = self
            .current
            .lock()
            .map_err(|e| ResonateError::Checkpoint(e.to_string()))?;
        Ok(*current)
    }

    async fn write(&self, checkpoint: &Checkpoint) -> Result<()> {
        *self
            .current
            .lock()
            .map_err(|e| ResonateError::Checkpoint(e.to_string()))? = Some(*checkpoint);
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(*checkpoint);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self
            .current
            .lock()
            .map_err(|e| ResonateError::Checkpoint(e.to_string()))? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("checkpoint.json"));
        assert_eq!(store.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_roundtrip_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("checkpoint.json");
        let store = FileCheckpointStore::new(&path);

        let checkpoint = Checkpoint {
            last_processed_line: 64,
            total_processed: 64,
        };
        store.write(&checkpoint).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["lastProcessedLine"], 64);
        assert_eq!(raw["totalProcessed"], 64);

        assert_eq!(store.read().await.unwrap(), Some(checkpoint));
    }

    #[tokio::test]
    async fn test_overwrite_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path().join("checkpoint.json"));

        store.write(&Checkpoint { last_processed_line: 1, total_processed: 1 }).await.unwrap();
        store.write(&Checkpoint { last_processed_line: 9, total_processed: 7 }).await.unwrap();
        assert_eq!(store.read().await.unwrap().unwrap().last_processed_line, 9);

        store.clear().await.unwrap();
        assert_eq!(store.read().await.unwrap(), None);
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = FileCheckpointStore::new(&path).read().await.unwrap_err();
        assert!(matches!(err, ResonateError::Checkpoint(_)));
    }

    #[tokio::test]
    async fn test_memory_store_tracks_history() {
        let store = MemoryCheckpointStore::new();
        store.write(&Checkpoint { last_processed_line: 2, total_processed: 2 }).await.unwrap();
        store.write(&Checkpoint { last_processed_line: 4, total_processed: 4 }).await.unwrap();

        assert_eq!(store.history().len(), 2);
        assert_eq!(store.read().await.unwrap().unwrap().total_processed, 4);
    }
}
