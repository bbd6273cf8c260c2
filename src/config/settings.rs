//! Configuration settings for Resonate.

use crate::chunking::DEFAULT_MAX_TOKENS_PER_CHUNK;
use crate::corpus::{TextLimits, MAX_EMBED_TEXT_CHARS, MAX_METADATA_CHARS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub embedding: EmbeddingSettings,
    pub ingest: IngestSettings,
    pub vector_store: VectorStoreSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.resonate".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider (openai).
    pub provider: String,
    /// Embedding model to use.
    pub model: String,
    /// Requested embedding dimensions. The model's native size when unset.
    pub dimensions: Option<u32>,
    /// Token budget for a single embedding request.
    pub max_tokens_per_chunk: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-3-large".to_string(),
            dimensions: None,
            max_tokens_per_chunk: DEFAULT_MAX_TOKENS_PER_CHUNK,
            timeout_secs: 300,
        }
    }
}

impl EmbeddingSettings {
    /// Vector length produced by the configured model.
    pub fn vector_dimensions(&self) -> usize {
        match self.dimensions {
            Some(d) => d as usize,
            None if self.model == "text-embedding-3-large" => 3072,
            None => 1536,
        }
    }
}

/// Corpus ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Default newline-delimited JSON corpus to ingest.
    pub source_path: String,
    /// Number of records embedded and upserted together.
    pub batch_size: usize,
    /// Where the resume checkpoint lives.
    pub checkpoint_path: String,
    /// Source tag stored for records that carry none.
    pub default_source: String,
    /// Per-field character limit before embedding.
    pub embed_text_chars: usize,
    /// Per-field character limit for stored metadata.
    pub metadata_chars: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            source_path: "~/.resonate/data/corpus.jsonl".to_string(),
            batch_size: 64,
            checkpoint_path: "~/.resonate/ingestion-checkpoint.json".to_string(),
            default_source: crate::corpus::DEFAULT_SOURCE.to_string(),
            embed_text_chars: MAX_EMBED_TEXT_CHARS,
            metadata_chars: MAX_METADATA_CHARS,
        }
    }
}

impl IngestSettings {
    /// Truncation limits applied while normalizing records.
    pub fn text_limits(&self) -> TextLimits {
        TextLimits {
            embed_chars: self.embed_text_chars,
            metadata_chars: self.metadata_chars,
        }
    }
}

/// Vector index provider type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Local SQLite file (default).
    #[default]
    Sqlite,
    /// In-process map, lost on exit.
    Memory,
    /// Hosted Pinecone index.
    Pinecone,
}

impl std::str::FromStr for VectorStoreProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(VectorStoreProvider::Sqlite),
            "memory" => Ok(VectorStoreProvider::Memory),
            "pinecone" => Ok(VectorStoreProvider::Pinecone),
            _ => Err(format!("Unknown vector store provider: {}", s)),
        }
    }
}

impl std::fmt::Display for VectorStoreProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VectorStoreProvider::Sqlite => write!(f, "sqlite"),
            VectorStoreProvider::Memory => write!(f, "memory"),
            VectorStoreProvider::Pinecone => write!(f, "pinecone"),
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory, pinecone).
    pub provider: VectorStoreProvider,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
    /// Index host URL, e.g. `https://my-index-abc123.svc.us-east-1.pinecone.io`.
    pub pinecone_host: Option<String>,
    /// Namespace inside the Pinecone index.
    pub pinecone_namespace: Option<String>,
    /// API key. Falls back to `PINECONE_API_KEY`.
    pub pinecone_api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries after the first attempt on throttling, server or connection errors.
    pub max_retries: usize,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: VectorStoreProvider::Sqlite,
            sqlite_path: "~/.resonate/vectors.db".to_string(),
            pinecone_host: None,
            pinecone_namespace: None,
            pinecone_api_key: None,
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

impl VectorStoreSettings {
    /// Resolve the Pinecone API key from config or environment.
    pub fn resolved_pinecone_api_key(&self) -> Option<String> {
        self.pinecone_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("PINECONE_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Number of nearest neighbours requested per query.
    pub top_k: usize,
    /// Transcript prefix used as the query when no question is given.
    pub query_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            query_chars: 500,
        }
    }
}

/// Answer generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Chat model used for both prompt variants.
    pub model: String,
    /// Completion token limit per call.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_tokens: 600,
            temperature: 0.7,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.ingest.batch_size == 0 {
            return Err(crate::error::ResonateError::Config(
                "ingest.batch_size must be at least 1".to_string(),
            ));
        }
        if self.embedding.max_tokens_per_chunk == 0 {
            return Err(crate::error::ResonateError::Config(
                "embedding.max_tokens_per_chunk must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ResonateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("resonate")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Get the expanded checkpoint path.
    pub fn checkpoint_path(&self) -> PathBuf {
        Self::expand_path(&self.ingest.checkpoint_path)
    }

    /// Get the expanded default corpus path.
    pub fn source_path(&self) -> PathBuf {
        Self::expand_path(&self.ingest.source_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let settings = Settings::default();
        assert_eq!(settings.ingest.batch_size, 64);
        assert_eq!(settings.embedding.max_tokens_per_chunk, 6000);
        assert_eq!(settings.ingest.default_source, "unknown-source");
        assert_eq!(settings.retrieval.top_k, 5);
        assert_eq!(settings.embedding.vector_dimensions(), 3072);

        let limits = settings.ingest.text_limits();
        assert_eq!(limits.embed_chars, 2000);
        assert_eq!(limits.metadata_chars, 500);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [ingest]
            batch_size = 16

            [vector_store]
            provider = "pinecone"
            pinecone_host = "https://example.svc.pinecone.io"
            "#,
        )
        .unwrap();

        assert_eq!(settings.ingest.batch_size, 16);
        assert_eq!(settings.ingest.metadata_chars, 500);
        assert_eq!(settings.vector_store.provider, VectorStoreProvider::Pinecone);
        assert_eq!(settings.generation.model, "gpt-4o-mini");
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut settings = Settings::default();
        settings.ingest.batch_size = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut settings = Settings::default();
        settings.retrieval.top_k = 9;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.retrieval.top_k, 9);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("SQLite".parse::<VectorStoreProvider>().unwrap(), VectorStoreProvider::Sqlite);
        assert!("faiss".parse::<VectorStoreProvider>().is_err());
    }
}
