//! Error types for Resonate.

use thiserror::Error;

/// Library-level error type for Resonate operations.
#[derive(Error, Debug)]
pub enum ResonateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not parse record on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    VectorStore(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Resonate operations.
pub type Result<T> = std::result::Result<T, ResonateError>;
