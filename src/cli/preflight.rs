//! Pre-flight checks before expensive operations.
//!
//! Validates that required credentials and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{Settings, VectorStoreProvider};
use crate::error::{ResonateError, Result};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Ingestion embeds records and writes the index.
    Ingest,
    /// Retrieval embeds the query and reads the index.
    Retrieve,
    /// Asking additionally calls the chat model.
    Ask,
    /// Status only reads the checkpoint and index.
    Status,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Ingest | Operation::Retrieve | Operation::Ask => {
            check_api_key()?;
            check_vector_store(settings)?;
        }
        Operation::Status => {
            check_vector_store(settings)?;
        }
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(ResonateError::Config(
            "OPENAI_API_KEY is empty. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
        Err(_) => Err(ResonateError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}

/// Check the selected vector index has what it needs to connect.
fn check_vector_store(settings: &Settings) -> Result<()> {
    let store = &settings.vector_store;
    if store.provider != VectorStoreProvider::Pinecone {
        return Ok(());
    }

    if store.resolved_pinecone_api_key().is_none() {
        return Err(ResonateError::Config(
            "Pinecone API key not set. Set vector_store.pinecone_api_key or export PINECONE_API_KEY"
                .to_string(),
        ));
    }
    match store.pinecone_host.as_deref() {
        Some(host) if !host.trim().is_empty() => Ok(()),
        _ => Err(ResonateError::Config(
            "vector_store.pinecone_host is not set. Copy the index host from the Pinecone console"
                .to_string(),
        )),
    }
}
