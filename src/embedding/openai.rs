//! OpenAI embeddings implementation.

use super::Embedder;
use crate::error::{ResonateError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// OpenAI-based embedder.
///
/// Sends everything it is given in one request; wrap it in a
/// [`ChunkedEmbedder`](super::ChunkedEmbedder) to respect the token limit.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
    request_dimensions: Option<u32>,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config("text-embedding-3-large", None, Duration::from_secs(300))
    }

    /// Create a new OpenAI embedder with custom model and dimensions.
    ///
    /// When `dimensions` is `None` the model's native size is used and no
    /// `dimensions` parameter is sent.
    pub fn with_config(model: &str, dimensions: Option<u32>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            dimensions: dimensions.map(|d| d as usize).unwrap_or_else(|| native_dimensions(model)),
            request_dimensions: dimensions,
        })
    }

    /// The model name sent with each request.
    pub fn model(&self) -> &str {
        &self.model
    }
}

fn native_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, texts), fields(count = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut args = CreateEmbeddingRequestArgs::default();
        args.model(&self.model)
            .input(EmbeddingInput::StringArray(texts.to_vec()));
        if let Some(dimensions) = self.request_dimensions {
            args.dimensions(dimensions);
        }
        let request = args
            .build()
            .map_err(|e| ResonateError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self.client.embeddings().create(request).await.map_err(|e| {
            ResonateError::OpenAI(format!("Embedding API error: {}", e))
        })?;

        // Sort by index to ensure correct order
        let mut embeddings: Vec<_> = response.data.into_iter().collect();
        embeddings.sort_by_key(|e| e.index);

        if embeddings.len() != texts.len() {
            return Err(ResonateError::Embedding(format!(
                "OpenAI returned {} embeddings for {} inputs",
                embeddings.len(),
                texts.len()
            )));
        }

        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings.into_iter().map(|e| e.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
