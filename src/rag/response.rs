//! Answer generation for the reasoning endpoint.

use super::{PromptAssembler, RetrievalResult, Retriever};
use crate::corpus::truncate_chars;
use crate::error::{ResonateError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Text generation backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Complete `prompt`, producing at most `max_tokens` tokens.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

/// Chat-completion generator backed by OpenAI.
pub struct OpenAIGenerator {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIGenerator {
    /// Create a generator for `model`.
    pub fn new(model: &str, temperature: f32, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            temperature,
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| ResonateError::Generation(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_completion_tokens(max_tokens)
            .temperature(self.temperature)
            .build()
            .map_err(|e| ResonateError::Generation(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            ResonateError::OpenAI(format!("Failed to generate response: {}", e))
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ResonateError::Generation("Empty response from model".to_string()))
    }
}

/// Both answers plus the retrieval they were grounded on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningResponse {
    pub zero_shot: String,
    pub few_shot: String,
    #[serde(skip)]
    pub retrieval: RetrievalResult,
}

impl ReasoningResponse {
    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        format!(
            "--- Zero-shot ---\n{}\n\n--- Few-shot ({} examples) ---\n{}",
            self.zero_shot.trim(),
            self.retrieval.few_shot_examples.len(),
            self.few_shot.trim()
        )
    }
}

/// Retrieval followed by two independent generations.
pub struct ReasoningEngine {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    prompts: PromptAssembler,
    top_k: usize,
    query_chars: usize,
    max_tokens: u32,
}

impl ReasoningEngine {
    /// Create an engine with the defaults of the reasoning endpoint.
    pub fn new(retriever: Retriever, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
            prompts: PromptAssembler::default(),
            top_k: 5,
            query_chars: 500,
            max_tokens: 600,
        }
    }

    /// Use custom prompt templates.
    pub fn with_prompts(mut self, prompts: PromptAssembler) -> Self {
        self.prompts = prompts;
        self
    }

    /// Number of matches retrieved per request.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Transcript prefix used as the query when no question is given.
    pub fn with_query_chars(mut self, query_chars: usize) -> Self {
        self.query_chars = query_chars;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The text used to query the index.
    pub fn retrieval_query<'a>(&self, transcript: &'a str, question: Option<&'a str>) -> &'a str {
        match question {
            Some(q) if !q.is_empty() => q,
            _ => truncate_chars(transcript, self.query_chars),
        }
    }

    /// Retrieve context and build both prompts without calling the model.
    pub async fn prepare(
        &self,
        transcript: &str,
        question: Option<&str>,
    ) -> Result<(String, String, RetrievalResult)> {
        if transcript.trim().is_empty() {
            return Err(ResonateError::InvalidInput("transcript is required".to_string()));
        }

        let query = self.retrieval_query(transcript, question);
        debug!("Retrieving context for query of {} chars", query.chars().count());
        let retrieval = self.retriever.retrieve(query, self.top_k).await?;

        let zero = self.prompts.zero_shot(transcript, question, &retrieval.context_text);
        let few = self.prompts.few_shot(
            transcript,
            question,
            &retrieval.context_text,
            &retrieval.few_shot_examples,
        );
        Ok((zero, few, retrieval))
    }

    /// Answer `question` about `transcript` in zero-shot and few-shot styles.
    #[instrument(skip_all, fields(has_question = question.is_some_and(|q| !q.is_empty())))]
    pub async fn resonate(&self, transcript: &str, question: Option<&str>) -> Result<ReasoningResponse> {
        let (zero_prompt, few_prompt, retrieval) = self.prepare(transcript, question).await?;

        info!(
            "Calling model with {} context matches and {} examples",
            retrieval.matches.len(),
            retrieval.few_shot_examples.len()
        );
        let (zero_shot, few_shot) = tokio::try_join!(
            self.generator.generate(&zero_prompt, self.max_tokens),
            self.generator.generate(&few_prompt, self.max_tokens),
        )?;

        Ok(ReasoningResponse {
            zero_shot,
            few_shot,
            retrieval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::build_zero_shot_prompt;
    use crate::test_support::{RecordingEmbedder, RecordingGenerator, StaticIndex};
    use crate::vector_store::{Match, RecordMetadata};
    use tokio_test::{assert_err, assert_ok};

    fn hits(n: usize) -> Vec<Match> {
        (0..n)
            .map(|i| Match {
                id: format!("rec-{}", i),
                score: 1.0 - i as f32 / 10.0,
                metadata: Some(RecordMetadata {
                    question: format!("q{}", i),
                    solution: format!("s{}", i),
                    source: "unknown-source".to_string(),
                }),
            })
            .collect()
    }

    fn engine(
        embedder: Arc<RecordingEmbedder>,
        index: Arc<StaticIndex>,
        generator: Arc<RecordingGenerator>,
    ) -> ReasoningEngine {
        ReasoningEngine::new(Retriever::new(embedder, index), generator)
    }

    #[tokio::test]
    async fn test_resonate_returns_both_answers() {
        let generator = Arc::new(RecordingGenerator::new());
        let index = Arc::new(StaticIndex::new(hits(4)));
        let engine = engine(Arc::new(RecordingEmbedder::new(3)), index.clone(), generator.clone());

        let response = assert_ok!(engine.resonate("Entropy always grows.", Some("Why?")).await);

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts.iter().any(|p| p.ends_with("A:\n")));
        assert!(generator.max_tokens().iter().all(|&t| t == 600));

        assert_eq!(response.retrieval.few_shot_examples.len(), 3);
        assert_eq!(index.last_query(), Some((5, true)));
        assert!(response.zero_shot.starts_with("answer "));
        assert!(response.few_shot.starts_with("answer "));
        assert_ne!(response.zero_shot, response.few_shot);
    }

    #[tokio::test]
    async fn test_question_is_used_as_query() {
        let embedder = Arc::new(RecordingEmbedder::new(3));
        let engine = engine(
            embedder.clone(),
            Arc::new(StaticIndex::new(Vec::new())),
            Arc::new(RecordingGenerator::new()),
        );

        engine.resonate("long transcript", Some("What is heat?")).await.unwrap();
        assert_eq!(embedder.texts(), vec!["What is heat?".to_string()]);
    }

    #[tokio::test]
    async fn test_transcript_prefix_used_without_question() {
        let embedder = Arc::new(RecordingEmbedder::new(3));
        let engine = engine(
            embedder.clone(),
            Arc::new(StaticIndex::new(Vec::new())),
            Arc::new(RecordingGenerator::new()),
        );

        let transcript = "é".repeat(700);
        engine.resonate(&transcript, None).await.unwrap();

        let texts = embedder.texts();
        assert_eq!(texts[0].chars().count(), 500);
    }

    #[tokio::test]
    async fn test_empty_index_uses_fallback_prompts() {
        let generator = Arc::new(RecordingGenerator::new());
        let engine = engine(
            Arc::new(RecordingEmbedder::new(3)),
            Arc::new(StaticIndex::new(Vec::new())),
            generator.clone(),
        );

        let (zero, few, retrieval) = engine.prepare("Cells divide.", None).await.unwrap();
        assert!(retrieval.is_empty());
        assert_eq!(zero, build_zero_shot_prompt("Cells divide.", None, ""));
        assert!(few.contains("(no examples available)"));
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_blank_transcript_rejected() {
        let engine = engine(
            Arc::new(RecordingEmbedder::new(3)),
            Arc::new(StaticIndex::new(Vec::new())),
            Arc::new(RecordingGenerator::new()),
        );

        let err = engine.resonate("  \n", Some("q")).await.unwrap_err();
        assert!(matches!(err, ResonateError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let engine = engine(
            Arc::new(RecordingEmbedder::new(3)),
            Arc::new(StaticIndex::new(hits(1))),
            Arc::new(RecordingGenerator::failing()),
        );

        assert_err!(engine.resonate("transcript", None).await);
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let response = ReasoningResponse {
            zero_shot: "z".to_string(),
            few_shot: "f".to_string(),
            retrieval: RetrievalResult::default(),
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({"zeroShot": "z", "fewShot": "f"})
        );
    }
}
