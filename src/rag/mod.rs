//! Retrieval-augmented reasoning over the indexed corpus.
//!
//! A query is embedded, matched against the vector index and turned into
//! context text plus a handful of worked examples. Those feed the zero-shot
//! and few-shot prompts that [`ReasoningEngine`] sends to the model.

pub mod context;
pub mod prompt;
mod response;

pub use context::Retriever;
pub use prompt::{build_few_shot_prompt, build_zero_shot_prompt, PromptAssembler};
pub use response::{Generator, OpenAIGenerator, ReasoningEngine, ReasoningResponse};

use crate::vector_store::Match;
use serde::Serialize;

/// Most matches used as few-shot examples.
pub const FEW_SHOT_LIMIT: usize = 3;

/// A worked question/solution pair shown to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FewShotExample {
    pub question: String,
    pub solution: String,
}

impl From<&Match> for FewShotExample {
    fn from(m: &Match) -> Self {
        match &m.metadata {
            Some(metadata) => Self {
                question: metadata.question.clone(),
                solution: metadata.solution.clone(),
            },
            None => Self::default(),
        }
    }
}

/// Context and examples retrieved for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetrievalResult {
    /// Matches rendered as `Q:`/`A:` blocks separated by blank lines.
    pub context_text: String,
    /// At most [`FEW_SHOT_LIMIT`] examples, best match first.
    pub few_shot_examples: Vec<FewShotExample>,
    /// Matches the result was built from, best first.
    #[serde(skip)]
    pub matches: Vec<Match>,
}

impl RetrievalResult {
    /// True when the index had nothing to offer.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
