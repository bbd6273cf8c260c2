//! Token counting.

use crate::error::{ResonateError, Result};
use tiktoken_rs::CoreBPE;

/// Counts tokens in a piece of text. Must be deterministic and side-effect free.
pub trait TokenCounter: Send + Sync {
    /// Number of tokens `text` encodes to.
    fn count(&self, text: &str) -> usize;
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn count(&self, text: &str) -> usize {
        self(text)
    }
}

/// The `cl100k_base` encoding used by the `text-embedding-3-*` models.
pub struct Cl100kTokenizer {
    bpe: CoreBPE,
}

impl Cl100kTokenizer {
    /// Build the tokenizer from the bundled vocabulary.
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ResonateError::Tokenizer(format!("Failed to load cl100k_base: {}", e)))?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for Cl100kTokenizer {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cl100k_counts_are_stable() {
        let tokenizer = Cl100kTokenizer::new().unwrap();
        let text = "QUESTION: What is entropy?\nSOLUTION: A measure of disorder.";

        let first = tokenizer.count(text);
        assert!(first > 0);
        assert_eq!(first, tokenizer.count(text));
        assert_eq!(tokenizer.count(""), 0);
    }

    #[test]
    fn test_longer_text_costs_more() {
        let tokenizer = Cl100kTokenizer::new().unwrap();
        assert!(tokenizer.count("hello world hello world") > tokenizer.count("hello world"));
    }
}
