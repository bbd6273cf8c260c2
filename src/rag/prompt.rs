//! Zero-shot and few-shot prompt assembly.
//!
//! Both builders are pure: identical inputs always give byte-identical prompts.

use super::FewShotExample;
use crate::config::{Prompts, ReasoningPrompts};
use std::collections::HashMap;

/// Builds reasoning prompts from a set of templates.
#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    templates: ReasoningPrompts,
}

impl PromptAssembler {
    /// Use the given templates instead of the built-in ones.
    pub fn new(templates: ReasoningPrompts) -> Self {
        Self { templates }
    }

    /// Prompt that answers from the transcript and retrieved context alone.
    pub fn zero_shot(&self, transcript: &str, question: Option<&str>, context_text: &str) -> String {
        let t = &self.templates;
        let vars = HashMap::from([
            ("context", or_fallback(context_text, &t.zero_shot_empty_context)),
            ("transcript", transcript),
            ("question", or_fallback(question.unwrap_or(""), &t.zero_shot_default_question)),
        ]);
        Prompts::render(&t.zero_shot, &vars)
    }

    /// Prompt that leads with worked examples and ends with an `A:` cue.
    pub fn few_shot(
        &self,
        transcript: &str,
        question: Option<&str>,
        context_text: &str,
        examples: &[FewShotExample],
    ) -> String {
        let t = &self.templates;
        let examples_text = examples
            .iter()
            .map(|ex| {
                let vars = HashMap::from([
                    ("question", ex.question.as_str()),
                    ("solution", ex.solution.as_str()),
                ]);
                Prompts::render(&t.example, &vars)
            })
            .collect::<Vec<_>>()
            .join(&t.example_separator);

        let vars = HashMap::from([
            ("examples", or_fallback(&examples_text, &t.few_shot_no_examples)),
            ("context", or_fallback(context_text, &t.few_shot_empty_context)),
            ("transcript", transcript),
            ("question", or_fallback(question.unwrap_or(""), &t.few_shot_default_question)),
        ]);
        Prompts::render(&t.few_shot, &vars)
    }
}

fn or_fallback<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Build the zero-shot prompt with the built-in templates.
pub fn build_zero_shot_prompt(transcript: &str, question: Option<&str>, context_text: &str) -> String {
    PromptAssembler::default().zero_shot(transcript, question, context_text)
}

/// Build the few-shot prompt with the built-in templates.
pub fn build_few_shot_prompt(
    transcript: &str,
    question: Option<&str>,
    context_text: &str,
    examples: &[FewShotExample],
) -> String {
    PromptAssembler::default().few_shot(transcript, question, context_text, examples)
}
