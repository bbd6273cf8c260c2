//! Prompt templates for Resonate.
//!
//! Prompts can be customized by placing a `reasoning.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub reasoning: ReasoningPrompts,
}

/// Templates and fallback texts for the zero-shot and few-shot reasoning prompts.
///
/// Placeholders use the `{{name}}` form. The zero-shot and few-shot templates
/// receive `context`, `transcript` and `question`; the few-shot template also
/// receives `examples`, each rendered through `example`, which receives
/// `question` and `solution`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningPrompts {
    pub zero_shot: String,
    pub few_shot: String,
    pub example: String,
    /// Joins rendered examples.
    pub example_separator: String,
    pub zero_shot_default_question: String,
    pub zero_shot_empty_context: String,
    pub few_shot_default_question: String,
    pub few_shot_empty_context: String,
    pub few_shot_no_examples: String,
}

impl Default for ReasoningPrompts {
    fn default() -> Self {
        Self {
            zero_shot: r#"
You are an education-domain reasoning assistant.

Use the following CONTEXT (problems and solutions from a dataset) plus the TRANSCRIPT to answer.
Show clear reasoning steps, then a short final answer.

CONTEXT:
{{context}}

TRANSCRIPT:
{{transcript}}

QUESTION:
{{question}}
"#
            .to_string(),

            few_shot: r#"
You are a tutoring assistant. Always:

- Think step by step.
- Then write "Final Answer:" on a separate line.

Here are some example question–answer pairs from a dataset:
{{examples}}

You also have additional CONTEXT:
{{context}}

Now answer this new case:

TRANSCRIPT:
{{transcript}}

QUESTION:
{{question}}

A:
"#
            .to_string(),

            example: r#"
Example:
Q: {{question}}
A:
Step 1: (explain reasoning...)
Step 2: (continue reasoning...)
Final Answer: {{solution}}
"#
            .to_string(),

            example_separator: "\n".to_string(),
            zero_shot_default_question: "Explain the key ideas from the transcript for a student."
                .to_string(),
            zero_shot_empty_context: "(no extra context found)".to_string(),
            few_shot_default_question: "Explain the main concepts as if teaching a student."
                .to_string(),
            few_shot_empty_context: "(no extra context)".to_string(),
            few_shot_no_examples: "(no examples available)".to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, overriding defaults with files from `custom_dir` when present.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let reasoning_path = custom_path.join("reasoning.toml");
            if reasoning_path.exists() {
                let content = std::fs::read_to_string(&reasoning_path)?;
                prompts.reasoning = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is a single left-to-right pass: text inserted for one
    /// placeholder is never scanned again, and unknown placeholders are kept verbatim.
    pub fn render(template: &str, vars: &HashMap<&str, &str>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            result.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];
            match after_open.find("}}") {
                Some(close) => {
                    let key = after_open[..close].trim();
                    match vars.get(key) {
                        Some(value) => result.push_str(value),
                        None => result.push_str(&rest[open..open + 2 + close + 2]),
                    }
                    rest = &after_open[close + 2..];
                }
                None => {
                    result.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.reasoning.zero_shot.contains("{{transcript}}"));
        assert!(prompts.reasoning.few_shot.trim_end().ends_with("A:"));
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{ count }} messages.";
        let vars = HashMap::from([("name", "Alice"), ("count", "5")]);

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_render_does_not_expand_inserted_text() {
        let template = "T: {{transcript}} Q: {{question}}";
        let vars = HashMap::from([("transcript", "say {{question}}"), ("question", "why?")]);

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "T: say {{question}} Q: why?");
    }

    #[test]
    fn test_render_keeps_unknown_and_unclosed_placeholders() {
        let vars = HashMap::from([("a", "1")]);
        assert_eq!(Prompts::render("{{a}} {{b}} {{c", &vars), "1 {{b}} {{c");
    }

    #[test]
    fn test_load_custom_reasoning_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("reasoning.toml"),
            "zero_shot = \"Q={{question}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str()).unwrap();
        assert_eq!(prompts.reasoning.zero_shot, "Q={{question}}");
        // Unspecified fields keep their defaults.
        assert_eq!(prompts.reasoning.few_shot_no_examples, "(no examples available)");
    }
}
