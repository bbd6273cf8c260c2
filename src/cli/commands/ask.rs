//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::{Context, Result};
use std::path::Path;

/// Run the ask command.
pub async fn run_ask(
    transcript: Option<&str>,
    transcript_file: Option<&Path>,
    question: Option<&str>,
    prompts_only: bool,
    json: bool,
    settings: Settings,
) -> Result<()> {
    let operation = if prompts_only {
        Operation::Retrieve
    } else {
        Operation::Ask
    };
    if let Err(e) = preflight::check(operation, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let transcript = match (transcript, transcript_file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read transcript from {}", path.display()))?,
        (None, None) => anyhow::bail!("Provide --transcript or --transcript-file"),
    };

    let orchestrator = Orchestrator::new(settings)?;
    let engine = orchestrator.reasoning_engine();

    if prompts_only {
        let (zero_shot, few_shot, retrieval) = engine.prepare(&transcript, question).await?;
        Output::info(&format!(
            "Retrieved {} matches, {} few-shot examples",
            retrieval.matches.len(),
            retrieval.few_shot_examples.len()
        ));
        Output::header("Zero-shot prompt");
        println!("{}", zero_shot);
        Output::header("Few-shot prompt");
        println!("{}", few_shot);
        return Ok(());
    }

    let spinner = Output::spinner("Retrieving context and generating answers...");
    let result = engine.resonate(&transcript, question).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) if json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Ok(response) => {
            if response.retrieval.is_empty() {
                Output::warning("No matching records in the index; answers are ungrounded.");
            }
            println!("\n{}\n", response.format_for_display());
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answers: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
