//! Retrieve command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the retrieve command.
pub async fn run_retrieve(query: &str, k: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Retrieve, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let k = k.unwrap_or(settings.retrieval.top_k);
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Searching...");
    let result = orchestrator.retriever().retrieve(query, k).await;
    spinner.finish_and_clear();

    let retrieval = match result {
        Ok(retrieval) => retrieval,
        Err(e) => {
            Output::error(&format!("Retrieval failed: {}", e));
            return Err(e.into());
        }
    };

    if retrieval.is_empty() {
        Output::warning("No matches found. Has the corpus been ingested?");
        return Ok(());
    }

    Output::success(&format!("Found {} matches", retrieval.matches.len()));
    for (i, m) in retrieval.matches.iter().enumerate() {
        let (question, solution) = m
            .metadata
            .as_ref()
            .map(|meta| (meta.question.as_str(), meta.solution.as_str()))
            .unwrap_or(("", ""));
        Output::match_result(i + 1, &m.id, m.score, question, solution);
    }

    Output::header("Few-shot examples");
    for example in &retrieval.few_shot_examples {
        Output::list_item(&example.question);
    }

    Ok(())
}
