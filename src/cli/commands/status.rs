//! Status command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Settings, VectorStoreProvider};
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the status command.
pub async fn run_status(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Status, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let checkpoint_location = match settings.vector_store.provider {
        VectorStoreProvider::Memory => "in memory (not persisted)".to_string(),
        _ => settings.checkpoint_path().display().to_string(),
    };
    let embedding = format!(
        "{} ({} dims)",
        settings.embedding.model,
        settings.embedding.vector_dimensions()
    );
    let orchestrator = Orchestrator::new(settings)?;
    let status = orchestrator.status().await?;

    Output::header("Resonate Status");
    Output::kv("Vector index", &status.provider.to_string());
    Output::kv("Indexed records", &status.indexed_records.to_string());
    Output::kv("Embedding model", &embedding);
    Output::kv("Checkpoint store", &checkpoint_location);

    match status.checkpoint {
        Some(checkpoint) => {
            Output::kv("Last processed line", &checkpoint.last_processed_line.to_string());
            Output::kv("Total processed", &checkpoint.total_processed.to_string());
        }
        None => Output::kv("Checkpoint", "none (next ingest starts at line 1)"),
    }

    Ok(())
}
