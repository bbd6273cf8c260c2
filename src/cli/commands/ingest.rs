//! Ingest command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::IngestReport;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Run the ingest command.
pub async fn run_ingest(
    input: Option<&Path>,
    batch_size: Option<usize>,
    reset: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ingest, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let path = input
        .map(Path::to_path_buf)
        .unwrap_or_else(|| settings.source_path());
    let orchestrator = Orchestrator::new(settings)?;

    if reset {
        orchestrator.reset_checkpoint().await?;
        Output::info("Checkpoint cleared, starting from line 1.");
    }

    // Ctrl-C stops the run at the next line; committed batches are kept.
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(
                    "Interrupt received, stopping at the next line; \
                     uncommitted records will be re-read on resume"
                );
                flag.store(true, Ordering::SeqCst);
            }
        });
    }

    Output::info(&format!("Ingesting {}", path.display()));
    let spinner = Output::spinner("Reading records...");
    let progress = spinner.clone();

    let result = orchestrator
        .ingest_file(&path, batch_size, shutdown, move |batch| {
            progress.set_message(format!(
                "Batch {} committed ({} records, {} total, line {})",
                batch.batch_number,
                batch.records,
                batch.checkpoint.total_processed,
                batch.checkpoint.last_processed_line
            ));
        })
        .await;
    spinner.finish_and_clear();

    match result {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Ingestion failed: {}", e));
            Output::info("Progress up to the last committed batch is saved. Rerun to resume.");
            Err(e.into())
        }
    }
}

fn print_report(report: &IngestReport) {
    if let Some(checkpoint) = report.resumed_from {
        Output::info(&format!(
            "Resumed after line {} ({} records from earlier runs)",
            checkpoint.last_processed_line, checkpoint.total_processed
        ));
    }

    if report.interrupted {
        Output::warning(&format!(
            "Interrupted. Total records processed: {}. Rerun to resume.",
            report.total_processed
        ));
    } else {
        Output::success(&format!(
            "Ingestion complete. Total records processed: {}",
            report.total_processed
        ));
    }

    Output::kv("This run", &report.processed_this_run.to_string());
    Output::kv("Batches", &report.batches_committed.to_string());
    Output::kv("Last line", &report.last_processed_line.to_string());
    if report.malformed_lines > 0 {
        Output::kv("Skipped lines", &report.malformed_lines.to_string());
    }
}
