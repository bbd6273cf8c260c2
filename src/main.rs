//! Resonate CLI entry point.

use anyhow::Result;
use clap::Parser;
use resonate::cli::{commands, Cli, Commands};
use resonate::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("resonate={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    // Ensure data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Ingest {
            input,
            batch_size,
            reset,
        } => {
            commands::run_ingest(input.as_deref(), *batch_size, *reset, settings).await?;
        }

        Commands::Retrieve { query, k } => {
            commands::run_retrieve(query, *k, settings).await?;
        }

        Commands::Ask {
            transcript,
            transcript_file,
            question,
            prompts_only,
            json,
        } => {
            commands::run_ask(
                transcript.as_deref(),
                transcript_file.as_deref(),
                question.as_deref(),
                *prompts_only,
                *json,
                settings,
            )
            .await?;
        }

        Commands::Status => {
            commands::run_status(settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, &config_path)?;
        }
    }

    Ok(())
}
