//! CLI module for Resonate.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Resonate - retrieval-augmented reasoning over a question/solution corpus
///
/// Ingests a newline-delimited JSON corpus into a vector index and answers
/// questions about transcripts with zero-shot and few-shot prompts.
#[derive(Parser, Debug)]
#[command(name = "resonate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "RESONATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed and index a newline-delimited JSON corpus, resuming from the last checkpoint
    Ingest {
        /// Corpus file (defaults to ingest.source_path)
        input: Option<PathBuf>,

        /// Records per embed/upsert batch
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Discard the checkpoint and start from the first line
        #[arg(long)]
        reset: bool,
    },

    /// Show the context and examples retrieved for a query
    Retrieve {
        /// Query text
        query: String,

        /// Number of matches to retrieve
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Answer a question about a transcript with zero-shot and few-shot prompts
    Ask {
        /// Transcript text
        #[arg(short, long, conflicts_with = "transcript_file", required_unless_present = "transcript_file")]
        transcript: Option<String>,

        /// Read the transcript from a file
        #[arg(short = 'f', long)]
        transcript_file: Option<PathBuf>,

        /// Question about the transcript
        #[arg(short, long)]
        question: Option<String>,

        /// Print the assembled prompts without calling the model
        #[arg(long)]
        prompts_only: bool,

        /// Print the answers as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show ingestion progress and index size
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
