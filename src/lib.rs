//! Resonate - retrieval-augmented reasoning over a question/solution corpus
//!
//! # Overview
//!
//! Resonate allows you to:
//! - Stream a newline-delimited JSON corpus into a vector index in resumable batches
//! - Retrieve context and few-shot examples for a free-text query
//! - Answer questions about a transcript with zero-shot and few-shot prompts
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Settings and prompt templates
//! - `corpus` - Record normalization
//! - `chunking` - Token-budget splitting of embedding requests
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector index abstraction (SQLite, memory, Pinecone)
//! - `checkpoint` - Durable ingestion progress
//! - `ingest` - Batch ingestion pipeline
//! - `rag` - Retrieval, prompt assembly and answer generation
//! - `orchestrator` - Component wiring
//!
//! # Example
//!
//! ```rust,no_run
//! use resonate::config::Settings;
//! use resonate::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let response = orchestrator
//!         .reasoning_engine()
//!         .resonate("Today we covered the second law of thermodynamics.", Some("What is entropy?"))
//!         .await?;
//!     println!("{}", response.few_shot);
//!
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ResonateError, Result};
