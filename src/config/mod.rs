//! Configuration module for Resonate.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{Prompts, ReasoningPrompts};
pub use settings::{
    EmbeddingSettings, GeneralSettings, GenerationSettings, IngestSettings, PromptSettings,
    RetrievalSettings, Settings, VectorStoreProvider, VectorStoreSettings,
};
