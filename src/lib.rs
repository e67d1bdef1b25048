//! Citizen Assistant Library
//!
//! This library provides tools to:
//! - Understand citizen questions about French political life
//! - Answer direct questions from typed lookups in the open-data store
//! - Retrieve supporting context through semantic and keyword search
//! - Assemble bounded, sourced context for a language model
//! - Rate-limit clients in front of the pipeline
//! - Expose Prometheus metrics for retrieval and CLI commands

pub mod analysis;
pub mod config;
pub mod error;
pub mod integrations;
pub mod metrics;
pub mod model;
pub mod prompts;
pub mod ratelimit;
pub mod retrieval;
pub mod store;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use integrations::OpenAIClient;
pub use prompts::{load_prompt, Prompt};
pub use retrieval::{ContextPipeline, NO_INFORMATION};
pub use store::KnowledgeStore;

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
