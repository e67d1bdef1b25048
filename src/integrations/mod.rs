//! External integrations module.
//!
//! Provides the OpenAI chat client used to phrase answers from
//! retrieved context.

pub mod openai;

pub use openai::OpenAIClient;
