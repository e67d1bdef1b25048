//! Semantic analysis module
//!
//! Provides tools for:
//! - Generating query embeddings using OpenAI
//! - Searching the civic vector index (Qdrant)

pub mod embeddings;
pub mod vector_db;

pub use embeddings::EmbeddingService;
pub use vector_db::{CivicIndex, IndexStats};
