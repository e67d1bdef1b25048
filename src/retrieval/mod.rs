//! Query understanding and context retrieval
//!
//! `ContextPipeline` turns a citizen question into grounded context
//! text through three tiers, each one cheaper and broader than the
//! last:
//!
//! 1. pattern: regex intents answered by point lookups in the store
//! 2. semantic: vector search plus optional reranking, when configured
//! 3. keyword: tokenized, synonym-expanded sub-searches per category
//!
//! A tier that fails or finds nothing hands over to the next; when all
//! three come back empty the pipeline returns [`NO_INFORMATION`]. The
//! entry point never returns an error.

pub mod assembler;
pub mod intents;
pub mod keywords;
pub mod reranker;
pub mod semantic;
pub mod temporal;

pub use keywords::{normalize_query, tokenize};
pub use semantic::SemanticRetriever;

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::metrics;
use crate::store::KnowledgeStore;

/// Sentinel handed to the answering model when no tier produced
/// context. The system prompt tells the model how to phrase it.
pub const NO_INFORMATION: &str = "no information found for this query";

/// Tiered retrieval front door.
pub struct ContextPipeline {
    store: KnowledgeStore,
    semantic: Option<SemanticRetriever>,
}

impl ContextPipeline {
    pub fn new(store: KnowledgeStore, semantic: Option<SemanticRetriever>) -> Self {
        Self { store, semantic }
    }

    /// Build the pipeline from configuration. Store access is
    /// mandatory; the semantic tier is attached only when configured
    /// and reachable.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = KnowledgeStore::from_config(config);
        let semantic = SemanticRetriever::from_config(config).await;
        Ok(Self::new(store, semantic))
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// Retrieve context for a citizen question.
    ///
    /// Total by contract: tier failures are logged and demoted to the
    /// next tier, never surfaced to the caller.
    pub async fn context_for_query(&self, query: &str) -> String {
        metrics::record_retrieval_start();
        let started = Instant::now();

        let (tier, context) = self.run_tiers(query).await;

        metrics::record_retrieval(tier, started.elapsed());
        debug!(tier, chars = context.len(), "Context retrieval finished");
        context
    }

    async fn run_tiers(&self, query: &str) -> (&'static str, String) {
        let query = query.trim();
        if query.is_empty() {
            return ("sentinel", NO_INFORMATION.to_string());
        }

        match intents::match_patterns(&self.store, query).await {
            Ok(Some(answer)) => return ("pattern", answer),
            Ok(None) => {}
            Err(err) => warn!("Pattern tier failed, falling back: {}", err),
        }

        if let Some(semantic) = &self.semantic {
            match semantic.candidates(query).await {
                Ok(candidates) if !candidates.is_empty() => {
                    let context = assembler::assemble(&self.store, &candidates, query).await;
                    return ("semantic", context);
                }
                Ok(_) => debug!("Semantic tier found no candidates"),
                Err(err) => warn!("Semantic tier failed, falling back: {}", err),
            }
        }

        match keywords::search_by_keywords(&self.store, query, Utc::now().date_naive()).await {
            Ok(Some(context)) => return ("keyword", context),
            Ok(None) => {}
            Err(err) => warn!("Keyword tier failed, falling back: {}", err),
        }

        ("sentinel", NO_INFORMATION.to_string())
    }
}
