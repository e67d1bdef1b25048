//! Semantic retrieval tier
//!
//! Embeds the query, searches the civic vector index, optionally
//! reranks through the external cross-encoder, then applies recency
//! boosting. Reranking is best-effort: on failure the vector order
//! is kept. The whole tier is absent when unconfigured.

use crate::analysis::{CivicIndex, EmbeddingService};
use crate::config::Config;
use crate::error::Result;
use crate::model::Candidate;
use crate::retrieval::reranker::Reranker;
use crate::retrieval::temporal::boost_by_recency;
use tracing::{info, warn};

pub const SEMANTIC_LIMIT: u64 = 12;
pub const SCORE_THRESHOLD: f32 = 0.4;
pub const RERANK_TOP_K: usize = 8;

/// Candidate source backing the tier.
///
/// `Fixed` serves a pre-baked candidate list, used by tests and
/// offline runs where no Qdrant instance exists.
pub enum VectorSource {
    Qdrant {
        embedder: EmbeddingService,
        index: CivicIndex,
    },
    Fixed(Vec<Candidate>),
}

impl VectorSource {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        match self {
            VectorSource::Qdrant { embedder, index } => {
                let embedding = embedder.embed(query).await?;
                index.search(embedding, SEMANTIC_LIMIT, SCORE_THRESHOLD).await
            }
            VectorSource::Fixed(candidates) => Ok(candidates.clone()),
        }
    }
}

pub struct SemanticRetriever {
    source: VectorSource,
    reranker: Option<Reranker>,
}

impl SemanticRetriever {
    /// Deterministic retriever over a fixed candidate list.
    pub fn with_fixed(candidates: Vec<Candidate>) -> Self {
        Self {
            source: VectorSource::Fixed(candidates),
            reranker: None,
        }
    }

    pub fn with_reranker(mut self, reranker: Reranker) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Build the tier from configuration. Returns None when the tier
    /// is disabled or its backends cannot be reached; the caller
    /// skips the tier entirely in that case.
    pub async fn from_config(config: &Config) -> Option<Self> {
        if !config.semantic_enabled {
            info!("Semantic retrieval not configured, tier will be skipped");
            return None;
        }

        let embedder = match EmbeddingService::with_model(&config.embedding_model) {
            Ok(embedder) => embedder,
            Err(e) => {
                warn!("Semantic retrieval unavailable: {}", e);
                return None;
            }
        };

        let index = match CivicIndex::new(&config.qdrant_url, &config.collection) {
            Ok(index) => index,
            Err(e) => {
                warn!("Semantic retrieval unavailable: {}", e);
                return None;
            }
        };
        if let Err(e) = index.init_collection().await {
            warn!("Semantic retrieval unavailable: {}", e);
            return None;
        }

        let mut retriever = Self {
            source: VectorSource::Qdrant { embedder, index },
            reranker: None,
        };
        if config.reranker_configured() {
            retriever.reranker = Some(Reranker::new(
                &config.reranker_url,
                &config.reranker_api_key,
            ));
        }
        Some(retriever)
    }

    /// Retrieve, rerank (best-effort) and boost candidates for a query.
    pub async fn candidates(&self, query: &str) -> Result<Vec<Candidate>> {
        let mut candidates = self.source.search(query).await?;
        if candidates.is_empty() {
            return Ok(candidates);
        }

        if let Some(reranker) = &self.reranker {
            match reranker.rerank(query, &candidates, RERANK_TOP_K).await {
                Ok(reranked) => candidates = reranked,
                Err(e) => warn!("Reranker unavailable, keeping vector order: {}", e),
            }
        }

        boost_by_recency(&mut candidates, chrono::Utc::now());
        Ok(candidates)
    }
}
