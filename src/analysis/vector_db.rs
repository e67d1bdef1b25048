//! Vector index integration with Qdrant
//!
//! The civic collection is populated by external sync jobs. This
//! wrapper only reads: similarity search over indexed documents,
//! decoded into typed retrieval candidates.

use crate::error::Result;
use crate::model::{AffairStatus, Candidate, CandidateDetails};
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, SearchPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use tracing::{debug, info};

/// Read-side client for the civic document collection
pub struct CivicIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl CivicIndex {
    /// Connect to Qdrant server
    pub fn new(url: &str, collection: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build()?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension: 1536, // text-embedding-3-small dimension
        })
    }

    /// Connect with custom dimension
    pub fn with_dimension(url: &str, collection: &str, dimension: usize) -> Result<Self> {
        let mut index = Self::new(url, collection)?;
        index.dimension = dimension;
        Ok(index)
    }

    /// Initialize the collection if it doesn't exist
    pub async fn init_collection(&self) -> Result<()> {
        let collections = self.client.list_collections().await?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            info!("Creating collection '{}'", self.collection);

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine),
                    ),
                )
                .await?;

            info!("Collection created successfully");
        } else {
            debug!("Collection '{}' already exists", self.collection);
        }

        Ok(())
    }

    /// Search for documents similar to the query embedding.
    ///
    /// Points whose payload cannot be decoded are dropped.
    pub async fn search(
        &self,
        query_embedding: Vec<f32>,
        limit: u64,
        score_threshold: f32,
    ) -> Result<Vec<Candidate>> {
        let request = SearchPointsBuilder::new(&self.collection, query_embedding, limit)
            .with_payload(true)
            .score_threshold(score_threshold);

        let results = self.client.search_points(request).await?;

        let candidates: Vec<Candidate> = results
            .result
            .into_iter()
            .filter_map(|point| candidate_from_payload(&point.payload, point.score))
            .collect();

        Ok(candidates)
    }

    /// Get collection statistics
    pub async fn stats(&self) -> Result<IndexStats> {
        let info = self.client.collection_info(&self.collection).await?;

        Ok(IndexStats {
            points_count: info
                .result
                .map(|r| r.points_count.unwrap_or(0))
                .unwrap_or(0),
            dimension: self.dimension,
        })
    }
}

/// Collection statistics
#[derive(Debug)]
pub struct IndexStats {
    pub points_count: u64,
    pub dimension: usize,
}

/// Decode one indexed point into a typed candidate.
///
/// Payload schema: "kind" discriminator, "content" indexed text,
/// "link" canonical site link, optional "published_at" (RFC 3339),
/// plus per-kind fields.
fn candidate_from_payload(
    payload: &HashMap<String, QdrantValue>,
    score: f32,
) -> Option<Candidate> {
    let kind = payload.get("kind")?.as_str()?;
    let content = payload.get("content")?.as_str()?.to_string();
    let canonical_link = payload.get("link")?.as_str()?.to_string();
    let published_at = payload
        .get("published_at")
        .and_then(|v| v.as_str())
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&chrono::Utc));

    let get_str = |key: &str| payload.get(key).and_then(|v| v.as_str()).map(String::from);

    let details = match kind.as_str() {
        "politician" => CandidateDetails::Politician {
            full_name: get_str("full_name")?,
            party: get_str("party"),
        },
        "party" => CandidateDetails::Party {
            name: get_str("name")?,
        },
        "judicial_affair" => CandidateDetails::JudicialAffair {
            title: get_str("title")?,
            status: get_str("status")?.parse::<AffairStatus>().ok()?,
        },
        "legislative_dossier" => CandidateDetails::LegislativeDossier {
            title: get_str("title")?,
            status: get_str("status")?,
            source_url: get_str("source_url"),
        },
        "vote_event" => CandidateDetails::VoteEvent {
            title: get_str("title")?,
            source_url: get_str("source_url"),
        },
        "press_article" => CandidateDetails::PressArticle {
            title: get_str("title")?,
            outlet: get_str("outlet"),
        },
        "fact_check" => CandidateDetails::FactCheck {
            claim: get_str("claim")?,
            verdict: get_str("verdict")?,
        },
        _ => return None,
    };

    Some(Candidate {
        details,
        content,
        similarity: score,
        canonical_link,
        published_at,
    })
}
