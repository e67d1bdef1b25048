//! Dataset and index statistics

use anyhow::Result;
use tracing::info;

use crate::analysis::CivicIndex;
use crate::config::Config;
use crate::store::KnowledgeStore;

/// Combined statistics
#[derive(Debug)]
pub struct AssistantStats {
    pub deputies: u32,
    pub senators: u32,
    pub parties: u32,
    pub dossiers: u32,
    pub vote_events: u32,
    pub vector_points: Option<u64>,
    pub vector_dimension: Option<usize>,
}

/// Gather store aggregates and, when the semantic tier is configured,
/// vector index counters.
pub async fn run(config: &Config) -> Result<AssistantStats> {
    let store = KnowledgeStore::from_config(config);
    let overview = store.overview().await?;

    let index_stats = if config.semantic_enabled {
        match CivicIndex::new(&config.qdrant_url, &config.collection) {
            Ok(index) => index.stats().await.ok(),
            Err(_) => None,
        }
    } else {
        None
    };

    info!(
        deputies = overview.deputies,
        senators = overview.senators,
        "Store overview fetched"
    );

    Ok(AssistantStats {
        deputies: overview.deputies,
        senators: overview.senators,
        parties: overview.parties,
        dossiers: overview.dossiers,
        vote_events: overview.vote_events,
        vector_points: index_stats.as_ref().map(|s| s.points_count),
        vector_dimension: index_stats.as_ref().map(|s| s.dimension),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_debug() {
        let stats = AssistantStats {
            deputies: 577,
            senators: 348,
            parties: 12,
            dossiers: 1500,
            vote_events: 4000,
            vector_points: Some(25_000),
            vector_dimension: Some(1536),
        };
        assert!(format!("{:?}", stats).contains("577"));
        assert!(format!("{:?}", stats).contains("1536"));
    }

    #[test]
    fn test_stats_without_vector_index() {
        let stats = AssistantStats {
            deputies: 577,
            senators: 348,
            parties: 12,
            dossiers: 1500,
            vote_events: 4000,
            vector_points: None,
            vector_dimension: None,
        };
        assert!(format!("{:?}", stats).contains("None"));
    }
}
