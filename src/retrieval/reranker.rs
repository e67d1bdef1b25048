//! External reranking service client
//!
//! Cross-encoder reranking of vector-search candidates. The stage is
//! best-effort: callers treat any error here as "keep the original
//! vector order", never as a pipeline failure.

use crate::error::{Error, Result};
use crate::model::Candidate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankEntry>,
}

#[derive(Debug, Deserialize)]
struct RerankEntry {
    index: usize,
    relevance_score: f32,
}

/// Client for a Cohere-style `/rerank` endpoint.
pub struct Reranker {
    http: Client,
    base_url: String,
    api_key: String,
}

impl Reranker {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Reorder candidates by cross-encoder relevance, keeping at most
    /// `top_k`. Similarity scores are replaced with relevance scores.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: &[Candidate],
        top_k: usize,
    ) -> Result<Vec<Candidate>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let documents: Vec<&str> = candidates.iter().map(|c| c.content.as_str()).collect();
        let body = json!({
            "query": query,
            "documents": documents,
            "top_n": top_k,
        });

        let url = format!("{}/rerank", self.base_url);
        let mut request = self.http.post(&url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RerankError(format!(
                "reranker returned {}: {}",
                status, body
            )));
        }

        let parsed: RerankResponse = response.json().await?;

        let mut reranked = Vec::with_capacity(parsed.results.len().min(top_k));
        for entry in parsed.results.into_iter().take(top_k) {
            let Some(original) = candidates.get(entry.index) else {
                return Err(Error::RerankError(format!(
                    "reranker referenced unknown document index {}",
                    entry.index
                )));
            };
            let mut candidate = original.clone();
            candidate.similarity = entry.relevance_score;
            reranked.push(candidate);
        }

        Ok(reranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CandidateDetails;
    use httpmock::prelude::*;

    fn candidate(link: &str, content: &str, similarity: f32) -> Candidate {
        Candidate {
            details: CandidateDetails::PressArticle {
                title: content.to_string(),
                outlet: None,
            },
            content: content.to_string(),
            similarity,
            canonical_link: link.to_string(),
            published_at: None,
        }
    }

    #[tokio::test]
    async fn rerank_reorders_and_rescoring_applies() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/rerank")
                .header("authorization", "Bearer rerank_key")
                .json_body_includes(r#"{ "query": "loi immigration", "top_n": 2 }"#);
            then.status(200).json_body(serde_json::json!({
                "results": [
                    { "index": 1, "relevance_score": 0.95 },
                    { "index": 0, "relevance_score": 0.40 }
                ]
            }));
        });

        let reranker = Reranker::new(&server.base_url(), "rerank_key");
        let candidates = vec![
            candidate("/a", "premier document", 0.8),
            candidate("/b", "second document", 0.7),
        ];

        let reranked = reranker
            .rerank("loi immigration", &candidates, 2)
            .await
            .unwrap();

        mock.assert();
        assert_eq!(reranked.len(), 2);
        assert_eq!(reranked[0].canonical_link, "/b");
        assert_eq!(reranked[0].similarity, 0.95);
        assert_eq!(reranked[1].canonical_link, "/a");
        assert_eq!(reranked[1].similarity, 0.40);
    }

    #[tokio::test]
    async fn empty_candidates_skip_the_network() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/rerank");
            then.status(200).json_body(serde_json::json!({ "results": [] }));
        });

        let reranker = Reranker::new(&server.base_url(), "");
        let reranked = reranker.rerank("quoi", &[], 8).await.unwrap();

        assert!(reranked.is_empty());
        mock.assert_calls(0);
    }

    #[tokio::test]
    async fn server_error_maps_to_rerank_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rerank");
            then.status(503).body("overloaded");
        });

        let reranker = Reranker::new(&server.base_url(), "");
        let result = reranker
            .rerank("quoi", &[candidate("/a", "doc", 0.5)], 8)
            .await;

        assert!(matches!(result, Err(Error::RerankError(_))));
    }

    #[tokio::test]
    async fn out_of_range_index_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rerank");
            then.status(200).json_body(serde_json::json!({
                "results": [{ "index": 7, "relevance_score": 0.9 }]
            }));
        });

        let reranker = Reranker::new(&server.base_url(), "");
        let result = reranker
            .rerank("quoi", &[candidate("/a", "doc", 0.5)], 8)
            .await;

        assert!(matches!(result, Err(Error::RerankError(_))));
    }

    #[tokio::test]
    async fn top_k_truncates_results() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/rerank");
            then.status(200).json_body(serde_json::json!({
                "results": [
                    { "index": 0, "relevance_score": 0.9 },
                    { "index": 1, "relevance_score": 0.8 },
                    { "index": 2, "relevance_score": 0.7 }
                ]
            }));
        });

        let reranker = Reranker::new(&server.base_url(), "");
        let candidates = vec![
            candidate("/a", "un", 0.5),
            candidate("/b", "deux", 0.5),
            candidate("/c", "trois", 0.5),
        ];

        let reranked = reranker.rerank("quoi", &candidates, 2).await.unwrap();

        assert_eq!(reranked.len(), 2);
    }
}
