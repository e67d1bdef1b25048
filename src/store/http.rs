//! HTTP client for the political open-data store API

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    Department, FactCheck, Institution, JudicialAffair, LegislativeDossier, Party, Politician,
    PressArticle, StoreOverview, VoteEvent, VoteRecord, WealthDeclaration,
};
use crate::store::DateRange;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u32,
}

/// Client for the store's read-only JSON API.
#[derive(Clone)]
pub struct HttpStore {
    http: Client,
    base_url: String,
    api_key: String,
}

impl HttpStore {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.store_base_url, &config.store_api_key)
    }

    /// GET a JSON payload, treating any non-success status as a store error.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.get(&url).query(query);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::StoreError(format!(
                "store returned {} for {}: {}",
                status, path, body
            )));
        }

        Ok(response.json::<T>().await?)
    }

    /// GET a JSON payload where 404 means "no such entity".
    async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.get(&url).query(query);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::StoreError(format!(
                "store returned {} for {}: {}",
                status, path, body
            )));
        }

        Ok(Some(response.json::<T>().await?))
    }

    fn range_params(range: &DateRange, query: &mut Vec<(&'static str, String)>) {
        if let Some(from) = range.from {
            query.push(("from", from.to_string()));
        }
        if let Some(to) = range.to {
            query.push(("to", to.to_string()));
        }
    }

    pub async fn find_politician(&self, name: &str) -> Result<Option<Politician>> {
        self.get_optional("/api/politicians/find", &[("name", name.to_string())])
            .await
    }

    pub async fn search_politicians(&self, terms: &[String], limit: u32) -> Result<Vec<Politician>> {
        self.get_json(
            "/api/politicians",
            &[("search", terms.join(",")), ("limit", limit.to_string())],
        )
        .await
    }

    pub async fn politicians_for_department(&self, code: &str) -> Result<Vec<Politician>> {
        self.get_json("/api/politicians", &[("department", code.to_string())])
            .await
    }

    pub async fn count_politicians(&self, role: &str, party: Option<&str>) -> Result<u32> {
        let mut query = vec![("role", role.to_string())];
        if let Some(party) = party {
            query.push(("party", party.to_string()));
        }
        let response: CountResponse = self.get_json("/api/politicians/count", &query).await?;
        Ok(response.count)
    }

    pub async fn find_party(&self, name: &str) -> Result<Option<Party>> {
        self.get_optional("/api/parties/find", &[("name", name.to_string())])
            .await
    }

    pub async fn search_parties(&self, terms: &[String], limit: u32) -> Result<Vec<Party>> {
        self.get_json(
            "/api/parties",
            &[("search", terms.join(",")), ("limit", limit.to_string())],
        )
        .await
    }

    pub async fn affairs_for_politician(&self, slug: &str) -> Result<Vec<JudicialAffair>> {
        self.get_json(&format!("/api/politicians/{}/affairs", slug), &[])
            .await
    }

    pub async fn search_dossiers(
        &self,
        terms: &[String],
        range: &DateRange,
        limit: u32,
    ) -> Result<Vec<LegislativeDossier>> {
        let mut query = vec![("search", terms.join(",")), ("limit", limit.to_string())];
        Self::range_params(range, &mut query);
        self.get_json("/api/dossiers", &query).await
    }

    pub async fn recent_dossiers(
        &self,
        topic: Option<&str>,
        limit: u32,
    ) -> Result<Vec<LegislativeDossier>> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(topic) = topic {
            query.push(("topic", topic.to_string()));
        }
        self.get_json("/api/dossiers/recent", &query).await
    }

    pub async fn search_vote_events(
        &self,
        terms: &[String],
        range: &DateRange,
        limit: u32,
    ) -> Result<Vec<VoteEvent>> {
        let mut query = vec![("search", terms.join(",")), ("limit", limit.to_string())];
        Self::range_params(range, &mut query);
        self.get_json("/api/votes", &query).await
    }

    pub async fn votes_for_politician(
        &self,
        slug: &str,
        topic: Option<&str>,
        limit: u32,
    ) -> Result<Vec<VoteRecord>> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(topic) = topic {
            query.push(("topic", topic.to_string()));
        }
        self.get_json(&format!("/api/politicians/{}/votes", slug), &query)
            .await
    }

    pub async fn wealth_declaration(&self, slug: &str) -> Result<Option<WealthDeclaration>> {
        self.get_optional(&format!("/api/politicians/{}/wealth", slug), &[])
            .await
    }

    pub async fn search_wealth_declarations(
        &self,
        terms: &[String],
        limit: u32,
    ) -> Result<Vec<WealthDeclaration>> {
        self.get_json(
            "/api/wealth",
            &[("search", terms.join(",")), ("limit", limit.to_string())],
        )
        .await
    }

    pub async fn search_press(
        &self,
        terms: &[String],
        range: &DateRange,
        limit: u32,
    ) -> Result<Vec<PressArticle>> {
        let mut query = vec![("search", terms.join(",")), ("limit", limit.to_string())];
        Self::range_params(range, &mut query);
        self.get_json("/api/press", &query).await
    }

    pub async fn search_fact_checks(&self, terms: &[String], limit: u32) -> Result<Vec<FactCheck>> {
        self.get_json(
            "/api/factchecks",
            &[("search", terms.join(",")), ("limit", limit.to_string())],
        )
        .await
    }

    pub async fn find_department(&self, name_or_code: &str) -> Result<Option<Department>> {
        self.get_optional("/api/departments/find", &[("q", name_or_code.to_string())])
            .await
    }

    pub async fn search_institutions(&self, terms: &[String], limit: u32) -> Result<Vec<Institution>> {
        self.get_json(
            "/api/institutions",
            &[("search", terms.join(",")), ("limit", limit.to_string())],
        )
        .await
    }

    pub async fn overview(&self) -> Result<StoreOverview> {
        self.get_json("/api/overview", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> HttpStore {
        HttpStore::new(&server.base_url(), "test_key")
    }

    #[tokio::test]
    async fn test_find_politician_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/politicians/find")
                .query_param("name", "Jean Dupont")
                .header("authorization", "Bearer test_key");
            then.status(200).json_body(serde_json::json!({
                "slug": "jean-dupont",
                "full_name": "Jean Dupont",
                "role": "député",
                "party": "RE",
                "department": "34",
                "department_name": "Hérault",
                "constituency": null,
                "email": null,
                "twitter": null,
                "mandate_since": "2022-06-19"
            }));
        });

        let store = client(&server);
        let politician = store.find_politician("Jean Dupont").await.unwrap().unwrap();

        mock.assert();
        assert_eq!(politician.slug, "jean-dupont");
        assert_eq!(politician.canonical_link(), "/politiques/jean-dupont");
    }

    #[tokio::test]
    async fn test_find_politician_not_found_is_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/politicians/find");
            then.status(404).body("not found");
        });

        let store = client(&server);
        let result = store.find_politician("Personne Inconnue").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_search_terms_are_comma_joined() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/dossiers")
                .query_param("search", "immigration,asile")
                .query_param("from", "2024-01-01")
                .query_param("to", "2024-12-31");
            then.status(200).json_body(serde_json::json!([{
                "slug": "loi-immigration-2024",
                "title": "Loi immigration",
                "status": "adopté",
                "filed_on": "2024-02-01",
                "themes": ["immigration"],
                "source_url": "https://www.assemblee-nationale.fr/dossier"
            }]));
        });

        let store = client(&server);
        let range = DateRange::year(2024);
        let dossiers = store
            .search_dossiers(
                &["immigration".to_string(), "asile".to_string()],
                &range,
                5,
            )
            .await
            .unwrap();

        mock.assert();
        assert_eq!(dossiers.len(), 1);
        assert_eq!(dossiers[0].slug, "loi-immigration-2024");
    }

    #[tokio::test]
    async fn test_count_politicians_with_party() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/politicians/count")
                .query_param("role", "député")
                .query_param("party", "LFI");
            then.status(200).json_body(serde_json::json!({ "count": 72 }));
        });

        let store = client(&server);
        let count = store.count_politicians("député", Some("LFI")).await.unwrap();

        assert_eq!(count, 72);
    }

    #[tokio::test]
    async fn test_server_error_maps_to_store_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/overview");
            then.status(500).body("boom");
        });

        let store = client(&server);
        let result = store.overview().await;

        assert!(matches!(result, Err(Error::StoreError(_))));
        let message = result.unwrap_err().to_string();
        assert!(message.contains("500"));
    }

    #[tokio::test]
    async fn test_overview_decodes_aggregates() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/overview");
            then.status(200).json_body(serde_json::json!({
                "deputies": 577,
                "senators": 348,
                "parties": 12,
                "dossiers": 1500,
                "vote_events": 900,
                "top_parties": [{ "name": "RE", "seats": 169 }]
            }));
        });

        let store = HttpStore::new(&server.base_url(), "");
        let overview = store.overview().await.unwrap();

        mock.assert();
        assert_eq!(overview.deputies, 577);
        assert_eq!(overview.top_parties[0].name, "RE");
    }

    #[tokio::test]
    async fn test_votes_for_politician_decodes_positions() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/politicians/jean-dupont/votes")
                .query_param("topic", "immigration");
            then.status(200).json_body(serde_json::json!([{
                "event": {
                    "slug": "scrutin-123",
                    "title": "Projet de loi immigration",
                    "voted_on": "2024-01-25",
                    "adopted": true,
                    "for_count": 349,
                    "against_count": 186,
                    "abstention_count": 29,
                    "source_url": null
                },
                "position": "contre"
            }]));
        });

        let store = client(&server);
        let votes = store
            .votes_for_politician("jean-dupont", Some("immigration"), 10)
            .await
            .unwrap();

        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].position, crate::model::VotePosition::Contre);
        assert_eq!(votes[0].event.slug, "scrutin-123");
    }
}
