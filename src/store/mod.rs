//! Access to the political open-data store
//!
//! `KnowledgeStore` fronts two interchangeable backends: the HTTP API
//! of the public store, and an in-memory fixture store used by tests
//! and offline runs. Finders return `Ok(None)` / empty collections for
//! "not found" and reserve `Err` for transport or decoding failures.

mod http;
mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

use crate::config::Config;
use crate::error::Result;
use crate::model::{
    Department, FactCheck, Institution, JudicialAffair, LegislativeDossier, Party, Politician,
    PressArticle, StoreOverview, VoteEvent, VoteRecord, WealthDeclaration,
};
use chrono::{Months, NaiveDate};

/// Inclusive date window attached to temporally qualified queries.
///
/// `None` on either side means unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Calendar year window, e.g. 2024-01-01 ..= 2024-12-31.
    pub fn year(year: i32) -> Self {
        Self {
            from: NaiveDate::from_ymd_opt(year, 1, 1),
            to: NaiveDate::from_ymd_opt(year, 12, 31),
        }
    }

    /// Window covering the last `months` months up to `today`.
    pub fn last_months(today: NaiveDate, months: u32) -> Self {
        Self {
            from: today.checked_sub_months(Months::new(months)),
            to: Some(today),
        }
    }

    /// True when no bound is set on either side.
    pub fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        if let Some(from) = self.from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if date > to {
                return false;
            }
        }
        true
    }
}

/// Store backend selection.
#[derive(Clone)]
pub enum StoreBackend {
    Http(HttpStore),
    Memory(MemoryStore),
}

/// Facade over the configured store backend.
#[derive(Clone)]
pub struct KnowledgeStore {
    backend: StoreBackend,
}

impl KnowledgeStore {
    pub fn from_config(config: &Config) -> Self {
        Self {
            backend: StoreBackend::Http(HttpStore::from_config(config)),
        }
    }

    pub fn with_http(store: HttpStore) -> Self {
        Self {
            backend: StoreBackend::Http(store),
        }
    }

    /// Fixture-backed store for tests and offline runs.
    pub fn with_memory(store: MemoryStore) -> Self {
        Self {
            backend: StoreBackend::Memory(store),
        }
    }

    /// Exact-name lookup of one politician.
    pub async fn find_politician(&self, name: &str) -> Result<Option<Politician>> {
        match &self.backend {
            StoreBackend::Http(s) => s.find_politician(name).await,
            StoreBackend::Memory(s) => s.find_politician(name),
        }
    }

    /// Fuzzy search across politician names.
    pub async fn search_politicians(&self, terms: &[String], limit: u32) -> Result<Vec<Politician>> {
        match &self.backend {
            StoreBackend::Http(s) => s.search_politicians(terms, limit).await,
            StoreBackend::Memory(s) => s.search_politicians(terms, limit),
        }
    }

    pub async fn politicians_for_department(&self, code: &str) -> Result<Vec<Politician>> {
        match &self.backend {
            StoreBackend::Http(s) => s.politicians_for_department(code).await,
            StoreBackend::Memory(s) => s.politicians_for_department(code),
        }
    }

    /// Count deputies, optionally restricted to one party.
    pub async fn count_politicians(&self, role: &str, party: Option<&str>) -> Result<u32> {
        match &self.backend {
            StoreBackend::Http(s) => s.count_politicians(role, party).await,
            StoreBackend::Memory(s) => s.count_politicians(role, party),
        }
    }

    pub async fn find_party(&self, name: &str) -> Result<Option<Party>> {
        match &self.backend {
            StoreBackend::Http(s) => s.find_party(name).await,
            StoreBackend::Memory(s) => s.find_party(name),
        }
    }

    pub async fn search_parties(&self, terms: &[String], limit: u32) -> Result<Vec<Party>> {
        match &self.backend {
            StoreBackend::Http(s) => s.search_parties(terms, limit).await,
            StoreBackend::Memory(s) => s.search_parties(terms, limit),
        }
    }

    pub async fn affairs_for_politician(&self, slug: &str) -> Result<Vec<JudicialAffair>> {
        match &self.backend {
            StoreBackend::Http(s) => s.affairs_for_politician(slug).await,
            StoreBackend::Memory(s) => s.affairs_for_politician(slug),
        }
    }

    pub async fn search_dossiers(
        &self,
        terms: &[String],
        range: &DateRange,
        limit: u32,
    ) -> Result<Vec<LegislativeDossier>> {
        match &self.backend {
            StoreBackend::Http(s) => s.search_dossiers(terms, range, limit).await,
            StoreBackend::Memory(s) => s.search_dossiers(terms, range, limit),
        }
    }

    pub async fn recent_dossiers(&self, topic: Option<&str>, limit: u32) -> Result<Vec<LegislativeDossier>> {
        match &self.backend {
            StoreBackend::Http(s) => s.recent_dossiers(topic, limit).await,
            StoreBackend::Memory(s) => s.recent_dossiers(topic, limit),
        }
    }

    pub async fn search_vote_events(
        &self,
        terms: &[String],
        range: &DateRange,
        limit: u32,
    ) -> Result<Vec<VoteEvent>> {
        match &self.backend {
            StoreBackend::Http(s) => s.search_vote_events(terms, range, limit).await,
            StoreBackend::Memory(s) => s.search_vote_events(terms, range, limit),
        }
    }

    /// Ballots cast by one politician, optionally filtered by topic.
    pub async fn votes_for_politician(
        &self,
        slug: &str,
        topic: Option<&str>,
        limit: u32,
    ) -> Result<Vec<VoteRecord>> {
        match &self.backend {
            StoreBackend::Http(s) => s.votes_for_politician(slug, topic, limit).await,
            StoreBackend::Memory(s) => s.votes_for_politician(slug, topic, limit),
        }
    }

    pub async fn wealth_declaration(&self, slug: &str) -> Result<Option<WealthDeclaration>> {
        match &self.backend {
            StoreBackend::Http(s) => s.wealth_declaration(slug).await,
            StoreBackend::Memory(s) => s.wealth_declaration(slug),
        }
    }

    pub async fn search_wealth_declarations(
        &self,
        terms: &[String],
        limit: u32,
    ) -> Result<Vec<WealthDeclaration>> {
        match &self.backend {
            StoreBackend::Http(s) => s.search_wealth_declarations(terms, limit).await,
            StoreBackend::Memory(s) => s.search_wealth_declarations(terms, limit),
        }
    }

    pub async fn search_press(
        &self,
        terms: &[String],
        range: &DateRange,
        limit: u32,
    ) -> Result<Vec<PressArticle>> {
        match &self.backend {
            StoreBackend::Http(s) => s.search_press(terms, range, limit).await,
            StoreBackend::Memory(s) => s.search_press(terms, range, limit),
        }
    }

    pub async fn search_fact_checks(&self, terms: &[String], limit: u32) -> Result<Vec<FactCheck>> {
        match &self.backend {
            StoreBackend::Http(s) => s.search_fact_checks(terms, limit).await,
            StoreBackend::Memory(s) => s.search_fact_checks(terms, limit),
        }
    }

    pub async fn find_department(&self, name_or_code: &str) -> Result<Option<Department>> {
        match &self.backend {
            StoreBackend::Http(s) => s.find_department(name_or_code).await,
            StoreBackend::Memory(s) => s.find_department(name_or_code),
        }
    }

    pub async fn search_institutions(&self, terms: &[String], limit: u32) -> Result<Vec<Institution>> {
        match &self.backend {
            StoreBackend::Http(s) => s.search_institutions(terms, limit).await,
            StoreBackend::Memory(s) => s.search_institutions(terms, limit),
        }
    }

    /// Aggregate counts over the whole dataset, recomputed per call.
    pub async fn overview(&self) -> Result<StoreOverview> {
        match &self.backend {
            StoreBackend::Http(s) => s.overview().await,
            StoreBackend::Memory(s) => s.overview(),
        }
    }
}
