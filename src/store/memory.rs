//! In-memory store backed by fixtures
//!
//! Used by tests and offline runs. Matching is case-insensitive
//! substring search, which is close enough to the HTTP store's
//! behavior for deterministic scenarios. A shared lookup counter
//! records how many finder calls a scenario performed.

use crate::error::Result;
use crate::model::{
    Department, FactCheck, Institution, JudicialAffair, LegislativeDossier, Party, PartySeats,
    Politician, PressArticle, StoreOverview, VoteEvent, VoteRecord, WealthDeclaration,
};
use crate::retrieval::normalize_query;
use crate::store::DateRange;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct MemoryStore {
    politicians: Vec<Politician>,
    parties: Vec<Party>,
    affairs: Vec<JudicialAffair>,
    dossiers: Vec<LegislativeDossier>,
    vote_events: Vec<VoteEvent>,
    /// (politician slug, ballot) pairs.
    votes: Vec<(String, VoteRecord)>,
    wealth: Vec<WealthDeclaration>,
    press: Vec<PressArticle>,
    fact_checks: Vec<FactCheck>,
    departments: Vec<Department>,
    institutions: Vec<Institution>,
    calls: Arc<AtomicUsize>,
}

// Accent-insensitive, like the HTTP store's server-side search.
fn matches_any(haystack: &str, terms: &[String]) -> bool {
    let haystack = normalize_query(haystack);
    terms.iter().any(|t| haystack.contains(&normalize_query(t)))
}

fn strip_article(name: &str) -> &str {
    for article in ["la ", "le ", "les ", "l'"] {
        if let Some(rest) = name.strip_prefix(article) {
            return rest;
        }
    }
    name
}

/// Bounded ranges exclude undated entries.
fn date_ok(range: &DateRange, date: Option<NaiveDate>) -> bool {
    range.is_open() || date.map(|d| range.contains(d)).unwrap_or(false)
}

impl MemoryStore {
    pub fn with_politician(mut self, politician: Politician) -> Self {
        self.politicians.push(politician);
        self
    }

    pub fn with_party(mut self, party: Party) -> Self {
        self.parties.push(party);
        self
    }

    pub fn with_affair(mut self, affair: JudicialAffair) -> Self {
        self.affairs.push(affair);
        self
    }

    pub fn with_dossier(mut self, dossier: LegislativeDossier) -> Self {
        self.dossiers.push(dossier);
        self
    }

    pub fn with_vote_event(mut self, event: VoteEvent) -> Self {
        self.vote_events.push(event);
        self
    }

    pub fn with_vote(mut self, politician_slug: &str, record: VoteRecord) -> Self {
        self.votes.push((politician_slug.to_string(), record));
        self
    }

    pub fn with_wealth(mut self, declaration: WealthDeclaration) -> Self {
        self.wealth.push(declaration);
        self
    }

    pub fn with_press(mut self, article: PressArticle) -> Self {
        self.press.push(article);
        self
    }

    pub fn with_fact_check(mut self, check: FactCheck) -> Self {
        self.fact_checks.push(check);
        self
    }

    pub fn with_department(mut self, department: Department) -> Self {
        self.departments.push(department);
        self
    }

    pub fn with_institution(mut self, institution: Institution) -> Self {
        self.institutions.push(institution);
        self
    }

    /// Number of finder calls performed so far.
    pub fn lookup_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn bump(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn find_politician(&self, name: &str) -> Result<Option<Politician>> {
        self.bump();
        let needle = normalize_query(name);
        Ok(self
            .politicians
            .iter()
            .find(|p| normalize_query(&p.full_name) == needle)
            .cloned())
    }

    pub fn search_politicians(&self, terms: &[String], limit: u32) -> Result<Vec<Politician>> {
        self.bump();
        let mut found: Vec<Politician> = self
            .politicians
            .iter()
            .filter(|p| matches_any(&p.full_name, terms))
            .cloned()
            .collect();
        found.truncate(limit as usize);
        Ok(found)
    }

    pub fn politicians_for_department(&self, code: &str) -> Result<Vec<Politician>> {
        self.bump();
        Ok(self
            .politicians
            .iter()
            .filter(|p| p.department.as_deref() == Some(code))
            .cloned()
            .collect())
    }

    pub fn count_politicians(&self, role: &str, party: Option<&str>) -> Result<u32> {
        self.bump();
        let role = normalize_query(role);
        let party = party.map(normalize_query);
        let count = self
            .politicians
            .iter()
            .filter(|p| normalize_query(&p.role) == role)
            .filter(|p| match &party {
                Some(wanted) => p
                    .party
                    .as_ref()
                    .map(|have| normalize_query(have) == *wanted)
                    .unwrap_or(false),
                None => true,
            })
            .count();
        Ok(count as u32)
    }

    pub fn find_party(&self, name: &str) -> Result<Option<Party>> {
        self.bump();
        let needle = normalize_query(name);
        let needle = strip_article(&needle);
        Ok(self
            .parties
            .iter()
            .find(|p| {
                let full = normalize_query(&p.name);
                strip_article(&full) == needle
                    || p.abbreviation
                        .as_ref()
                        .map(|a| normalize_query(a) == needle)
                        .unwrap_or(false)
            })
            .cloned())
    }

    pub fn search_parties(&self, terms: &[String], limit: u32) -> Result<Vec<Party>> {
        self.bump();
        let mut found: Vec<Party> = self
            .parties
            .iter()
            .filter(|p| matches_any(&p.name, terms))
            .cloned()
            .collect();
        found.truncate(limit as usize);
        Ok(found)
    }

    pub fn affairs_for_politician(&self, slug: &str) -> Result<Vec<JudicialAffair>> {
        self.bump();
        Ok(self
            .affairs
            .iter()
            .filter(|a| a.politician_slug == slug)
            .cloned()
            .collect())
    }

    pub fn search_dossiers(
        &self,
        terms: &[String],
        range: &DateRange,
        limit: u32,
    ) -> Result<Vec<LegislativeDossier>> {
        self.bump();
        let mut found: Vec<LegislativeDossier> = self
            .dossiers
            .iter()
            .filter(|d| {
                matches_any(&d.title, terms) || d.themes.iter().any(|t| matches_any(t, terms))
            })
            .filter(|d| date_ok(range, d.filed_on))
            .cloned()
            .collect();
        found.truncate(limit as usize);
        Ok(found)
    }

    pub fn recent_dossiers(&self, topic: Option<&str>, limit: u32) -> Result<Vec<LegislativeDossier>> {
        self.bump();
        let mut found: Vec<LegislativeDossier> = self
            .dossiers
            .iter()
            .filter(|d| match topic {
                Some(topic) => {
                    let terms = vec![topic.to_string()];
                    matches_any(&d.title, &terms)
                        || d.themes.iter().any(|t| matches_any(t, &terms))
                }
                None => true,
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.filed_on.cmp(&a.filed_on));
        found.truncate(limit as usize);
        Ok(found)
    }

    pub fn search_vote_events(
        &self,
        terms: &[String],
        range: &DateRange,
        limit: u32,
    ) -> Result<Vec<VoteEvent>> {
        self.bump();
        let mut found: Vec<VoteEvent> = self
            .vote_events
            .iter()
            .filter(|v| matches_any(&v.title, terms))
            .filter(|v| date_ok(range, v.voted_on))
            .cloned()
            .collect();
        found.truncate(limit as usize);
        Ok(found)
    }

    pub fn votes_for_politician(
        &self,
        slug: &str,
        topic: Option<&str>,
        limit: u32,
    ) -> Result<Vec<VoteRecord>> {
        self.bump();
        let mut found: Vec<VoteRecord> = self
            .votes
            .iter()
            .filter(|(owner, _)| owner == slug)
            .map(|(_, record)| record.clone())
            .filter(|record| match topic {
                Some(topic) => {
                    normalize_query(&record.event.title).contains(&normalize_query(topic))
                }
                None => true,
            })
            .collect();
        found.truncate(limit as usize);
        Ok(found)
    }

    pub fn wealth_declaration(&self, slug: &str) -> Result<Option<WealthDeclaration>> {
        self.bump();
        Ok(self
            .wealth
            .iter()
            .find(|w| w.politician_slug == slug)
            .cloned())
    }

    pub fn search_wealth_declarations(
        &self,
        terms: &[String],
        limit: u32,
    ) -> Result<Vec<WealthDeclaration>> {
        self.bump();
        let mut found: Vec<WealthDeclaration> = self
            .wealth
            .iter()
            .filter(|w| matches_any(&w.politician_name, terms))
            .cloned()
            .collect();
        found.truncate(limit as usize);
        Ok(found)
    }

    pub fn search_press(
        &self,
        terms: &[String],
        range: &DateRange,
        limit: u32,
    ) -> Result<Vec<PressArticle>> {
        self.bump();
        let mut found: Vec<PressArticle> = self
            .press
            .iter()
            .filter(|a| {
                matches_any(&a.title, terms)
                    || a.summary
                        .as_ref()
                        .map(|s| matches_any(s, terms))
                        .unwrap_or(false)
            })
            .filter(|a| date_ok(range, a.published_at.map(|d| d.date_naive())))
            .cloned()
            .collect();
        found.truncate(limit as usize);
        Ok(found)
    }

    pub fn search_fact_checks(&self, terms: &[String], limit: u32) -> Result<Vec<FactCheck>> {
        self.bump();
        let mut found: Vec<FactCheck> = self
            .fact_checks
            .iter()
            .filter(|c| matches_any(&c.claim, terms))
            .cloned()
            .collect();
        found.truncate(limit as usize);
        Ok(found)
    }

    pub fn find_department(&self, name_or_code: &str) -> Result<Option<Department>> {
        self.bump();
        let needle = normalize_query(name_or_code);
        Ok(self
            .departments
            .iter()
            .find(|d| d.code == needle || normalize_query(&d.name) == needle)
            .cloned())
    }

    pub fn search_institutions(&self, terms: &[String], limit: u32) -> Result<Vec<Institution>> {
        self.bump();
        let mut found: Vec<Institution> = self
            .institutions
            .iter()
            .filter(|i| matches_any(&i.name, terms))
            .cloned()
            .collect();
        found.truncate(limit as usize);
        Ok(found)
    }

    pub fn overview(&self) -> Result<StoreOverview> {
        self.bump();
        let deputies = self
            .politicians
            .iter()
            .filter(|p| normalize_query(&p.role).contains("depute"))
            .count() as u32;
        let senators = self
            .politicians
            .iter()
            .filter(|p| normalize_query(&p.role).contains("senateur"))
            .count() as u32;

        let mut ranked: Vec<PartySeats> = self
            .parties
            .iter()
            .map(|p| PartySeats {
                name: p.name.clone(),
                seats: p.seats_assemblee.unwrap_or(0),
            })
            .collect();
        ranked.sort_by(|a, b| b.seats.cmp(&a.seats));
        ranked.truncate(3);

        Ok(StoreOverview {
            deputies,
            senators,
            parties: self.parties.len() as u32,
            dossiers: self.dossiers.len() as u32,
            vote_events: self.vote_events.len() as u32,
            top_parties: ranked,
        })
    }
}
