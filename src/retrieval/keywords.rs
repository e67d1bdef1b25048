//! Keyword fallback tier
//!
//! Expands the query through a fixed French topic taxonomy, extracts
//! temporal modifiers into a shared date filter, then fans out over
//! the store's entity kinds. Sub-searches run concurrently but their
//! snippets are concatenated in a fixed category order, so identical
//! queries against unchanged data produce byte-identical output.

use crate::error::Result;
use crate::store::{DateRange, KnowledgeStore};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// At most this many expansion terms are appended per query.
pub const MAX_EXPANSION_TERMS: usize = 4;
/// At most this many snippets per entity category.
pub const SNIPPETS_PER_CATEGORY: u32 = 3;
/// Visible separator between snippet groups.
pub const SECTION_SEPARATOR: &str = "\n---\n";

/// Topic taxonomy: first matching topic wins, the rest are ignored
/// even when their synonyms also appear in the query.
static TOPIC_SYNONYMS: &[(&str, &[&str])] = &[
    ("immigration", &["immigration", "immigre", "asile", "refugie", "etranger", "naturalisation"]),
    ("securite", &["securite", "police", "delinquance", "criminalite", "gendarmerie", "terrorisme"]),
    ("sante", &["sante", "hopital", "hopitaux", "medecin", "soin", "urgences"]),
    ("economie", &["economie", "budget", "impot", "fiscalite", "dette", "inflation"]),
    ("environnement", &["environnement", "climat", "ecologie", "energie", "pollution", "biodiversite"]),
    ("education", &["education", "ecole", "enseignant", "universite", "etudiant", "lycee"]),
    ("retraites", &["retraite", "pension", "cotisation"]),
    ("justice", &["justice", "tribunal", "magistrat", "prison", "penal"]),
    ("logement", &["logement", "loyer", "hlm", "immobilier", "locataire"]),
    ("agriculture", &["agriculture", "agriculteur", "paysan", "ferme", "elevage"]),
];

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

static STATS_MARKERS: &[&str] = &[
    "combien",
    "nombre",
    "statistique",
    "chiffre",
    "composition",
    "repartition",
    "total",
];

/// Lowercase, strip diacritics and punctuation, collapse whitespace.
///
/// Apostrophes and hyphens survive so that elisions and compound
/// names keep their shape until tokenization.
pub fn normalize_query(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        let mapped: &str = match c {
            'à' | 'â' | 'ä' => "a",
            'é' | 'è' | 'ê' | 'ë' => "e",
            'î' | 'ï' => "i",
            'ô' | 'ö' => "o",
            'ù' | 'û' | 'ü' => "u",
            'ç' => "c",
            'œ' => "oe",
            'æ' => "ae",
            '\'' | '’' => "'",
            '-' => "-",
            c if c.is_alphanumeric() => {
                out.push(c);
                continue;
            }
            _ => " ",
        };
        out.push_str(mapped);
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split into search tokens: words longer than two characters,
/// apostrophe elisions dropped, order preserved, duplicates removed.
pub fn tokenize(normalized: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for word in normalized.split_whitespace() {
        for part in word.split('\'') {
            let part = part.trim_matches('-');
            if part.chars().count() > 2 && !tokens.iter().any(|t| t == part) {
                tokens.push(part.to_string());
            }
        }
    }
    tokens
}

/// Query after taxonomy expansion and temporal extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedQuery {
    pub terms: Vec<String>,
    pub range: DateRange,
}

/// Expand a raw query into search terms plus a shared date filter.
pub fn expand_query(query: &str, today: NaiveDate) -> ExpandedQuery {
    let normalized = normalize_query(query);
    let mut terms = tokenize(&normalized);

    for (_topic, synonyms) in TOPIC_SYNONYMS {
        let matched = synonyms
            .iter()
            .any(|syn| terms.iter().any(|t| t == syn || t.starts_with(syn)));
        if matched {
            let mut added = 0;
            for syn in synonyms.iter() {
                if added == MAX_EXPANSION_TERMS {
                    break;
                }
                if !terms.iter().any(|t| t == syn) {
                    terms.push((*syn).to_string());
                    added += 1;
                }
            }
            break;
        }
    }

    ExpandedQuery {
        terms,
        range: detect_range(&normalized, today),
    }
}

/// Temporal modifiers, strongest first: explicit year, "cette annee",
/// then "recent" meaning the trailing six months.
fn detect_range(normalized: &str, today: NaiveDate) -> DateRange {
    if let Some(m) = YEAR_RE.find(normalized) {
        if let Ok(year) = m.as_str().parse::<i32>() {
            return DateRange::year(year);
        }
    }
    if normalized.contains("cette annee") {
        return DateRange::year(today.year());
    }
    if normalized.contains("recent") || normalized.contains("recemment") {
        return DateRange::last_months(today, 6);
    }
    DateRange::default()
}

/// Keyword tier entry point. `Ok(None)` when every sub-search came
/// back empty; store failures propagate for the orchestrator to log.
pub async fn search_by_keywords(
    store: &KnowledgeStore,
    query: &str,
    today: NaiveDate,
) -> Result<Option<String>> {
    let expanded = expand_query(query, today);
    if expanded.terms.is_empty() {
        return Ok(None);
    }
    let terms = &expanded.terms;
    let range = &expanded.range;

    let (politicians, parties, thematic, wealth, press, geography, statistics, institutions) = futures::join!(
        politicians_section(store, terms),
        parties_section(store, terms),
        thematic_section(store, terms, range),
        wealth_section(store, terms),
        press_section(store, terms, range),
        geography_section(store, terms),
        statistics_section(store, terms),
        institutions_section(store, terms),
    );

    let sections: Vec<String> = [
        politicians?,
        parties?,
        thematic?,
        wealth?,
        press?,
        geography?,
        statistics?,
        institutions?,
    ]
    .into_iter()
    .flatten()
    .collect();

    if sections.is_empty() {
        Ok(None)
    } else {
        Ok(Some(sections.join(SECTION_SEPARATOR)))
    }
}

async fn politicians_section(store: &KnowledgeStore, terms: &[String]) -> Result<Option<String>> {
    let found = store.search_politicians(terms, SNIPPETS_PER_CATEGORY).await?;
    if found.is_empty() {
        return Ok(None);
    }
    let mut lines = vec!["Personnalités politiques :".to_string()];
    for p in found {
        lines.push(format!(
            "- {} ({}), {}. Fiche : {}",
            p.full_name,
            p.party.as_deref().unwrap_or("sans étiquette"),
            p.role,
            p.canonical_link()
        ));
    }
    Ok(Some(lines.join("\n")))
}

async fn parties_section(store: &KnowledgeStore, terms: &[String]) -> Result<Option<String>> {
    let found = store.search_parties(terms, SNIPPETS_PER_CATEGORY).await?;
    if found.is_empty() {
        return Ok(None);
    }
    let mut lines = vec!["Partis politiques :".to_string()];
    for p in found {
        let seats = p
            .seats_assemblee
            .map(|n| format!(", {} sièges à l'Assemblée", n))
            .unwrap_or_default();
        lines.push(format!("- {}{}. Fiche : {}", p.name, seats, p.canonical_link()));
    }
    Ok(Some(lines.join("\n")))
}

/// Dossiers and ballots share one thematic slot in the output order.
async fn thematic_section(
    store: &KnowledgeStore,
    terms: &[String],
    range: &DateRange,
) -> Result<Option<String>> {
    let dossiers = store
        .search_dossiers(terms, range, SNIPPETS_PER_CATEGORY)
        .await?;
    let votes = store
        .search_vote_events(terms, range, SNIPPETS_PER_CATEGORY)
        .await?;

    if dossiers.is_empty() && votes.is_empty() {
        return Ok(None);
    }

    let mut lines = Vec::new();
    if !dossiers.is_empty() {
        lines.push("Dossiers législatifs :".to_string());
        for d in dossiers {
            let source = d
                .source_url
                .as_deref()
                .map(|u| format!(" Source : {}", u))
                .unwrap_or_default();
            lines.push(format!(
                "- {} (statut : {}). Fiche : {}{}",
                d.title,
                d.status,
                d.canonical_link(),
                source
            ));
        }
    }
    if !votes.is_empty() {
        lines.push("Scrutins :".to_string());
        for v in votes {
            lines.push(format!("- {}. Fiche : {}", v.title, v.canonical_link()));
        }
    }
    Ok(Some(lines.join("\n")))
}

async fn wealth_section(store: &KnowledgeStore, terms: &[String]) -> Result<Option<String>> {
    let found = store
        .search_wealth_declarations(terms, SNIPPETS_PER_CATEGORY)
        .await?;
    if found.is_empty() {
        return Ok(None);
    }
    let mut lines = vec!["Déclarations de patrimoine :".to_string()];
    for w in found {
        let total = w
            .total_assets_eur
            .map(|t| format!("{:.0} EUR déclarés", t))
            .unwrap_or_else(|| "montant non renseigné".to_string());
        lines.push(format!(
            "- {} : {}. Fiche : /politiques/{}",
            w.politician_name, total, w.politician_slug
        ));
    }
    Ok(Some(lines.join("\n")))
}

async fn press_section(
    store: &KnowledgeStore,
    terms: &[String],
    range: &DateRange,
) -> Result<Option<String>> {
    let found = store
        .search_press(terms, range, SNIPPETS_PER_CATEGORY)
        .await?;
    if found.is_empty() {
        return Ok(None);
    }
    let mut lines = vec!["Revue de presse :".to_string()];
    for a in found {
        let outlet = a
            .outlet
            .as_deref()
            .map(|o| format!(" ({})", o))
            .unwrap_or_default();
        lines.push(format!("- {}{}", a.title, outlet));
    }
    Ok(Some(lines.join("\n")))
}

/// Department lookups are serial: each term is a candidate place name.
async fn geography_section(store: &KnowledgeStore, terms: &[String]) -> Result<Option<String>> {
    let mut lines = Vec::new();
    for term in terms {
        if let Some(department) = store.find_department(term).await? {
            let elected = store.politicians_for_department(&department.code).await?;
            lines.push(format!(
                "- {} ({}) : {} élu(s) recensé(s)",
                department.name,
                department.code,
                elected.len()
            ));
        }
    }
    if lines.is_empty() {
        return Ok(None);
    }
    let mut section = vec!["Représentation locale :".to_string()];
    section.extend(lines);
    Ok(Some(section.join("\n")))
}

/// Aggregates only join in when the query actually asks for numbers.
async fn statistics_section(store: &KnowledgeStore, terms: &[String]) -> Result<Option<String>> {
    let wants_stats = terms
        .iter()
        .any(|t| STATS_MARKERS.iter().any(|m| t.starts_with(m)));
    if !wants_stats {
        return Ok(None);
    }
    let overview = store.overview().await?;
    let lines = vec![
        "Chiffres clés :".to_string(),
        format!("- Assemblée nationale : {} députés", overview.deputies),
        format!("- Sénat : {} sénateurs", overview.senators),
        format!(
            "- {} partis, {} dossiers législatifs, {} scrutins recensés",
            overview.parties, overview.dossiers, overview.vote_events
        ),
    ];
    Ok(Some(lines.join("\n")))
}

async fn institutions_section(store: &KnowledgeStore, terms: &[String]) -> Result<Option<String>> {
    let found = store
        .search_institutions(terms, SNIPPETS_PER_CATEGORY)
        .await?;
    if found.is_empty() {
        return Ok(None);
    }
    let mut lines = vec!["Institutions :".to_string()];
    for i in found {
        lines.push(format!("- {}. Fiche : {}", i.name, i.canonical_link()));
    }
    Ok(Some(lines.join("\n")))
}
