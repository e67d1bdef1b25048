//! Context assembly
//!
//! Renders ranked candidates into the final context string handed to
//! the language model, one kind-specific template per candidate,
//! under a hard length budget. Broad questions about the political
//! landscape get an aggregate preamble computed fresh from the store.

use crate::model::{Candidate, CandidateDetails, PRESUMPTION_NOTICE};
use crate::retrieval::keywords::normalize_query;
use crate::store::KnowledgeStore;
use tracing::warn;

/// Hard budget for the assembled context, in characters.
pub const MAX_CONTEXT_LENGTH: usize = 4000;

const SECTION_JOIN: &str = "\n\n";

static BROAD_QUERY_MARKERS: &[&str] = &[
    "paysage politique",
    "situation politique",
    "vie politique",
    "politique francaise",
    "assemblee nationale",
    "composition de l'assemblee",
    "parlement",
    "gouvernement",
    "partis politiques",
];

fn is_broad_query(normalized: &str) -> bool {
    BROAD_QUERY_MARKERS.iter().any(|m| normalized.contains(m))
}

fn render_candidate(candidate: &Candidate) -> String {
    let link = &candidate.canonical_link;
    match &candidate.details {
        CandidateDetails::Politician { full_name, party } => match party {
            Some(party) => format!("Politique : {} ({}). Fiche : {}", full_name, party, link),
            None => format!("Politique : {}. Fiche : {}", full_name, link),
        },
        CandidateDetails::Party { name } => {
            format!("Parti : {}. Fiche : {}", name, link)
        }
        CandidateDetails::JudicialAffair { title, status } => {
            let mut out = format!(
                "Affaire judiciaire : {} (statut : {})\n{}",
                title,
                status.label(),
                candidate.content
            );
            if status.requires_presumption_notice() {
                out.push('\n');
                out.push_str(PRESUMPTION_NOTICE);
            }
            out.push_str(&format!("\nFiche : {}", link));
            out
        }
        CandidateDetails::LegislativeDossier {
            title,
            status,
            source_url,
        } => {
            let source = source_url
                .as_deref()
                .map(|u| format!(" Source : {}", u))
                .unwrap_or_default();
            format!(
                "Dossier législatif : {} (statut : {}). Fiche : {}{}",
                title, status, link, source
            )
        }
        CandidateDetails::VoteEvent { title, source_url } => {
            let source = source_url
                .as_deref()
                .map(|u| format!(" Source : {}", u))
                .unwrap_or_default();
            format!("Scrutin : {}. Fiche : {}{}", title, link, source)
        }
        CandidateDetails::PressArticle { title, outlet } => {
            let outlet = outlet
                .as_deref()
                .map(|o| format!(" ({})", o))
                .unwrap_or_default();
            format!("Presse : {}{}. Lien : {}", title, outlet, link)
        }
        CandidateDetails::FactCheck { claim, verdict } => {
            format!(
                "Vérification : « {} » : verdict {}. Fiche : {}",
                claim, verdict, link
            )
        }
    }
}

async fn overview_preamble(store: &KnowledgeStore) -> Option<String> {
    let overview = match store.overview().await {
        Ok(overview) => overview,
        Err(e) => {
            warn!("Skipping aggregate preamble, overview failed: {}", e);
            return None;
        }
    };

    let mut lines = vec![
        "Panorama politique :".to_string(),
        format!("- Assemblée nationale : {} députés", overview.deputies),
        format!("- Sénat : {} sénateurs", overview.senators),
    ];
    if !overview.top_parties.is_empty() {
        let groups: Vec<String> = overview
            .top_parties
            .iter()
            .map(|p| format!("{} ({} sièges)", p.name, p.seats))
            .collect();
        lines.push(format!("- Principaux groupes : {}", groups.join(", ")));
    }
    Some(lines.join("\n"))
}

/// Assemble the final context from ranked candidates.
///
/// The first section is always included even when it alone exceeds
/// the budget; later sections are appended only while they fit.
pub async fn assemble(store: &KnowledgeStore, candidates: &[Candidate], query: &str) -> String {
    let mut sections: Vec<String> = Vec::with_capacity(candidates.len() + 1);

    if is_broad_query(&normalize_query(query)) {
        if let Some(preamble) = overview_preamble(store).await {
            sections.push(preamble);
        }
    }
    sections.extend(candidates.iter().map(render_candidate));

    let mut out = String::new();
    for (i, section) in sections.iter().enumerate() {
        if i == 0 {
            out.push_str(section);
            continue;
        }
        if out.len() + SECTION_JOIN.len() + section.len() > MAX_CONTEXT_LENGTH {
            break;
        }
        out.push_str(SECTION_JOIN);
        out.push_str(section);
    }
    out
}
