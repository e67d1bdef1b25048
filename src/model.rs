//! Domain types for French political open data
//!
//! Entities mirror the public store's payloads: politicians, parties,
//! judicial affairs, legislative dossiers, votes, wealth declarations,
//! press coverage and fact checks. Every entity that has a public page
//! exposes a canonical site-relative link built from its stored slug.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Reminder appended to any judicial content whose proceedings are not
/// definitively closed.
pub const PRESUMPTION_NOTICE: &str = "Rappel : toute personne mise en cause est présumée innocente tant qu'une condamnation définitive n'a pas été prononcée.";

/// An elected or formerly elected official.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Politician {
    pub slug: String,
    pub full_name: String,
    /// "député", "sénateur", "ministre", ...
    pub role: String,
    pub party: Option<String>,
    /// Department code, e.g. "34" or "973".
    pub department: Option<String>,
    pub department_name: Option<String>,
    pub constituency: Option<String>,
    pub email: Option<String>,
    pub twitter: Option<String>,
    pub mandate_since: Option<NaiveDate>,
}

impl Politician {
    pub fn canonical_link(&self) -> String {
        format!("/politiques/{}", self.slug)
    }
}

/// A political party or parliamentary group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub slug: String,
    pub name: String,
    pub abbreviation: Option<String>,
    pub leaning: Option<String>,
    pub seats_assemblee: Option<u32>,
    pub seats_senat: Option<u32>,
    pub president: Option<String>,
    pub founded: Option<NaiveDate>,
}

impl Party {
    pub fn canonical_link(&self) -> String {
        format!("/partis/{}", self.slug)
    }
}

/// Procedural state of a judicial affair.
///
/// The five closed states are the only ones that lift the presumption
/// of innocence reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffairStatus {
    Enquete,
    Instruction,
    MiseEnExamen,
    Proces,
    CondamnationPremiereInstance,
    Appel,
    CondamnationDefinitive,
    Relaxe,
    Acquittement,
    NonLieu,
    ClasseSansSuite,
}

impl AffairStatus {
    /// True while proceedings are ongoing or a conviction is not final.
    pub fn requires_presumption_notice(&self) -> bool {
        !matches!(
            self,
            AffairStatus::CondamnationDefinitive
                | AffairStatus::Relaxe
                | AffairStatus::Acquittement
                | AffairStatus::NonLieu
                | AffairStatus::ClasseSansSuite
        )
    }

    /// Human-readable French label.
    pub fn label(&self) -> &'static str {
        match self {
            AffairStatus::Enquete => "enquête en cours",
            AffairStatus::Instruction => "instruction en cours",
            AffairStatus::MiseEnExamen => "mise en examen",
            AffairStatus::Proces => "procès en cours",
            AffairStatus::CondamnationPremiereInstance => "condamnation en première instance",
            AffairStatus::Appel => "appel en cours",
            AffairStatus::CondamnationDefinitive => "condamnation définitive",
            AffairStatus::Relaxe => "relaxe",
            AffairStatus::Acquittement => "acquittement",
            AffairStatus::NonLieu => "non-lieu",
            AffairStatus::ClasseSansSuite => "classé sans suite",
        }
    }
}

impl FromStr for AffairStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enquete" => Ok(AffairStatus::Enquete),
            "instruction" => Ok(AffairStatus::Instruction),
            "mise_en_examen" => Ok(AffairStatus::MiseEnExamen),
            "proces" => Ok(AffairStatus::Proces),
            "condamnation_premiere_instance" => Ok(AffairStatus::CondamnationPremiereInstance),
            "appel" => Ok(AffairStatus::Appel),
            "condamnation_definitive" => Ok(AffairStatus::CondamnationDefinitive),
            "relaxe" => Ok(AffairStatus::Relaxe),
            "acquittement" => Ok(AffairStatus::Acquittement),
            "non_lieu" => Ok(AffairStatus::NonLieu),
            "classe_sans_suite" => Ok(AffairStatus::ClasseSansSuite),
            other => Err(format!("unknown affair status: {}", other)),
        }
    }
}

/// A judicial affair involving a politician.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudicialAffair {
    pub slug: String,
    pub title: String,
    pub politician_slug: String,
    pub status: AffairStatus,
    pub charges: Vec<String>,
    pub opened_on: Option<NaiveDate>,
    pub last_update: Option<NaiveDate>,
    pub summary: Option<String>,
}

impl JudicialAffair {
    pub fn canonical_link(&self) -> String {
        format!("/affaires/{}", self.slug)
    }
}

/// A legislative dossier (bill, law, resolution) before parliament.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegislativeDossier {
    pub slug: String,
    pub title: String,
    /// Free-form procedural status, e.g. "adopté", "en commission".
    pub status: String,
    pub filed_on: Option<NaiveDate>,
    pub themes: Vec<String>,
    pub source_url: Option<String>,
}

impl LegislativeDossier {
    pub fn canonical_link(&self) -> String {
        format!("/dossiers/{}", self.slug)
    }
}

/// A recorded public ballot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteEvent {
    pub slug: String,
    pub title: String,
    pub voted_on: Option<NaiveDate>,
    pub adopted: Option<bool>,
    pub for_count: Option<u32>,
    pub against_count: Option<u32>,
    pub abstention_count: Option<u32>,
    pub source_url: Option<String>,
}

impl VoteEvent {
    pub fn canonical_link(&self) -> String {
        format!("/votes/{}", self.slug)
    }
}

/// How one politician voted on one ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotePosition {
    Pour,
    Contre,
    Abstention,
    Absent,
}

impl VotePosition {
    pub fn label(&self) -> &'static str {
        match self {
            VotePosition::Pour => "pour",
            VotePosition::Contre => "contre",
            VotePosition::Abstention => "abstention",
            VotePosition::Absent => "absent",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub event: VoteEvent,
    pub position: VotePosition,
}

/// Declared assets filed with the transparency authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WealthDeclaration {
    pub politician_slug: String,
    pub politician_name: String,
    pub declared_on: Option<NaiveDate>,
    pub total_assets_eur: Option<f64>,
    pub real_estate_eur: Option<f64>,
    pub financial_assets_eur: Option<f64>,
    pub source_url: Option<String>,
}

/// A press article referencing one or more politicians.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PressArticle {
    pub title: String,
    pub outlet: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
}

/// An editorial verification of a public claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactCheck {
    pub slug: String,
    pub claim: String,
    /// "vrai", "faux", "trompeur", "invérifiable", ...
    pub verdict: String,
    pub explanation: Option<String>,
    pub checked_on: Option<NaiveDate>,
}

impl FactCheck {
    pub fn canonical_link(&self) -> String {
        format!("/factchecks/{}", self.slug)
    }
}

/// A French department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub code: String,
    pub name: String,
}

/// A public institution (Assemblée nationale, Sénat, HATVP, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
}

impl Institution {
    pub fn canonical_link(&self) -> String {
        format!("/institutions/{}", self.slug)
    }
}

/// Seat count for one party, used in aggregate overviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartySeats {
    pub name: String,
    pub seats: u32,
}

/// Aggregate statistics about the whole dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreOverview {
    pub deputies: u32,
    pub senators: u32,
    pub parties: u32,
    pub dossiers: u32,
    pub vote_events: u32,
    pub top_parties: Vec<PartySeats>,
}

/// One retrieval hit flowing from the vector index toward the
/// context assembler.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub details: CandidateDetails,
    /// Indexed text of the underlying document.
    pub content: String,
    /// Vector similarity, later overwritten by reranking and recency.
    pub similarity: f32,
    pub canonical_link: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Typed payload of a retrieval hit. The assembler renders each kind
/// with its own template.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateDetails {
    Politician {
        full_name: String,
        party: Option<String>,
    },
    Party {
        name: String,
    },
    JudicialAffair {
        title: String,
        status: AffairStatus,
    },
    LegislativeDossier {
        title: String,
        status: String,
        source_url: Option<String>,
    },
    VoteEvent {
        title: String,
        source_url: Option<String>,
    },
    PressArticle {
        title: String,
        outlet: Option<String>,
    },
    FactCheck {
        claim: String,
        verdict: String,
    },
}

impl CandidateDetails {
    /// The payload discriminator as stored in the vector index.
    pub fn kind(&self) -> &'static str {
        match self {
            CandidateDetails::Politician { .. } => "politician",
            CandidateDetails::Party { .. } => "party",
            CandidateDetails::JudicialAffair { .. } => "judicial_affair",
            CandidateDetails::LegislativeDossier { .. } => "legislative_dossier",
            CandidateDetails::VoteEvent { .. } => "vote_event",
            CandidateDetails::PressArticle { .. } => "press_article",
            CandidateDetails::FactCheck { .. } => "fact_check",
        }
    }
}

/// Outcome of a rate-limit check for one client.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_links_are_built_from_slugs() {
        let politician = Politician {
            slug: "jean-dupont".to_string(),
            full_name: "Jean Dupont".to_string(),
            role: "député".to_string(),
            party: Some("RE".to_string()),
            department: Some("34".to_string()),
            department_name: Some("Hérault".to_string()),
            constituency: None,
            email: None,
            twitter: None,
            mandate_since: None,
        };
        assert_eq!(politician.canonical_link(), "/politiques/jean-dupont");

        let party = Party {
            slug: "renaissance".to_string(),
            name: "Renaissance".to_string(),
            abbreviation: Some("RE".to_string()),
            leaning: None,
            seats_assemblee: Some(169),
            seats_senat: None,
            president: None,
            founded: None,
        };
        assert_eq!(party.canonical_link(), "/partis/renaissance");

        let check = FactCheck {
            slug: "deficit-2024".to_string(),
            claim: "claim".to_string(),
            verdict: "faux".to_string(),
            explanation: None,
            checked_on: None,
        };
        assert_eq!(check.canonical_link(), "/factchecks/deficit-2024");
    }

    #[test]
    fn open_statuses_require_presumption_notice() {
        let open = [
            AffairStatus::Enquete,
            AffairStatus::Instruction,
            AffairStatus::MiseEnExamen,
            AffairStatus::Proces,
            AffairStatus::CondamnationPremiereInstance,
            AffairStatus::Appel,
        ];
        for status in open {
            assert!(
                status.requires_presumption_notice(),
                "{:?} should require the notice",
                status
            );
        }
    }

    #[test]
    fn closed_statuses_do_not_require_presumption_notice() {
        let closed = [
            AffairStatus::CondamnationDefinitive,
            AffairStatus::Relaxe,
            AffairStatus::Acquittement,
            AffairStatus::NonLieu,
            AffairStatus::ClasseSansSuite,
        ];
        for status in closed {
            assert!(
                !status.requires_presumption_notice(),
                "{:?} should not require the notice",
                status
            );
        }
    }

    #[test]
    fn affair_status_round_trips_through_snake_case() {
        let json = serde_json::to_string(&AffairStatus::MiseEnExamen).unwrap();
        assert_eq!(json, "\"mise_en_examen\"");

        let parsed: AffairStatus = serde_json::from_str("\"non_lieu\"").unwrap();
        assert_eq!(parsed, AffairStatus::NonLieu);

        assert_eq!(
            "condamnation_definitive".parse::<AffairStatus>().unwrap(),
            AffairStatus::CondamnationDefinitive
        );
        assert!("garde_a_vue".parse::<AffairStatus>().is_err());
    }

    #[test]
    fn affair_status_labels_are_french() {
        assert_eq!(AffairStatus::Enquete.label(), "enquête en cours");
        assert_eq!(AffairStatus::Relaxe.label(), "relaxe");
        assert_eq!(
            AffairStatus::CondamnationPremiereInstance.label(),
            "condamnation en première instance"
        );
    }

    #[test]
    fn vote_position_labels() {
        assert_eq!(VotePosition::Pour.label(), "pour");
        assert_eq!(VotePosition::Contre.label(), "contre");
        assert_eq!(VotePosition::Abstention.label(), "abstention");
        assert_eq!(VotePosition::Absent.label(), "absent");
    }

    #[test]
    fn candidate_details_kind_discriminators() {
        let cases = [
            (
                CandidateDetails::Politician {
                    full_name: "x".into(),
                    party: None,
                },
                "politician",
            ),
            (CandidateDetails::Party { name: "x".into() }, "party"),
            (
                CandidateDetails::JudicialAffair {
                    title: "x".into(),
                    status: AffairStatus::Enquete,
                },
                "judicial_affair",
            ),
            (
                CandidateDetails::LegislativeDossier {
                    title: "x".into(),
                    status: "adopté".into(),
                    source_url: None,
                },
                "legislative_dossier",
            ),
            (
                CandidateDetails::VoteEvent {
                    title: "x".into(),
                    source_url: None,
                },
                "vote_event",
            ),
            (
                CandidateDetails::PressArticle {
                    title: "x".into(),
                    outlet: None,
                },
                "press_article",
            ),
            (
                CandidateDetails::FactCheck {
                    claim: "x".into(),
                    verdict: "vrai".into(),
                },
                "fact_check",
            ),
        ];
        for (details, expected) in cases {
            assert_eq!(details.kind(), expected);
        }
    }

    #[test]
    fn presumption_notice_mentions_innocence() {
        assert!(PRESUMPTION_NOTICE.contains("présumée innocente"));
    }
}
