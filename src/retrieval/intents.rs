//! Intent pattern tier
//!
//! A fixed, ordered list of regex detectors over the normalized query,
//! each paired with a handler doing targeted point lookups against the
//! store. A matched pattern whose handler cannot resolve its entity
//! returns None and matching continues with the next pattern; the
//! match is a precision hint, not a hard commit. Handlers that surface
//! judicial content emit the presumption-of-innocence notice
//! themselves, per affair, whenever its status is not definitively
//! closed.

use crate::error::Result;
use crate::model::{Party, PRESUMPTION_NOTICE};
use crate::retrieval::keywords::normalize_query;
use crate::store::KnowledgeStore;
use once_cell::sync::Lazy;
use regex::Regex;

/// Lookups per list-shaped handler answer.
const HANDLER_LIST_LIMIT: u32 = 5;

static WEALTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:declarations? de patrimoine|patrimoine|fortune|richesse)\s+(?:de la |de l'|du |des |de |d')(.+)$",
    )
    .unwrap()
});

static JUDICIAL_OF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:affaires? judiciaires?|affaires?|condamnations?|ennuis judiciaires|casier judiciaire|demeles judiciaires)\s+(?:de la |de l'|du |des |de |d')(.+)$",
    )
    .unwrap()
});

static JUDICIAL_SUBJECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:est-ce que )?(.+?)\s+(?:a-t-il|a-t-elle|est-il|est-elle|a)\s+(?:ete |deja )?(?:condamnee?|mise? en examen|poursuivie?|des affaires|des ennuis judiciaires)",
    )
    .unwrap()
});

static VOTE_HOW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:comment a vote|qu'a vote|comment votait)\s+(.+?)(?:\s+sur\s+(.+))?$").unwrap()
});

static VOTE_OF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:votes?|positions?)\s+de\s+(.+?)(?:\s+sur\s+(.+))?$").unwrap()
});

static CONTACT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:contacter|joindre|ecrire a|(?:adresse )?(?:e-?mail|courriel)|adresse)\s+(?:de la |de l'|du |des |de |d'|a )?(.+)$",
    )
    .unwrap()
});

static POSTAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([0-9]{5})\b").unwrap());

static DEPUTIES_PLACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:deputes?|elus?|parlementaires?)\s+(?:de la |de l'|du |des |de |d'|dans le |dans la |dans l'|dans )(.+)$",
    )
    .unwrap()
});

static COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"combien (?:de |y a-t-il de |compte-t-on de )?deputes?(?: (?:de la |de l'|du |des |de |d'|chez |pour |au |a )(.+))?$",
    )
    .unwrap()
});

static PARTY_DIRECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:le |la |l')?(?:parti|groupe)(?: politique| parlementaire)?\s+(?:de |du |des |d')?(.+)$")
        .unwrap()
});

static PARTY_ASK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:qu'est-ce que|c'est quoi|presente-moi|informations? sur)\s+(?:le |la |l')?(.+)$")
        .unwrap()
});

static FACTCHECK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:est-ce vrai que|est-il vrai que|vrai ou faux|info ou intox|fact-?check)\s+(.+)$")
        .unwrap()
});

static RECENT_DOSSIERS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:derniere?s? (?:dossiers?|lois?|textes?)|lois? recentes?|dossiers? recents?|actualites? legislatives?|quoi de neuf)(?:\s+(?:sur|concernant)\s+(?:la |le |les |l')?(.+))?$",
    )
    .unwrap()
});

static WHO_IS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"qui est\s+(.+)$").unwrap());

/// One detected question shape with its extracted arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Wealth { name: String },
    Judicial { name: String },
    VotePosition { name: String, topic: Option<String> },
    Contact { name: String },
    DeputiesForPlace { place: String },
    CountDeputies { party: Option<String> },
    PartyInfo { name: String },
    FactCheck { claim: String },
    RecentDossiers { topic: Option<String> },
    WhoIs { name: String },
}

/// Strip honorifics and articles in front of an extracted entity name.
fn clean_entity(text: &str) -> String {
    let mut rest = text.trim();
    let prefixes = [
        "monsieur ", "madame ", "mme ", "m ", "le ", "la ", "les ", "l'", "deputee ", "depute ",
        "senatrice ", "senateur ",
    ];
    loop {
        let mut stripped = false;
        for prefix in prefixes {
            if let Some(shorter) = rest.strip_prefix(prefix) {
                rest = shorter.trim_start();
                stripped = true;
            }
        }
        if !stripped {
            break;
        }
    }
    rest.to_string()
}

fn clean_topic(text: &str) -> String {
    let rest = text.trim();
    for prefix in ["la ", "le ", "les ", "l'", "du ", "des ", "de "] {
        if let Some(shorter) = rest.strip_prefix(prefix) {
            return shorter.trim().to_string();
        }
    }
    rest.to_string()
}

/// First two postal digits name the department, except overseas
/// territories where the first three do.
fn department_code_from_postal(postal: &str) -> String {
    if postal.starts_with("97") || postal.starts_with("98") {
        postal[..3].to_string()
    } else {
        postal[..2].to_string()
    }
}

fn push_unique(intents: &mut Vec<Intent>, intent: Intent) {
    if !intents.contains(&intent) {
        intents.push(intent);
    }
}

/// Run every detector in fixed order over the normalized query.
pub fn detect_intents(normalized: &str) -> Vec<Intent> {
    let mut intents = Vec::new();

    if let Some(caps) = WEALTH_RE.captures(normalized) {
        let name = clean_entity(&caps[1]);
        if !name.is_empty() {
            push_unique(&mut intents, Intent::Wealth { name });
        }
    }

    for re in [&*JUDICIAL_OF_RE, &*JUDICIAL_SUBJECT_RE] {
        if let Some(caps) = re.captures(normalized) {
            let name = clean_entity(&caps[1]);
            if !name.is_empty() {
                push_unique(&mut intents, Intent::Judicial { name });
            }
        }
    }

    for re in [&*VOTE_HOW_RE, &*VOTE_OF_RE] {
        if let Some(caps) = re.captures(normalized) {
            let name = clean_entity(&caps[1]);
            let topic = caps.get(2).map(|m| clean_topic(m.as_str()));
            if !name.is_empty() {
                push_unique(&mut intents, Intent::VotePosition { name, topic });
            }
        }
    }

    if let Some(caps) = CONTACT_RE.captures(normalized) {
        let name = clean_entity(&caps[1]);
        if !name.is_empty() {
            push_unique(&mut intents, Intent::Contact { name });
        }
    }

    let mentions_elected = normalized.contains("depute")
        || normalized.contains("elu")
        || normalized.contains("parlementaire");
    if mentions_elected {
        if let Some(caps) = POSTAL_RE.captures(normalized) {
            push_unique(
                &mut intents,
                Intent::DeputiesForPlace {
                    place: caps[1].to_string(),
                },
            );
        }
    }
    if let Some(caps) = DEPUTIES_PLACE_RE.captures(normalized) {
        let place = clean_entity(&caps[1]);
        if !place.is_empty() {
            push_unique(&mut intents, Intent::DeputiesForPlace { place });
        }
    }

    if let Some(caps) = COUNT_RE.captures(normalized) {
        let party = caps.get(1).map(|m| clean_topic(m.as_str())).filter(|p| !p.is_empty());
        push_unique(&mut intents, Intent::CountDeputies { party });
    }

    for re in [&*PARTY_DIRECT_RE, &*PARTY_ASK_RE] {
        if let Some(caps) = re.captures(normalized) {
            let name = caps[1].trim().to_string();
            if !name.is_empty() {
                push_unique(&mut intents, Intent::PartyInfo { name });
            }
        }
    }

    if let Some(caps) = FACTCHECK_RE.captures(normalized) {
        let claim = caps[1].trim().to_string();
        if !claim.is_empty() {
            push_unique(&mut intents, Intent::FactCheck { claim });
        }
    }

    if let Some(caps) = RECENT_DOSSIERS_RE.captures(normalized) {
        let topic = caps.get(1).map(|m| clean_topic(m.as_str())).filter(|t| !t.is_empty());
        push_unique(&mut intents, Intent::RecentDossiers { topic });
    }

    if let Some(caps) = WHO_IS_RE.captures(normalized) {
        let name = clean_entity(&caps[1]);
        if !name.is_empty() {
            push_unique(&mut intents, Intent::WhoIs { name });
        }
    }

    intents
}

/// Pattern tier entry point. The first handler producing text wins;
/// handlers that cannot resolve their entity yield to the next intent.
pub async fn match_patterns(store: &KnowledgeStore, query: &str) -> Result<Option<String>> {
    let normalized = normalize_query(query);
    for intent in detect_intents(&normalized) {
        if let Some(answer) = handle_intent(store, &intent).await? {
            return Ok(Some(answer));
        }
    }
    Ok(None)
}

async fn handle_intent(store: &KnowledgeStore, intent: &Intent) -> Result<Option<String>> {
    match intent {
        Intent::Wealth { name } => wealth_answer(store, name).await,
        Intent::Judicial { name } => judicial_answer(store, name).await,
        Intent::VotePosition { name, topic } => vote_answer(store, name, topic.as_deref()).await,
        Intent::Contact { name } => contact_answer(store, name).await,
        Intent::DeputiesForPlace { place } => deputies_for_place_answer(store, place).await,
        Intent::CountDeputies { party } => count_answer(store, party.as_deref()).await,
        Intent::PartyInfo { name } => party_answer(store, name).await,
        Intent::FactCheck { claim } => fact_check_answer(store, claim).await,
        Intent::RecentDossiers { topic } => recent_dossiers_answer(store, topic.as_deref()).await,
        Intent::WhoIs { name } => who_is_answer(store, name).await,
    }
}

async fn wealth_answer(store: &KnowledgeStore, name: &str) -> Result<Option<String>> {
    let Some(politician) = store.find_politician(name).await? else {
        return Ok(None);
    };
    let link = politician.canonical_link();

    match store.wealth_declaration(&politician.slug).await? {
        Some(declaration) => {
            let mut lines = vec![format!(
                "Patrimoine déclaré de {} :",
                politician.full_name
            )];
            if let Some(total) = declaration.total_assets_eur {
                lines.push(format!("- Total déclaré : {:.0} EUR", total));
            }
            if let Some(real_estate) = declaration.real_estate_eur {
                lines.push(format!("- Immobilier : {:.0} EUR", real_estate));
            }
            if let Some(financial) = declaration.financial_assets_eur {
                lines.push(format!("- Actifs financiers : {:.0} EUR", financial));
            }
            if let Some(declared_on) = declaration.declared_on {
                lines.push(format!("- Déclaration du {}", declared_on));
            }
            if let Some(source) = declaration.source_url {
                lines.push(format!("- Source : {}", source));
            }
            lines.push(format!("Fiche : {}", link));
            Ok(Some(lines.join("\n")))
        }
        None => Ok(Some(format!(
            "Aucune déclaration de patrimoine publiée pour {}. Fiche : {}",
            politician.full_name, link
        ))),
    }
}

async fn judicial_answer(store: &KnowledgeStore, name: &str) -> Result<Option<String>> {
    let Some(politician) = store.find_politician(name).await? else {
        return Ok(None);
    };
    let affairs = store.affairs_for_politician(&politician.slug).await?;

    if affairs.is_empty() {
        return Ok(Some(format!(
            "Aucune affaire judiciaire recensée pour {}. Fiche : {}",
            politician.full_name,
            politician.canonical_link()
        )));
    }

    let mut lines = vec![format!(
        "Affaires judiciaires concernant {} :",
        politician.full_name
    )];
    for affair in &affairs {
        lines.push(format!(
            "- {} (statut : {}). Fiche : {}",
            affair.title,
            affair.status.label(),
            affair.canonical_link()
        ));
        if affair.status.requires_presumption_notice() {
            lines.push(format!("  {}", PRESUMPTION_NOTICE));
        }
    }
    Ok(Some(lines.join("\n")))
}

async fn vote_answer(
    store: &KnowledgeStore,
    name: &str,
    topic: Option<&str>,
) -> Result<Option<String>> {
    let Some(politician) = store.find_politician(name).await? else {
        return Ok(None);
    };
    let votes = store
        .votes_for_politician(&politician.slug, topic, HANDLER_LIST_LIMIT)
        .await?;
    if votes.is_empty() {
        return Ok(None);
    }

    let subject = match topic {
        Some(topic) => format!("Votes de {} sur {} :", politician.full_name, topic),
        None => format!("Votes de {} :", politician.full_name),
    };
    let mut lines = vec![subject];
    for record in &votes {
        lines.push(format!(
            "- {} : a voté {}. Fiche : {}",
            record.event.title,
            record.position.label(),
            record.event.canonical_link()
        ));
    }
    Ok(Some(lines.join("\n")))
}

async fn contact_answer(store: &KnowledgeStore, name: &str) -> Result<Option<String>> {
    let Some(politician) = store.find_politician(name).await? else {
        return Ok(None);
    };

    let mut lines = vec![format!("Contacter {} :", politician.full_name)];
    if let Some(email) = &politician.email {
        lines.push(format!("- Email : {}", email));
    }
    if let Some(twitter) = &politician.twitter {
        lines.push(format!("- Twitter/X : {}", twitter));
    }
    if lines.len() == 1 {
        lines.push("- Aucune coordonnée publique recensée.".to_string());
    }
    lines.push(format!("Fiche : {}", politician.canonical_link()));
    Ok(Some(lines.join("\n")))
}

async fn deputies_for_place_answer(store: &KnowledgeStore, place: &str) -> Result<Option<String>> {
    let code = if place.chars().all(|c| c.is_ascii_digit()) {
        match place.len() {
            5 => department_code_from_postal(place),
            2 | 3 => place.to_string(),
            _ => return Ok(None),
        }
    } else {
        match store.find_department(place).await? {
            Some(department) => department.code,
            None => return Ok(None),
        }
    };

    let elected = store.politicians_for_department(&code).await?;
    if elected.is_empty() {
        return Ok(None);
    }

    let label = store
        .find_department(&code)
        .await?
        .map(|d| format!("{} ({})", d.name, d.code))
        .unwrap_or_else(|| format!("département {}", code));

    let mut lines = vec![format!("Élus pour {} :", label)];
    for politician in &elected {
        lines.push(format!(
            "- {} ({}), {}. Fiche : {}",
            politician.full_name,
            politician.party.as_deref().unwrap_or("sans étiquette"),
            politician.role,
            politician.canonical_link()
        ));
    }
    Ok(Some(lines.join("\n")))
}

fn deputy_noun(count: u32) -> &'static str {
    if count == 1 {
        "député"
    } else {
        "députés"
    }
}

async fn count_answer(store: &KnowledgeStore, party: Option<&str>) -> Result<Option<String>> {
    match party {
        None => {
            let count = store.count_politicians("député", None).await?;
            if count == 0 {
                return Ok(None);
            }
            Ok(Some(format!(
                "L'Assemblée nationale compte {} {} en exercice.",
                count,
                deputy_noun(count)
            )))
        }
        Some(text) => {
            let Some(party) = resolve_party(store, text).await? else {
                return Ok(None);
            };
            let key = party.abbreviation.as_deref().unwrap_or(&party.name);
            let count = store.count_politicians("député", Some(key)).await?;
            if count == 0 {
                return Ok(None);
            }
            Ok(Some(format!(
                "{} compte {} {} à l'Assemblée nationale. Fiche : {}",
                party.name,
                count,
                deputy_noun(count),
                party.canonical_link()
            )))
        }
    }
}

/// Exact lookups only, with and without the "parti" prefix.
async fn resolve_party(store: &KnowledgeStore, name: &str) -> Result<Option<Party>> {
    if let Some(party) = store.find_party(name).await? {
        return Ok(Some(party));
    }
    if let Some(stripped) = name.strip_prefix("parti ") {
        return store.find_party(stripped).await;
    }
    store.find_party(&format!("parti {}", name)).await
}

async fn party_answer(store: &KnowledgeStore, name: &str) -> Result<Option<String>> {
    let Some(party) = resolve_party(store, name).await? else {
        return Ok(None);
    };

    let title = match &party.abbreviation {
        Some(abbreviation) => format!("Parti : {} ({})", party.name, abbreviation),
        None => format!("Parti : {}", party.name),
    };
    let mut lines = vec![title];
    if let Some(leaning) = &party.leaning {
        lines.push(format!("- Orientation : {}", leaning));
    }
    if let Some(seats) = party.seats_assemblee {
        lines.push(format!("- {} sièges à l'Assemblée nationale", seats));
    }
    if let Some(seats) = party.seats_senat {
        lines.push(format!("- {} sièges au Sénat", seats));
    }
    if let Some(president) = &party.president {
        lines.push(format!("- Présidence : {}", president));
    }
    lines.push(format!("Fiche : {}", party.canonical_link()));
    Ok(Some(lines.join("\n")))
}

async fn fact_check_answer(store: &KnowledgeStore, claim: &str) -> Result<Option<String>> {
    let checks = store
        .search_fact_checks(&[claim.to_string()], 1)
        .await?;
    let Some(check) = checks.into_iter().next() else {
        return Ok(None);
    };

    let mut lines = vec![format!(
        "Vérification : « {} » : verdict {}.",
        check.claim, check.verdict
    )];
    if let Some(explanation) = &check.explanation {
        lines.push(explanation.clone());
    }
    lines.push(format!("Fiche : {}", check.canonical_link()));
    Ok(Some(lines.join("\n")))
}

async fn recent_dossiers_answer(
    store: &KnowledgeStore,
    topic: Option<&str>,
) -> Result<Option<String>> {
    let dossiers = store.recent_dossiers(topic, HANDLER_LIST_LIMIT).await?;
    if dossiers.is_empty() {
        return Ok(None);
    }

    let header = match topic {
        Some(topic) => format!("Derniers dossiers législatifs sur {} :", topic),
        None => "Derniers dossiers législatifs :".to_string(),
    };
    let mut lines = vec![header];
    for dossier in &dossiers {
        lines.push(format!(
            "- {} (statut : {}). Fiche : {}",
            dossier.title,
            dossier.status,
            dossier.canonical_link()
        ));
    }
    Ok(Some(lines.join("\n")))
}

async fn who_is_answer(store: &KnowledgeStore, name: &str) -> Result<Option<String>> {
    let Some(politician) = store.find_politician(name).await? else {
        return Ok(None);
    };

    let mut description = format!("{}, {}", politician.full_name, politician.role);
    if let Some(party) = &politician.party {
        description.push_str(&format!(" ({})", party));
    }
    if let Some(department) = &politician.department_name {
        description.push_str(&format!(", département {}", department));
    }
    if let Some(constituency) = &politician.constituency {
        description.push_str(&format!(", {}", constituency));
    }
    if let Some(since) = politician.mandate_since {
        description.push_str(&format!(", en mandat depuis le {}", since));
    }
    description.push('.');
    description.push_str(&format!(" Fiche : {}", politician.canonical_link()));
    Ok(Some(description))
}
