//! Recency boosting of retrieval candidates
//!
//! Fresh civic facts matter more than stale ones. Dated candidates
//! get their similarity multiplied by a banded factor, undated
//! candidates keep their raw score, then the list is re-sorted.

use crate::model::Candidate;
use chrono::{DateTime, Utc};

const RECENT_BOOST: f32 = 1.5;
const YEAR_BOOST: f32 = 1.2;
const STALE_PENALTY: f32 = 0.7;

const THREE_MONTHS_DAYS: i64 = 90;
const ONE_YEAR_DAYS: i64 = 365;
const THREE_YEARS_DAYS: i64 = 1095;

fn boost_factor(age_days: i64) -> f32 {
    if age_days < THREE_MONTHS_DAYS {
        RECENT_BOOST
    } else if age_days < ONE_YEAR_DAYS {
        YEAR_BOOST
    } else if age_days > THREE_YEARS_DAYS {
        STALE_PENALTY
    } else {
        1.0
    }
}

/// Apply the recency bands and re-sort descending by boosted score.
pub fn boost_by_recency(candidates: &mut [Candidate], now: DateTime<Utc>) {
    for candidate in candidates.iter_mut() {
        if let Some(published_at) = candidate.published_at {
            let age_days = (now - published_at).num_days();
            candidate.similarity *= boost_factor(age_days);
        }
    }
    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
