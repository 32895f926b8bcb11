// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Eligibility filters and the additive fitness score.
//!
//! | signal                       | points                     |
//! |------------------------------|----------------------------|
//! | status online / busy         | 50 / 20                    |
//! | rating average (0-5)         | rating x 6                 |
//! | available for live chat      | 10                         |
//! | free session slots           | slots x 5                  |
//! | location substring match     | 15                         |
//! | reviews                      | min(reviews, 50) / 5       |

use std::fmt;

use handoff_core::types::{ApprovalStatus, Candidate, PresenceStatus};
use serde::Serialize;

use crate::criteria::MatchCriteria;

const ONLINE_POINTS: f64 = 50.0;
const BUSY_POINTS: f64 = 20.0;
const RATING_WEIGHT: f64 = 6.0;
const AVAILABILITY_POINTS: f64 = 10.0;
const CAPACITY_WEIGHT: f64 = 5.0;
const LOCATION_POINTS: f64 = 15.0;
const REVIEW_CAP: u32 = 50;
const REVIEW_DIVISOR: f64 = 5.0;

/// Why a candidate was filtered out before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    NotApproved,
    Inactive,
    Excluded,
    NotOnline,
    AtCapacity,
    BelowMinRating,
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Ineligible::NotApproved => "not approved",
            Ineligible::Inactive => "inactive",
            Ineligible::Excluded => "excluded from this escalation chain",
            Ineligible::NotOnline => "not online",
            Ineligible::AtCapacity => "at session capacity",
            Ineligible::BelowMinRating => "below minimum rating",
        };
        f.write_str(text)
    }
}

/// A scored candidate with the reasons behind its score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub score: f64,
    pub reasons: Vec<String>,
}

impl RankedCandidate {
    pub fn professional_id(&self) -> &str {
        &self.candidate.profile.id
    }
}

/// Hard filters. Returns the first reason the candidate cannot be matched.
pub fn check_eligibility(
    candidate: &Candidate,
    criteria: &MatchCriteria,
) -> Result<(), Ineligible> {
    let profile = &candidate.profile;
    let status = &candidate.status;

    if profile.approval_status != ApprovalStatus::Approved {
        return Err(Ineligible::NotApproved);
    }
    if !profile.is_active {
        return Err(Ineligible::Inactive);
    }
    if criteria.is_excluded(&profile.id) {
        return Err(Ineligible::Excluded);
    }
    if criteria.online_only && status.status != PresenceStatus::Online {
        return Err(Ineligible::NotOnline);
    }
    if matches!(status.status, PresenceStatus::Online | PresenceStatus::Busy)
        && status.current_session_count >= profile.max_concurrent_sessions
    {
        return Err(Ineligible::AtCapacity);
    }
    if let Some(min) = criteria.min_rating
        && profile.rating_average < min
    {
        return Err(Ineligible::BelowMinRating);
    }
    Ok(())
}

fn location_matches(profile_location: Option<&str>, requested: Option<&str>) -> bool {
    match (profile_location, requested) {
        (Some(have), Some(want)) if !want.trim().is_empty() => have
            .to_lowercase()
            .contains(&want.trim().to_lowercase()),
        _ => false,
    }
}

/// Score one candidate, or say why it is not eligible.
pub fn score_candidate(
    candidate: &Candidate,
    criteria: &MatchCriteria,
) -> Result<RankedCandidate, Ineligible> {
    check_eligibility(candidate, criteria)?;

    let profile = &candidate.profile;
    let status = &candidate.status;
    let mut score = 0.0;
    let mut reasons = Vec::new();

    match status.status {
        PresenceStatus::Online => {
            score += ONLINE_POINTS;
            reasons.push("online now".to_string());
        }
        PresenceStatus::Busy => {
            score += BUSY_POINTS;
            reasons.push("busy but accepting sessions".to_string());
        }
        PresenceStatus::Offline => {}
    }

    score += profile.rating_average * RATING_WEIGHT;
    if profile.rating_average > 0.0 {
        reasons.push(format!("rated {:.1}/5", profile.rating_average));
    }

    if profile.online_availability {
        score += AVAILABILITY_POINTS;
        reasons.push("available for live chat".to_string());
    }

    let free_slots = profile
        .max_concurrent_sessions
        .saturating_sub(status.current_session_count);
    score += f64::from(free_slots) * CAPACITY_WEIGHT;
    if free_slots > 0 {
        let plural = if free_slots == 1 { "" } else { "s" };
        reasons.push(format!("{free_slots} open session slot{plural}"));
    }

    if location_matches(profile.location.as_deref(), criteria.location.as_deref())
        && let Some(location) = &profile.location
    {
        score += LOCATION_POINTS;
        reasons.push(format!("located in {location}"));
    }

    let reviews = profile.review_count.min(REVIEW_CAP);
    score += f64::from(reviews) / REVIEW_DIVISOR;
    if profile.review_count > 0 {
        reasons.push(format!("{} reviews", profile.review_count));
    }

    Ok(RankedCandidate {
        candidate: candidate.clone(),
        score,
        reasons,
    })
}

/// Filter, score, and sort candidates by descending score, keeping the
/// incoming order for ties, then truncate to `limit`.
pub fn rank(
    candidates: &[Candidate],
    criteria: &MatchCriteria,
    limit: usize,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .iter()
        .filter_map(|c| score_candidate(c, criteria).ok())
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(limit);
    ranked
}
