// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests for eligibility and ranking.

use handoff_core::types::{
    ApprovalStatus, Candidate, PresenceStatus, ProfessionalProfile, ProfessionalStatus,
};
use handoff_matching::{MatchCriteria, rank, score_candidate};
use proptest::prelude::*;

fn approval() -> impl Strategy<Value = ApprovalStatus> {
    prop_oneof![
        Just(ApprovalStatus::Pending),
        Just(ApprovalStatus::Approved),
        Just(ApprovalStatus::Rejected),
        Just(ApprovalStatus::Suspended),
    ]
}

fn presence() -> impl Strategy<Value = PresenceStatus> {
    prop_oneof![
        Just(PresenceStatus::Offline),
        Just(PresenceStatus::Online),
        Just(PresenceStatus::Busy),
    ]
}

prop_compose! {
    fn arb_candidate(id: usize)(
        approval in approval(),
        is_active in any::<bool>(),
        online_availability in any::<bool>(),
        max in 1u32..6,
        used in 0u32..8,
        rating in 0.0f64..=5.0,
        reviews in 0u32..200,
        status in presence(),
        in_lisbon in any::<bool>(),
    ) -> Candidate {
        let id = format!("p-{id}");
        Candidate {
            profile: ProfessionalProfile {
                id: id.clone(),
                display_name: id.clone(),
                role_id: "therapist".to_string(),
                approval_status: approval,
                is_active,
                online_availability,
                max_concurrent_sessions: max,
                rating_average: rating,
                review_count: reviews,
                location: in_lisbon.then(|| "Lisbon".to_string()),
            },
            status: ProfessionalStatus {
                professional_id: id,
                status,
                current_session_count: used,
                last_seen_at: None,
            },
        }
    }
}

fn arb_pool() -> impl Strategy<Value = Vec<Candidate>> {
    (1usize..12).prop_flat_map(|n| {
        (0..n)
            .map(arb_candidate)
            .collect::<Vec<_>>()
    })
}

proptest! {
    #[test]
    fn never_returns_ineligible_or_excluded(pool in arb_pool(), excluded in 0usize..12, limit in 0usize..15) {
        let excluded_id = format!("p-{excluded}");
        let criteria = MatchCriteria::for_role("therapist").excluding(excluded_id.clone());
        let ranked = rank(&pool, &criteria, limit);

        prop_assert!(ranked.len() <= limit);
        for r in &ranked {
            prop_assert_eq!(r.candidate.profile.approval_status, ApprovalStatus::Approved);
            prop_assert!(r.candidate.profile.is_active);
            prop_assert_ne!(r.professional_id(), excluded_id.as_str());
        }
    }

    #[test]
    fn ranking_is_sorted_descending(pool in arb_pool()) {
        let ranked = rank(&pool, &MatchCriteria::for_role("therapist").near("lisbon"), 20);
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn going_online_never_lowers_score(c in arb_candidate(0)) {
        let criteria = MatchCriteria::for_role("therapist");
        let mut offline = c.clone();
        offline.status.status = PresenceStatus::Offline;
        let mut online = c;
        online.status.status = PresenceStatus::Online;

        if let (Ok(off), Ok(on)) = (
            score_candidate(&offline, &criteria),
            score_candidate(&online, &criteria),
        ) {
            prop_assert!(on.score > off.score);
        }
    }

    #[test]
    fn online_only_returns_only_online(pool in arb_pool()) {
        let ranked = rank(&pool, &MatchCriteria::for_role("therapist").online_only(), 20);
        for r in &ranked {
            prop_assert_eq!(r.candidate.status.status, PresenceStatus::Online);
        }
    }
}
