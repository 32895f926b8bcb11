// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory-backed match scorer.

use std::collections::HashSet;
use std::sync::Arc;

use handoff_core::types::Candidate;
use handoff_core::{HandoffError, ProfessionalDirectory};
use tracing::debug;

use crate::criteria::MatchCriteria;
use crate::score::{Ineligible, RankedCandidate, rank, score_candidate};

/// Ranks the professionals a directory knows about.
pub struct MatchScorer {
    directory: Arc<dyn ProfessionalDirectory>,
}

impl MatchScorer {
    pub fn new(directory: Arc<dyn ProfessionalDirectory>) -> Self {
        Self { directory }
    }

    /// Up to `limit` eligible professionals of `criteria.role_id`, best first.
    pub async fn find_matches(
        &self,
        criteria: &MatchCriteria,
        limit: usize,
    ) -> Result<Vec<RankedCandidate>, HandoffError> {
        self.find_matches_in_roles(std::slice::from_ref(&criteria.role_id), criteria, limit)
            .await
    }

    /// Like [`find_matches`](Self::find_matches) but pools the candidates of
    /// several roles. Earlier roles win ties.
    pub async fn find_matches_in_roles(
        &self,
        role_ids: &[String],
        criteria: &MatchCriteria,
        limit: usize,
    ) -> Result<Vec<RankedCandidate>, HandoffError> {
        let candidates = self.pooled_candidates(role_ids).await?;
        let ranked = rank(&candidates, criteria, limit);
        debug!(
            role_id = %criteria.role_id,
            roles = role_ids.len(),
            examined = candidates.len(),
            matched = ranked.len(),
            escalation_level = criteria.escalation_level,
            "match scoring complete"
        );
        Ok(ranked)
    }

    /// Every candidate of the role with either its score or the filter that
    /// removed it, in directory order.
    pub async fn explain(
        &self,
        criteria: &MatchCriteria,
    ) -> Result<Vec<(Candidate, Result<f64, Ineligible>)>, HandoffError> {
        let candidates = self.directory.candidates_for_role(&criteria.role_id).await?;
        Ok(candidates
            .into_iter()
            .map(|c| {
                let outcome = score_candidate(&c, criteria).map(|r| r.score);
                (c, outcome)
            })
            .collect())
    }

    async fn pooled_candidates(&self, role_ids: &[String]) -> Result<Vec<Candidate>, HandoffError> {
        let mut seen = HashSet::new();
        let mut pooled = Vec::new();
        for role_id in role_ids {
            for candidate in self.directory.candidates_for_role(role_id).await? {
                if seen.insert(candidate.profile.id.clone()) {
                    pooled.push(candidate);
                }
            }
        }
        Ok(pooled)
    }
}
