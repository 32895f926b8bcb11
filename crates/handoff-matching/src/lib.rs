// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Match scoring for the Handoff escalation service.
//!
//! Ranks the professionals of a role by an additive fitness score and
//! explains every ranking with human-readable reasons. Scoring is a pure
//! function over [`Candidate`](handoff_core::types::Candidate) snapshots;
//! [`MatchScorer`] wires it to a professional directory.

pub mod criteria;
pub mod scorer;
pub mod score;

pub use criteria::MatchCriteria;
pub use score::{Ineligible, RankedCandidate, check_eligibility, rank, score_candidate};
pub use scorer::MatchScorer;
