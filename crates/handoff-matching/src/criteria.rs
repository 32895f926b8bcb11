// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Search constraints for a match request.

use serde::{Deserialize, Serialize};

/// What the caller is looking for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchCriteria {
    pub role_id: String,
    /// Requested location; a case-insensitive substring match earns a bonus.
    pub location: Option<String>,
    /// Candidates rated below this are not eligible.
    pub min_rating: Option<f64>,
    /// Only professionals currently online are eligible.
    pub online_only: bool,
    /// Professionals that must not be returned (current assignee and the
    /// rest of the escalation chain).
    pub excluded: Vec<String>,
    /// Level the session would reach with the returned candidate.
    pub escalation_level: u32,
}

impl MatchCriteria {
    pub fn for_role(role_id: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            ..Self::default()
        }
    }

    pub fn excluding(mut self, professional_id: impl Into<String>) -> Self {
        let id = professional_id.into();
        if !self.excluded.contains(&id) {
            self.excluded.push(id);
        }
        self
    }

    pub fn near(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_min_rating(mut self, rating: f64) -> Self {
        self.min_rating = Some(rating);
        self
    }

    pub fn online_only(mut self) -> Self {
        self.online_only = true;
        self
    }

    pub fn at_level(mut self, escalation_level: u32) -> Self {
        self.escalation_level = escalation_level;
        self
    }

    pub fn is_excluded(&self, professional_id: &str) -> bool {
        self.excluded.iter().any(|id| id == professional_id)
    }
}
