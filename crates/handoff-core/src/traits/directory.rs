// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Professional directory boundary: profiles, roles, and live status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::HandoffError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    Candidate, PresenceStatus, ProfessionalProfile, ProfessionalRole, ProfessionalStatus,
};

/// Read access to professionals plus the presence heartbeat entry point.
///
/// Load counters are not written here; they move together with session
/// status changes in [`SessionStore`](crate::SessionStore).
#[async_trait]
pub trait ProfessionalDirectory: PluginAdapter {
    async fn upsert_role(&self, role: &ProfessionalRole) -> Result<(), HandoffError>;

    async fn get_role(&self, id: &str) -> Result<Option<ProfessionalRole>, HandoffError>;

    /// Active, live-chat-eligible roles sharing a category.
    async fn roles_in_category(&self, category: &str)
        -> Result<Vec<ProfessionalRole>, HandoffError>;

    async fn upsert_profile(&self, profile: &ProfessionalProfile) -> Result<(), HandoffError>;

    async fn get_profile(&self, id: &str) -> Result<Option<ProfessionalProfile>, HandoffError>;

    /// Every professional registered for a role, joined with live status,
    /// in stable registration order. No eligibility filtering is applied.
    async fn candidates_for_role(&self, role_id: &str) -> Result<Vec<Candidate>, HandoffError>;

    async fn get_status(
        &self,
        professional_id: &str,
    ) -> Result<Option<ProfessionalStatus>, HandoffError>;

    /// Presence heartbeat: sets status and `last_seen_at`, never the load counter.
    async fn record_presence(
        &self,
        professional_id: &str,
        status: PresenceStatus,
        seen_at: DateTime<Utc>,
    ) -> Result<(), HandoffError>;
}
