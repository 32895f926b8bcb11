// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::HandoffError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ConversationMessage, EndedBy, EscalationEvent, EscalationRule, EventResult, Session,
    SessionStatus, SessionTransfer,
};

/// Adapter for the persistent store holding sessions, escalation rules,
/// the escalation event log, and conversation messages.
///
/// Every `mark_*` / `transfer_*` / `resolve_*` method is a compare-and-set:
/// it only applies when the row is still in the expected state and returns
/// `false` otherwise. Load counters change in the same transaction as the
/// status they belong to.
#[async_trait]
pub trait SessionStore: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), HandoffError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), HandoffError>;

    // --- Sessions ---

    /// Inserts a new session. Fails with `Conflict` when the conversation
    /// already has a live session.
    async fn insert_session(&self, session: &Session) -> Result<(), HandoffError>;

    async fn get_session(&self, id: &str) -> Result<Option<Session>, HandoffError>;

    async fn live_session_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Session>, HandoffError>;

    async fn list_sessions(
        &self,
        status: Option<SessionStatus>,
    ) -> Result<Vec<Session>, HandoffError>;

    /// Pending sessions whose current professional was assigned at or before `cutoff`.
    async fn pending_sessions_assigned_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Session>, HandoffError>;

    /// Active sessions with a recorded join time.
    async fn active_joined_sessions(&self) -> Result<Vec<Session>, HandoffError>;

    /// pending_acceptance -> active for the assigned professional; increments
    /// that professional's load counter.
    async fn mark_accepted(
        &self,
        session_id: &str,
        professional_id: &str,
        joined_at: DateTime<Utc>,
    ) -> Result<bool, HandoffError>;

    /// pending_acceptance -> declined for the assigned professional.
    async fn mark_declined(
        &self,
        session_id: &str,
        professional_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, HandoffError>;

    /// active -> ended; decrements the assigned professional's load counter.
    async fn mark_ended(
        &self,
        session_id: &str,
        ended_by: EndedBy,
        reason: Option<&str>,
        ended_at: DateTime<Utc>,
    ) -> Result<bool, HandoffError>;

    /// Moves a live session to a new professional at `expected_level + 1`.
    /// The session returns to pending_acceptance; if it was active, the
    /// previous professional's counter is decremented.
    async fn transfer_session(&self, transfer: &SessionTransfer) -> Result<bool, HandoffError>;

    // --- Escalation rules ---

    async fn upsert_rule(&self, rule: &EscalationRule) -> Result<(), HandoffError>;

    /// Active rules that are global or bound to `role_id`, by ascending priority.
    async fn rules_for_role(&self, role_id: &str) -> Result<Vec<EscalationRule>, HandoffError>;

    // --- Escalation events ---

    async fn insert_event(&self, event: &EscalationEvent) -> Result<(), HandoffError>;

    async fn get_event(&self, id: &str) -> Result<Option<EscalationEvent>, HandoffError>;

    /// Events for a session, oldest first.
    async fn events_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<EscalationEvent>, HandoffError>;

    /// pending -> `result`. Returns `false` when the event was already resolved.
    async fn resolve_event(
        &self,
        id: &str,
        result: EventResult,
        user_confirmed: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, HandoffError>;

    // --- Conversation messages ---

    async fn append_message(&self, message: &ConversationMessage) -> Result<(), HandoffError>;

    /// The most recent `limit` messages of a conversation, oldest first.
    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, HandoffError>;

    /// Timestamp of the latest message, optionally restricted to one sender.
    async fn last_message_at(
        &self,
        conversation_id: &str,
        sender_id: Option<&str>,
    ) -> Result<Option<DateTime<Utc>>, HandoffError>;
}
