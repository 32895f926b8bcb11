// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the store and directory traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use handoff_config::model::StorageConfig;
use handoff_core::types::{
    Candidate, ConversationMessage, EndedBy, EscalationEvent, EscalationRule, EventResult,
    PresenceStatus, ProfessionalProfile, ProfessionalRole, ProfessionalStatus, Session,
    SessionStatus, SessionTransfer,
};
use handoff_core::{
    AdapterType, HandoffError, HealthStatus, PluginAdapter, ProfessionalDirectory, SessionStore,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed store for sessions, rules, events, messages, and the
/// professional directory.
///
/// The database is opened lazily by [`SessionStore::initialize`]; every
/// other call fails with `Persistence` until then.
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a store for the configured database path without opening it.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, HandoffError> {
        self.db.get().ok_or_else(|| HandoffError::Persistence {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), HandoffError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, HandoffError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), HandoffError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn initialize(&self) -> Result<(), HandoffError> {
        let db = Database::open_with_options(&self.config.database_path, self.config.wal_mode)
            .await?;
        self.db.set(db).map_err(|_| HandoffError::Persistence {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), HandoffError> {
        self.db()?;
        self.checkpoint().await
    }

    // --- Sessions ---

    async fn insert_session(&self, session: &Session) -> Result<(), HandoffError> {
        queries::sessions::insert_session(self.db()?, session).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, HandoffError> {
        queries::sessions::get_session(self.db()?, id).await
    }

    async fn live_session_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<Session>, HandoffError> {
        queries::sessions::live_session_for_conversation(self.db()?, conversation_id).await
    }

    async fn list_sessions(
        &self,
        status: Option<SessionStatus>,
    ) -> Result<Vec<Session>, HandoffError> {
        queries::sessions::list_sessions(self.db()?, status).await
    }

    async fn pending_sessions_assigned_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Session>, HandoffError> {
        queries::sessions::pending_sessions_assigned_before(self.db()?, cutoff).await
    }

    async fn active_joined_sessions(&self) -> Result<Vec<Session>, HandoffError> {
        queries::sessions::active_joined_sessions(self.db()?).await
    }

    async fn mark_accepted(
        &self,
        session_id: &str,
        professional_id: &str,
        joined_at: DateTime<Utc>,
    ) -> Result<bool, HandoffError> {
        queries::sessions::mark_accepted(self.db()?, session_id, professional_id, joined_at).await
    }

    async fn mark_declined(
        &self,
        session_id: &str,
        professional_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, HandoffError> {
        queries::sessions::mark_declined(self.db()?, session_id, professional_id, at).await
    }

    async fn mark_ended(
        &self,
        session_id: &str,
        ended_by: EndedBy,
        reason: Option<&str>,
        ended_at: DateTime<Utc>,
    ) -> Result<bool, HandoffError> {
        queries::sessions::mark_ended(self.db()?, session_id, ended_by, reason, ended_at).await
    }

    async fn transfer_session(&self, transfer: &SessionTransfer) -> Result<bool, HandoffError> {
        queries::sessions::transfer_session(self.db()?, transfer).await
    }

    // --- Escalation rules ---

    async fn upsert_rule(&self, rule: &EscalationRule) -> Result<(), HandoffError> {
        queries::rules::upsert_rule(self.db()?, rule).await
    }

    async fn rules_for_role(&self, role_id: &str) -> Result<Vec<EscalationRule>, HandoffError> {
        queries::rules::rules_for_role(self.db()?, role_id).await
    }

    // --- Escalation events ---

    async fn insert_event(&self, event: &EscalationEvent) -> Result<(), HandoffError> {
        queries::events::insert_event(self.db()?, event).await
    }

    async fn get_event(&self, id: &str) -> Result<Option<EscalationEvent>, HandoffError> {
        queries::events::get_event(self.db()?, id).await
    }

    async fn events_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<EscalationEvent>, HandoffError> {
        queries::events::events_for_session(self.db()?, session_id).await
    }

    async fn resolve_event(
        &self,
        id: &str,
        result: EventResult,
        user_confirmed: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, HandoffError> {
        queries::events::resolve_event(self.db()?, id, result, user_confirmed, at).await
    }

    // --- Conversation messages ---

    async fn append_message(&self, message: &ConversationMessage) -> Result<(), HandoffError> {
        queries::messages::append_message(self.db()?, message).await
    }

    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationMessage>, HandoffError> {
        queries::messages::recent_messages(self.db()?, conversation_id, limit).await
    }

    async fn last_message_at(
        &self,
        conversation_id: &str,
        sender_id: Option<&str>,
    ) -> Result<Option<DateTime<Utc>>, HandoffError> {
        queries::messages::last_message_at(self.db()?, conversation_id, sender_id).await
    }
}

#[async_trait]
impl ProfessionalDirectory for SqliteStore {
    async fn upsert_role(&self, role: &ProfessionalRole) -> Result<(), HandoffError> {
        queries::professionals::upsert_role(self.db()?, role).await
    }

    async fn get_role(&self, id: &str) -> Result<Option<ProfessionalRole>, HandoffError> {
        queries::professionals::get_role(self.db()?, id).await
    }

    async fn roles_in_category(
        &self,
        category: &str,
    ) -> Result<Vec<ProfessionalRole>, HandoffError> {
        queries::professionals::roles_in_category(self.db()?, category).await
    }

    async fn upsert_profile(&self, profile: &ProfessionalProfile) -> Result<(), HandoffError> {
        queries::professionals::upsert_profile(self.db()?, profile).await
    }

    async fn get_profile(&self, id: &str) -> Result<Option<ProfessionalProfile>, HandoffError> {
        queries::professionals::get_profile(self.db()?, id).await
    }

    async fn candidates_for_role(&self, role_id: &str) -> Result<Vec<Candidate>, HandoffError> {
        queries::professionals::candidates_for_role(self.db()?, role_id).await
    }

    async fn get_status(
        &self,
        professional_id: &str,
    ) -> Result<Option<ProfessionalStatus>, HandoffError> {
        queries::professionals::get_status(self.db()?, professional_id).await
    }

    async fn record_presence(
        &self,
        professional_id: &str,
        status: PresenceStatus,
        seen_at: DateTime<Utc>,
    ) -> Result<(), HandoffError> {
        queries::professionals::record_presence(self.db()?, professional_id, status, seen_at).await
    }
}
