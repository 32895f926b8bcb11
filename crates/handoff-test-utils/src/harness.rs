// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` wires a [`HandoffService`] to a temp SQLite database, a
//! capturing notifier, a scripted text generator, and a manual clock, and
//! offers seeding helpers for roles, professionals, rules, and messages.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use handoff_config::model::{HandoffConfig, StorageConfig};
use handoff_core::types::{
    ApprovalStatus, ConversationMessage, EscalationRule, EscalationStrategy, FallbackRules,
    PresenceStatus, ProfessionalProfile, ProfessionalRole, SenderKind, Session, TriggerType,
};
use handoff_core::{Clock, HandoffError, ProfessionalDirectory, SessionStore};
use handoff_engine::{HandoffService, NewSession};
use handoff_storage::SqliteStore;

use crate::clock::ManualClock;
use crate::mock_generator::MockTextGenerator;
use crate::mock_notifier::MockNotifier;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: HandoffConfig,
    responses: Vec<String>,
    with_generator: bool,
    start: DateTime<Utc>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            config: HandoffConfig::default(),
            responses: Vec::new(),
            with_generator: true,
            start: Utc
                .with_ymd_and_hms(2026, 1, 2, 9, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }

    /// Start from a custom configuration. The storage section is replaced
    /// by the harness's temp database.
    pub fn with_config(mut self, config: HandoffConfig) -> Self {
        self.config = config;
        self
    }

    /// Queue text generator responses.
    pub fn with_generator_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Build the service without a text generator.
    pub fn without_generator(mut self) -> Self {
        self.with_generator = false;
        self
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = start;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, HandoffError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| HandoffError::Persistence {
            source: Box::new(e),
        })?;
        let db_path = temp_dir.path().join("handoff-test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            wal_mode: true,
        };

        let store = Arc::new(SqliteStore::new(config.storage.clone()));
        store.initialize().await?;

        let notifier = Arc::new(MockNotifier::new());
        let generator = Arc::new(MockTextGenerator::with_responses(self.responses));
        let clock = Arc::new(ManualClock::new(self.start));

        let mut service =
            HandoffService::new(store.clone(), store.clone(), notifier.clone(), config)
                .with_clock(clock.clone());
        if self.with_generator {
            service = service.with_text_generator(generator.clone());
        }

        Ok(TestHarness {
            service,
            store,
            notifier,
            generator,
            clock,
            db_path,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    pub service: HandoffService,
    /// SQLite store, also serving as the professional directory.
    pub store: Arc<SqliteStore>,
    pub notifier: Arc<MockNotifier>,
    pub generator: Arc<MockTextGenerator>,
    pub clock: Arc<ManualClock>,
    db_path: PathBuf,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub async fn new() -> Result<Self, HandoffError> {
        Self::builder().build().await
    }

    /// Path of the temp SQLite file, for tests that need to reach past the
    /// store.
    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    /// Register an active, live-chat role.
    pub async fn seed_role(
        &self,
        id: &str,
        category: &str,
    ) -> Result<ProfessionalRole, HandoffError> {
        let role = ProfessionalRole {
            id: id.to_string(),
            name: id.replace('_', " "),
            category: category.to_string(),
            eligible_for_live_chat: true,
            keywords: Vec::new(),
            is_active: true,
        };
        self.store.upsert_role(&role).await?;
        Ok(role)
    }

    /// Register an approved, active professional who is online now.
    pub async fn seed_professional(
        &self,
        id: &str,
        role_id: &str,
        rating: f64,
    ) -> Result<ProfessionalProfile, HandoffError> {
        let profile = professional(id, role_id, rating);
        self.seed_profile(&profile, PresenceStatus::Online).await?;
        Ok(profile)
    }

    pub async fn seed_profile(
        &self,
        profile: &ProfessionalProfile,
        presence: PresenceStatus,
    ) -> Result<(), HandoffError> {
        self.store.upsert_profile(profile).await?;
        self.store
            .record_presence(&profile.id, presence, self.clock.now())
            .await
    }

    pub async fn seed_rule(&self, rule: &EscalationRule) -> Result<(), HandoffError> {
        self.store.upsert_rule(rule).await
    }

    /// Open a consented session for `professional_id` in the role of its profile.
    pub async fn open_session(
        &self,
        conversation_id: &str,
        professional_id: &str,
    ) -> Result<Session, HandoffError> {
        let profile = self
            .store
            .get_profile(professional_id)
            .await?
            .ok_or_else(|| HandoffError::NotFound {
                entity: "professional",
                id: professional_id.to_string(),
            })?;
        self.service
            .create_session(NewSession {
                conversation_id: conversation_id.to_string(),
                user_id: format!("user-{conversation_id}"),
                professional_id: professional_id.to_string(),
                role_id: profile.role_id,
                consent: true,
                summary: Some("needs help".to_string()),
                user_location: None,
            })
            .await
    }

    /// Open a session and have the professional accept it.
    pub async fn open_active_session(
        &self,
        conversation_id: &str,
        professional_id: &str,
    ) -> Result<Session, HandoffError> {
        let session = self.open_session(conversation_id, professional_id).await?;
        self.service
            .accept_session(&session.id, professional_id)
            .await?;
        self.session(&session.id).await
    }

    pub async fn say(
        &self,
        conversation_id: &str,
        sender_id: &str,
        kind: SenderKind,
        content: &str,
    ) -> Result<ConversationMessage, HandoffError> {
        self.service
            .append_message(conversation_id, sender_id, kind, content)
            .await
    }

    pub async fn session(&self, id: &str) -> Result<Session, HandoffError> {
        self.store
            .get_session(id)
            .await?
            .ok_or_else(|| HandoffError::session_not_found(id))
    }

    /// Current load counter of a professional (0 when no status row exists).
    pub async fn load_of(&self, professional_id: &str) -> Result<u32, HandoffError> {
        Ok(self
            .store
            .get_status(professional_id)
            .await?
            .map_or(0, |s| s.current_session_count))
    }
}

/// An approved, active professional profile with room for three sessions.
pub fn professional(id: &str, role_id: &str, rating: f64) -> ProfessionalProfile {
    ProfessionalProfile {
        id: id.to_string(),
        display_name: format!("Dr. {id}"),
        role_id: role_id.to_string(),
        approval_status: ApprovalStatus::Approved,
        is_active: true,
        online_availability: true,
        max_concurrent_sessions: 3,
        rating_average: rating,
        review_count: 10,
        location: None,
    }
}

/// A global sequential rule with default fallback.
pub fn rule(id: &str, trigger_type: TriggerType, max_escalation_attempts: u32) -> EscalationRule {
    EscalationRule {
        id: id.to_string(),
        role_id: None,
        trigger_type,
        timeout_seconds: 300,
        max_escalation_attempts,
        escalation_strategy: EscalationStrategy::Sequential,
        fallback_rules: FallbackRules::default(),
        require_user_confirmation: false,
        priority: 0,
        is_active: true,
    }
}
