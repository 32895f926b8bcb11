// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The service facade the hosting application talks to.
//!
//! `HandoffService` owns the collaborators and the configuration. The
//! lifecycle, escalation, and monitor operations are implemented in their own
//! modules as further `impl HandoffService` blocks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use handoff_config::model::HandoffConfig;
use handoff_core::types::{
    ConversationMessage, HealthStatus, Notification, PresenceStatus, SenderKind, Session,
    SessionStatus,
};
use handoff_core::{
    Clock, HandoffError, Notifier, PluginAdapter, ProfessionalDirectory, SessionStore,
    SystemClock, TextGenerator,
};
use handoff_matching::{MatchCriteria, MatchScorer, RankedCandidate};
use tracing::{debug, info, warn};

use crate::detector::{DetectionResult, NonAgreementDetector};
use crate::lifecycle::NewSession;
use crate::policy;

/// A user asking for a professional of some role, before one is chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct HelpRequest {
    pub conversation_id: String,
    pub user_id: String,
    pub role_id: String,
    pub consent: bool,
    pub summary: Option<String>,
    pub location: Option<String>,
    pub min_rating: Option<f64>,
}

/// Hand-off orchestration over a store, a directory, and delivery.
pub struct HandoffService {
    pub(crate) store: Arc<dyn SessionStore>,
    pub(crate) directory: Arc<dyn ProfessionalDirectory>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) generator: Option<Arc<dyn TextGenerator>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) scorer: MatchScorer,
    pub(crate) detector: NonAgreementDetector,
    pub(crate) config: HandoffConfig,
}

impl HandoffService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn ProfessionalDirectory>,
        notifier: Arc<dyn Notifier>,
        config: HandoffConfig,
    ) -> Self {
        Self {
            scorer: MatchScorer::new(directory.clone()),
            detector: NonAgreementDetector::from_config(&config.detector),
            store,
            directory,
            notifier,
            generator: None,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Use a text generator for hand-off summaries and suggestions.
    pub fn with_text_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Replace the wall clock (tests drive time explicitly).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &HandoffConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn directory(&self) -> &Arc<dyn ProfessionalDirectory> {
        &self.directory
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Ranked candidates for `criteria`; `limit` defaults to
    /// `matching.default_limit`.
    pub async fn find_matches(
        &self,
        criteria: &MatchCriteria,
        limit: Option<usize>,
    ) -> Result<Vec<RankedCandidate>, HandoffError> {
        let limit = limit.unwrap_or(self.config.matching.default_limit);
        self.scorer.find_matches(criteria, limit).await
    }

    /// Match the best professional for a help request and open a session
    /// with them.
    pub async fn request_professional(
        &self,
        request: HelpRequest,
    ) -> Result<Session, HandoffError> {
        let rules = self.store.rules_for_role(&request.role_id).await?;
        let fallback = policy::first_applicable(&rules, 0)
            .map(|rule| rule.fallback_rules.clone())
            .unwrap_or_default();

        let mut criteria = MatchCriteria::for_role(&request.role_id);
        if let Some(location) = &request.location {
            criteria = criteria.near(location);
        }
        if let Some(rating) = request.min_rating {
            criteria = criteria.with_min_rating(rating);
        }

        let best = self
            .find_with_fallback(criteria, &fallback, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| HandoffError::NoCandidates {
                role_id: request.role_id.clone(),
            })?;

        self.create_session(NewSession {
            conversation_id: request.conversation_id,
            user_id: request.user_id,
            professional_id: best.professional_id().to_string(),
            role_id: request.role_id,
            consent: request.consent,
            summary: request.summary,
            user_location: request.location,
        })
        .await
    }

    /// Presence heartbeat for a known professional.
    pub async fn record_presence(
        &self,
        professional_id: &str,
        status: PresenceStatus,
    ) -> Result<(), HandoffError> {
        if self.directory.get_profile(professional_id).await?.is_none() {
            return Err(HandoffError::NotFound {
                entity: "professional",
                id: professional_id.to_string(),
            });
        }
        self.directory
            .record_presence(professional_id, status, self.now())
            .await?;
        debug!(professional_id, %status, "presence recorded");
        Ok(())
    }

    /// Record a conversation turn; the inactivity monitor and the detector
    /// read these.
    pub async fn append_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        sender_kind: SenderKind,
        content: &str,
    ) -> Result<ConversationMessage, HandoffError> {
        let message = ConversationMessage {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_kind,
            content: content.to_string(),
            created_at: self.now(),
        };
        self.store.append_message(&message).await?;
        Ok(message)
    }

    /// Run the non-agreement detector over the conversation's recent turns.
    pub async fn detect_non_agreement(
        &self,
        conversation_id: &str,
    ) -> Result<DetectionResult, HandoffError> {
        if !self.config.detector.enabled {
            return Ok(DetectionResult::default());
        }
        let messages = self
            .store
            .recent_messages(conversation_id, self.detector.window())
            .await?;
        let result = self
            .detector
            .detect(&messages, self.generator.as_deref())
            .await;
        if result.should_escalate {
            info!(
                conversation_id,
                phrase = result.matched_phrase.as_deref().unwrap_or_default(),
                "dissatisfaction signal detected"
            );
        }
        Ok(result)
    }

    /// Health of every collaborator, by adapter name.
    pub async fn health(&self) -> Vec<(String, HealthStatus)> {
        fn status(result: Result<HealthStatus, HandoffError>) -> HealthStatus {
            result.unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()))
        }

        let mut report = vec![
            (
                self.store.name().to_string(),
                status(self.store.health_check().await),
            ),
            (
                self.directory.name().to_string(),
                status(self.directory.health_check().await),
            ),
            (
                self.notifier.name().to_string(),
                status(self.notifier.health_check().await),
            ),
        ];
        if let Some(generator) = &self.generator {
            report.push((
                generator.name().to_string(),
                status(generator.health_check().await),
            ));
        }
        report
    }

    pub(crate) async fn load_session(&self, session_id: &str) -> Result<Session, HandoffError> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| HandoffError::session_not_found(session_id))
    }

    /// Best-effort delivery. State changes are already committed when this
    /// runs, so a failing notifier is logged and not propagated.
    pub(crate) async fn deliver(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!(
                kind = %notification.kind,
                conversation_id = %notification.conversation_id,
                error = %e,
                "notification delivery failed"
            );
        }
    }

    /// Display name of a role, falling back to its id.
    pub(crate) async fn role_name(&self, role_id: &str) -> String {
        match self.directory.get_role(role_id).await {
            Ok(Some(role)) => role.name,
            _ => role_id.to_string(),
        }
    }

    /// Summary for the professional taking over, if a generator is wired.
    pub(crate) async fn generate_summary(&self, conversation_id: &str) -> Option<String> {
        let generator = self.generator.as_ref()?;
        let transcript = match self
            .store
            .recent_messages(conversation_id, self.config.detector.window)
            .await
        {
            Ok(messages) if !messages.is_empty() => messages,
            Ok(_) => return None,
            Err(e) => {
                warn!(conversation_id, error = %e, "could not load transcript for summary");
                return None;
            }
        };
        match generator.summarize(&transcript).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(conversation_id, error = %e, "summary generation failed");
                None
            }
        }
    }
}

/// `InvalidState` for a session that is not in the state an operation needs.
pub(crate) fn wrong_state(session: &Session, expected: SessionStatus) -> HandoffError {
    HandoffError::InvalidState {
        session_id: session.id.clone(),
        expected: expected.to_string(),
        actual: session.status.to_string(),
    }
}
