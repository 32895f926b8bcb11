// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guarded session transitions.
//!
//! ```text
//! pending_acceptance --accept--> active --end--> ended
//!         |
//!         +--decline--> declined
//! ```
//!
//! Every transition re-checks the caller and the current state, then relies
//! on a compare-and-set in the store so a lost race surfaces as
//! `InvalidState` instead of a double transition.

use handoff_core::HandoffError;
use handoff_core::types::{Actor, EventResult, Session, SessionStatus};
use handoff_matching::MatchCriteria;
use tracing::{info, warn};

use crate::notify;
use crate::policy;
use crate::service::{HandoffService, wrong_state};

/// Parameters of `create_session`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub conversation_id: String,
    pub user_id: String,
    pub professional_id: String,
    pub role_id: String,
    pub consent: bool,
    /// Hand-off summary; generated when absent and a text generator is wired.
    pub summary: Option<String>,
    pub user_location: Option<String>,
}

/// Result of looking for a replacement after a decline or an inactivity end.
#[derive(Debug, Clone, PartialEq)]
pub enum RematchOutcome {
    /// A new pending session was created with the replacement.
    Reassigned(Session),
    /// Nobody eligible; the user was told no professional is available.
    NoneAvailable,
}

impl HandoffService {
    /// Open a session pending acceptance by `request.professional_id`.
    pub async fn create_session(&self, request: NewSession) -> Result<Session, HandoffError> {
        if !request.consent && self.config.escalation.require_consent {
            return Err(HandoffError::Conflict(format!(
                "conversation {} has no user consent for a hand-off",
                request.conversation_id
            )));
        }
        if self
            .directory
            .get_profile(&request.professional_id)
            .await?
            .is_none()
        {
            return Err(HandoffError::NotFound {
                entity: "professional",
                id: request.professional_id,
            });
        }
        if let Some(live) = self
            .store
            .live_session_for_conversation(&request.conversation_id)
            .await?
        {
            return Err(HandoffError::Conflict(format!(
                "conversation {} already has live session {}",
                request.conversation_id, live.id
            )));
        }

        let summary = match request.summary {
            Some(summary) => Some(summary),
            None => self.generate_summary(&request.conversation_id).await,
        };
        let now = self.now();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: request.conversation_id,
            user_id: request.user_id,
            professional_id: request.professional_id,
            role_id: request.role_id,
            status: SessionStatus::PendingAcceptance,
            ai_summary: summary,
            user_consent_given: request.consent,
            consent_given_at: request.consent.then_some(now),
            professional_joined_at: None,
            professional_ended_at: None,
            escalation_level: 0,
            escalation_reason: None,
            ai_observer_mode: false,
            ended_by: None,
            ended_reason: None,
            user_location: request.user_location,
            parent_session_id: None,
            assigned_at: now,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_session(&session).await?;

        info!(
            session_id = %session.id,
            conversation_id = %session.conversation_id,
            professional_id = %session.professional_id,
            role_id = %session.role_id,
            "session created, awaiting acceptance"
        );
        Ok(session)
    }

    /// The assigned professional joins: pending_acceptance -> active.
    pub async fn accept_session(
        &self,
        session_id: &str,
        professional_id: &str,
    ) -> Result<bool, HandoffError> {
        let session = self.load_session(session_id).await?;
        ensure_assigned(&session, professional_id)?;
        if session.status != SessionStatus::PendingAcceptance {
            return Err(wrong_state(&session, SessionStatus::PendingAcceptance));
        }

        let now = self.now();
        if !self
            .store
            .mark_accepted(session_id, professional_id, now)
            .await?
        {
            return Err(self.lost_race(session_id, SessionStatus::PendingAcceptance).await);
        }
        // Open offers to other professionals lapse once the assignee joins.
        self.withdraw_offers(session_id, None).await;

        info!(
            session_id,
            professional_id,
            escalation_level = session.escalation_level,
            "professional joined session"
        );

        let professional_name = match self.directory.get_profile(professional_id).await {
            Ok(Some(profile)) => profile.display_name,
            _ => professional_id.to_string(),
        };
        let role_name = self.role_name(&session.role_id).await;
        self.deliver(notify::professional_joined(
            &session,
            &professional_name,
            &role_name,
        ))
        .await;
        Ok(true)
    }

    /// The assigned professional passes: pending_acceptance -> declined,
    /// followed by an automatic re-match.
    pub async fn decline_session(
        &self,
        session_id: &str,
        professional_id: &str,
    ) -> Result<RematchOutcome, HandoffError> {
        let session = self.load_session(session_id).await?;
        ensure_assigned(&session, professional_id)?;
        if session.status != SessionStatus::PendingAcceptance {
            return Err(wrong_state(&session, SessionStatus::PendingAcceptance));
        }

        if !self
            .store
            .mark_declined(session_id, professional_id, self.now())
            .await?
        {
            return Err(self.lost_race(session_id, SessionStatus::PendingAcceptance).await);
        }
        self.withdraw_offers(session_id, None).await;
        info!(session_id, professional_id, "session declined");

        let declined = self.load_session(session_id).await?;
        match self
            .rematch(&declined, &format!("declined by {professional_id}"))
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // The decline is already committed; the user still hears back.
                warn!(session_id, error = %e, "re-match after decline failed");
                self.deliver(notify::no_professional_available(&declined))
                    .await;
                Ok(RematchOutcome::NoneAvailable)
            }
        }
    }

    /// End an active session on behalf of `actor`.
    pub async fn end_session(
        &self,
        session_id: &str,
        actor: &Actor,
        reason: Option<&str>,
    ) -> Result<bool, HandoffError> {
        let session = self.load_session(session_id).await?;
        let allowed = match actor {
            Actor::User(id) => *id == session.user_id,
            Actor::Professional(id) => *id == session.professional_id,
            Actor::System | Actor::Admin(_) => true,
        };
        if !allowed {
            return Err(HandoffError::Unauthorized {
                actor: actor.to_string(),
                session_id: session_id.to_string(),
            });
        }
        if session.status != SessionStatus::Active {
            return Err(wrong_state(&session, SessionStatus::Active));
        }

        if !self
            .store
            .mark_ended(session_id, actor.ended_by(), reason, self.now())
            .await?
        {
            return Err(self.lost_race(session_id, SessionStatus::Active).await);
        }
        self.withdraw_offers(session_id, None).await;

        info!(
            session_id,
            professional_id = %session.professional_id,
            ended_by = %actor.ended_by(),
            reason = reason.unwrap_or_default(),
            "session ended"
        );
        self.deliver(notify::session_ended(&session, reason)).await;
        Ok(true)
    }

    /// Find a replacement for a session that just became terminal and open
    /// a new pending session one level up. Exactly one notification is sent:
    /// "requesting a new professional" or "no professional available".
    pub(crate) async fn rematch(
        &self,
        previous: &Session,
        reason: &str,
    ) -> Result<RematchOutcome, HandoffError> {
        let rules = self.store.rules_for_role(&previous.role_id).await?;
        let fallback = if rules.is_empty() {
            Some(Default::default())
        } else {
            policy::first_applicable(&rules, previous.escalation_level)
                .map(|rule| rule.fallback_rules.clone())
        };

        let replacement = match fallback {
            Some(fallback) => {
                let criteria = self.replacement_criteria(previous).await?;
                self.find_with_fallback(criteria, &fallback, 1)
                    .await?
                    .into_iter()
                    .next()
            }
            None => {
                info!(
                    session_id = %previous.id,
                    escalation_level = previous.escalation_level,
                    "escalation attempts exhausted, not re-matching"
                );
                None
            }
        };

        let Some(replacement) = replacement else {
            self.deliver(notify::no_professional_available(previous)).await;
            return Ok(RematchOutcome::NoneAvailable);
        };

        let now = self.now();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            professional_id: replacement.professional_id().to_string(),
            status: SessionStatus::PendingAcceptance,
            professional_joined_at: None,
            professional_ended_at: None,
            escalation_level: previous.escalation_level + 1,
            escalation_reason: Some(reason.to_string()),
            ai_observer_mode: false,
            ended_by: None,
            ended_reason: None,
            parent_session_id: Some(previous.id.clone()),
            assigned_at: now,
            created_at: now,
            updated_at: now,
            ..previous.clone()
        };
        self.store.insert_session(&session).await?;

        info!(
            session_id = %session.id,
            parent_session_id = %previous.id,
            professional_id = %session.professional_id,
            escalation_level = session.escalation_level,
            score = replacement.score,
            "re-matched to a new professional"
        );
        self.deliver(notify::requesting_new_professional(&session)).await;
        Ok(RematchOutcome::Reassigned(session))
    }

    /// Criteria for a replacement one level above `session`, excluding the
    /// whole escalation chain.
    pub(crate) async fn replacement_criteria(
        &self,
        session: &Session,
    ) -> Result<MatchCriteria, HandoffError> {
        let mut criteria =
            MatchCriteria::for_role(&session.role_id).at_level(session.escalation_level + 1);
        for professional_id in self.chain_exclusions(session).await? {
            criteria = criteria.excluding(professional_id);
        }
        if let Some(location) = &session.user_location {
            criteria = criteria.near(location);
        }
        if let Some(rating) = self.config.matching.escalation_min_rating {
            criteria = criteria.with_min_rating(rating);
        }
        Ok(criteria)
    }

    /// Decline every pending escalation event of a session except `keep`.
    pub(crate) async fn withdraw_offers(&self, session_id: &str, keep: Option<&str>) {
        let events = match self.store.events_for_session(session_id).await {
            Ok(events) => events,
            Err(e) => {
                warn!(session_id, error = %e, "could not load escalation events");
                return;
            }
        };
        let now = self.now();
        for event in events
            .iter()
            .filter(|e| e.result == EventResult::Pending && Some(e.id.as_str()) != keep)
        {
            if let Err(e) = self
                .store
                .resolve_event(&event.id, EventResult::Declined, false, now)
                .await
            {
                warn!(event_id = %event.id, error = %e, "could not withdraw escalation offer");
            }
        }
    }

    /// `InvalidState` after a compare-and-set lost to a concurrent change.
    pub(crate) async fn lost_race(
        &self,
        session_id: &str,
        expected: SessionStatus,
    ) -> HandoffError {
        let actual = match self.store.get_session(session_id).await {
            Ok(Some(session)) => session.status.to_string(),
            Ok(None) => "missing".to_string(),
            Err(_) => "unknown".to_string(),
        };
        HandoffError::InvalidState {
            session_id: session_id.to_string(),
            expected: expected.to_string(),
            actual,
        }
    }
}

fn ensure_assigned(session: &Session, professional_id: &str) -> Result<(), HandoffError> {
    if session.professional_id == professional_id {
        Ok(())
    } else {
        Err(HandoffError::Unauthorized {
            actor: Actor::Professional(professional_id.to_string()).to_string(),
            session_id: session.id.clone(),
        })
    }
}
