// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation evaluation and execution.
//!
//! An escalation moves a live session to a different professional in place:
//! the session row keeps its id, goes back to `pending_acceptance` with the
//! new assignee, and its level rises by exactly one. Every attempt is
//! recorded as an `EscalationEvent`. With confirmation required the events
//! stay pending until `accept_escalation` or `decline_escalation`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use handoff_config::model::TimeoutAnchor;
use handoff_core::HandoffError;
use handoff_core::types::{
    EscalationEvent, EscalationRule, EscalationStrategy, EventResult, FallbackRules, Session,
    SessionStatus, SessionTransfer,
};
use handoff_matching::{MatchCriteria, RankedCandidate};
use tracing::{debug, info, warn};

use crate::notify;
use crate::policy::{self, EscalationDecision};
use crate::service::HandoffService;

/// Upper bound on how far back the escalation chain is followed.
const MAX_CHAIN_DEPTH: usize = 64;

/// Result of an escalation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationOutcome {
    /// The session now belongs to the new professional, pending acceptance.
    Transferred {
        session: Session,
        event: EscalationEvent,
    },
    /// Offers were created and wait for an explicit accept or decline.
    AwaitingConfirmation { events: Vec<EscalationEvent> },
    /// Offers for the next level were already pending; nothing new was done.
    AlreadyOffered { events: Vec<EscalationEvent> },
    /// Scoring and fallback found nobody.
    NoCandidates,
}

impl HandoffService {
    /// Evaluate the escalation rules for a session at the current time.
    pub async fn evaluate_escalation(
        &self,
        session_id: &str,
    ) -> Result<EscalationDecision, HandoffError> {
        let session = self.load_session(session_id).await?;
        if !session.status.is_live() {
            return Ok(EscalationDecision::no_escalation());
        }
        let rules = self.store.rules_for_role(&session.role_id).await?;
        let anchor = self.timeout_anchor(&session).await?;
        Ok(policy::evaluate(&rules, &session, anchor, self.now()))
    }

    /// Escalate a live session to a different professional.
    ///
    /// The governing rule is the one that fires, or else the highest-priority
    /// rule with attempts left. `Conflict` when no rule allows another
    /// hand-off. Nobody eligible is reported as
    /// [`EscalationOutcome::NoCandidates`] after telling the user.
    pub async fn escalate_session(
        &self,
        session_id: &str,
        reason: &str,
        require_confirmation: bool,
    ) -> Result<EscalationOutcome, HandoffError> {
        let session = self.load_session(session_id).await?;
        ensure_live(&session)?;

        let rules = self.store.rules_for_role(&session.role_id).await?;
        let anchor = self.timeout_anchor(&session).await?;
        let decision = policy::evaluate(&rules, &session, anchor, self.now());
        let rule = match decision.rule {
            Some(rule) => rule,
            None => policy::first_applicable(&rules, session.escalation_level)
                .cloned()
                .ok_or_else(|| {
                    HandoffError::Conflict(format!(
                        "session {} has no escalation rule allowing level {}",
                        session.id,
                        session.escalation_level + 1
                    ))
                })?,
        };

        self.execute_escalation(&session, &rule, reason, require_confirmation, true)
            .await
    }

    /// Confirm a pending escalation event: the session moves to the event's
    /// professional and its level rises by one.
    pub async fn accept_escalation(
        &self,
        session_id: &str,
        professional_id: &str,
        event_id: &str,
    ) -> Result<bool, HandoffError> {
        let event = self.load_event(event_id).await?;
        if event.session_id != session_id {
            return Err(HandoffError::NotFound {
                entity: "escalation event",
                id: format!("{event_id} for session {session_id}"),
            });
        }
        if event.to_professional_id != professional_id {
            return Err(HandoffError::Unauthorized {
                actor: format!("professional:{professional_id}"),
                session_id: session_id.to_string(),
            });
        }
        if event.result != EventResult::Pending {
            return Err(HandoffError::InvalidState {
                session_id: session_id.to_string(),
                expected: format!("pending escalation event {event_id}"),
                actual: event.result.to_string(),
            });
        }

        let now = self.now();
        let transfer = SessionTransfer {
            session_id: session_id.to_string(),
            from_professional_id: event.from_professional_id.clone(),
            to_professional_id: event.to_professional_id.clone(),
            expected_level: event.escalation_level.saturating_sub(1),
            reason: event.reason.clone(),
            at: now,
        };
        if !self.store.transfer_session(&transfer).await? {
            self.store
                .resolve_event(event_id, EventResult::Declined, false, now)
                .await?;
            return Err(HandoffError::Conflict(format!(
                "session {session_id} changed before escalation event {event_id} was accepted"
            )));
        }
        self.store
            .resolve_event(event_id, EventResult::Accepted, true, now)
            .await?;
        self.withdraw_offers(session_id, Some(event_id)).await;

        info!(
            session_id,
            event_id,
            from = %event.from_professional_id,
            to = %event.to_professional_id,
            escalation_level = event.escalation_level,
            "escalation accepted"
        );
        let session = self.load_session(session_id).await?;
        self.deliver(notify::requesting_new_professional(&session)).await;
        Ok(true)
    }

    /// Turn down a pending escalation event.
    pub async fn decline_escalation(
        &self,
        event_id: &str,
        reason: Option<&str>,
    ) -> Result<bool, HandoffError> {
        let event = self.load_event(event_id).await?;
        if !self
            .store
            .resolve_event(event_id, EventResult::Declined, false, self.now())
            .await?
        {
            return Err(HandoffError::InvalidState {
                session_id: event.session_id,
                expected: format!("pending escalation event {event_id}"),
                actual: "resolved".to_string(),
            });
        }
        info!(
            session_id = %event.session_id,
            event_id,
            reason = reason.unwrap_or_default(),
            "escalation declined"
        );
        Ok(true)
    }

    /// Run one escalation under `rule`. `notify_when_empty` controls whether
    /// the user hears about an empty candidate pool.
    pub(crate) async fn execute_escalation(
        &self,
        session: &Session,
        rule: &EscalationRule,
        reason: &str,
        require_confirmation: bool,
        notify_when_empty: bool,
    ) -> Result<EscalationOutcome, HandoffError> {
        let next_level = session.escalation_level + 1;

        let pending: Vec<EscalationEvent> = self
            .store
            .events_for_session(&session.id)
            .await?
            .into_iter()
            .filter(|e| e.result == EventResult::Pending && e.escalation_level == next_level)
            .collect();
        if !pending.is_empty() {
            debug!(
                session_id = %session.id,
                offers = pending.len(),
                "escalation already awaiting confirmation"
            );
            return Ok(EscalationOutcome::AlreadyOffered { events: pending });
        }

        let criteria = self.replacement_criteria(session).await?;
        let ranked = self
            .find_with_fallback(
                criteria,
                &rule.fallback_rules,
                self.config.matching.escalation_candidate_limit,
            )
            .await?;
        if ranked.is_empty() {
            info!(
                session_id = %session.id,
                rule_id = %rule.id,
                escalation_level = session.escalation_level,
                "no replacement professional available"
            );
            if notify_when_empty {
                self.deliver(notify::no_professional_available(session)).await;
            }
            return Ok(EscalationOutcome::NoCandidates);
        }

        let confirm = require_confirmation
            || rule.require_user_confirmation
            || rule.escalation_strategy == EscalationStrategy::Broadcast;
        let targets = policy::select_targets(
            rule.escalation_strategy,
            &ranked,
            session.escalation_level,
            self.config.escalation.broadcast_fanout,
        );

        let now = self.now();
        let mut events = Vec::with_capacity(targets.len());
        for target in &targets {
            let event = EscalationEvent {
                id: uuid::Uuid::new_v4().to_string(),
                session_id: session.id.clone(),
                rule_id: Some(rule.id.clone()),
                from_professional_id: session.professional_id.clone(),
                to_professional_id: target.professional_id().to_string(),
                escalation_level: next_level,
                reason: reason.to_string(),
                user_notified: true,
                user_confirmed: false,
                result: EventResult::Pending,
                created_at: now,
                resolved_at: None,
            };
            self.store.insert_event(&event).await?;
            events.push(event);
        }

        if confirm {
            self.offer(session, rule, &targets, &events).await;
            return Ok(EscalationOutcome::AwaitingConfirmation { events });
        }

        let Some(event) = events.into_iter().next() else {
            return Ok(EscalationOutcome::NoCandidates);
        };
        let transfer = SessionTransfer {
            session_id: session.id.clone(),
            from_professional_id: session.professional_id.clone(),
            to_professional_id: event.to_professional_id.clone(),
            expected_level: session.escalation_level,
            reason: reason.to_string(),
            at: now,
        };
        if !self.store.transfer_session(&transfer).await? {
            self.store
                .resolve_event(&event.id, EventResult::Declined, false, now)
                .await?;
            return Err(HandoffError::Conflict(format!(
                "session {} changed while escalating",
                session.id
            )));
        }
        self.store
            .resolve_event(&event.id, EventResult::Accepted, false, now)
            .await?;

        info!(
            session_id = %session.id,
            rule_id = %rule.id,
            strategy = %rule.escalation_strategy,
            from = %event.from_professional_id,
            to = %event.to_professional_id,
            escalation_level = next_level,
            reason,
            "session escalated"
        );
        let session = self.load_session(&session.id).await?;
        self.deliver(notify::requesting_new_professional(&session)).await;
        let event = self.load_event(&event.id).await?;
        Ok(EscalationOutcome::Transferred { session, event })
    }

    /// Ask the user to confirm and, under broadcast, offer the hand-off to
    /// each target.
    async fn offer(
        &self,
        session: &Session,
        rule: &EscalationRule,
        targets: &[&RankedCandidate],
        events: &[EscalationEvent],
    ) {
        let names: Vec<String> = targets
            .iter()
            .map(|t| t.candidate.profile.display_name.clone())
            .collect();
        self.deliver(notify::confirmation_requested(session, &names)).await;

        if rule.escalation_strategy == EscalationStrategy::Broadcast {
            let role_name = self.role_name(&session.role_id).await;
            for event in events {
                self.deliver(notify::escalation_offered(
                    session,
                    &event.to_professional_id,
                    &role_name,
                ))
                .await;
            }
        }
        info!(
            session_id = %session.id,
            rule_id = %rule.id,
            strategy = %rule.escalation_strategy,
            offers = events.len(),
            "escalation awaiting confirmation"
        );
    }

    /// Search with the primary criteria, then once more with the relaxed
    /// fallback criteria if nothing was found.
    pub(crate) async fn find_with_fallback(
        &self,
        criteria: MatchCriteria,
        fallback: &FallbackRules,
        limit: usize,
    ) -> Result<Vec<RankedCandidate>, HandoffError> {
        let ranked = self.scorer.find_matches(&criteria, limit).await?;
        if !ranked.is_empty() || !fallback.enabled {
            return Ok(ranked);
        }

        let mut relaxed = criteria;
        if fallback.drop_location {
            relaxed.location = None;
        }
        if fallback.drop_min_rating {
            relaxed.min_rating = None;
        }
        if fallback.online_only {
            relaxed.online_only = true;
        }

        let mut roles = vec![relaxed.role_id.clone()];
        if fallback.widen_to_category
            && let Some(role) = self.directory.get_role(&relaxed.role_id).await?
        {
            for sibling in self.directory.roles_in_category(&role.category).await? {
                if !roles.contains(&sibling.id) {
                    roles.push(sibling.id);
                }
            }
        }

        debug!(
            role_id = %relaxed.role_id,
            roles = roles.len(),
            online_only = relaxed.online_only,
            "primary search empty, retrying with fallback criteria"
        );
        self.scorer
            .find_matches_in_roles(&roles, &relaxed, limit)
            .await
    }

    /// Professionals that must not be offered this session again: the current
    /// assignee, everyone assigned earlier in the re-match chain, and everyone
    /// who already answered an escalation offer.
    pub(crate) async fn chain_exclusions(
        &self,
        session: &Session,
    ) -> Result<Vec<String>, HandoffError> {
        let mut excluded = Vec::new();
        let mut seen = HashSet::new();
        let mut push = |id: &str, excluded: &mut Vec<String>| {
            if seen.insert(id.to_string()) {
                excluded.push(id.to_string());
            }
        };

        let mut current = Some(session.clone());
        let mut visited = HashSet::new();
        while let Some(link) = current.take() {
            if !visited.insert(link.id.clone()) || visited.len() > MAX_CHAIN_DEPTH {
                break;
            }
            push(&link.professional_id, &mut excluded);
            for event in self.store.events_for_session(&link.id).await? {
                push(&event.from_professional_id, &mut excluded);
                if event.result != EventResult::Pending {
                    push(&event.to_professional_id, &mut excluded);
                }
            }
            current = match &link.parent_session_id {
                Some(parent_id) => self.store.get_session(parent_id).await?,
                None => None,
            };
        }
        Ok(excluded)
    }

    /// The instant a timeout rule measures from.
    pub(crate) async fn timeout_anchor(
        &self,
        session: &Session,
    ) -> Result<DateTime<Utc>, HandoffError> {
        let base = session.professional_joined_at.unwrap_or(session.assigned_at);
        match self.config.monitor.timeout_anchor {
            TimeoutAnchor::Joined => Ok(base),
            TimeoutAnchor::LastProfessionalReply => {
                let last_reply = self
                    .store
                    .last_message_at(&session.conversation_id, Some(&session.professional_id))
                    .await?;
                Ok(last_reply.map_or(base, |reply| reply.max(base)))
            }
        }
    }

    async fn load_event(&self, event_id: &str) -> Result<EscalationEvent, HandoffError> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or_else(|| HandoffError::NotFound {
                entity: "escalation event",
                id: event_id.to_string(),
            })
    }
}

fn ensure_live(session: &Session) -> Result<(), HandoffError> {
    if session.status.is_live() {
        Ok(())
    } else {
        warn!(
            session_id = %session.id,
            status = %session.status,
            "escalation of a closed session"
        );
        Err(HandoffError::InvalidState {
            session_id: session.id.clone(),
            expected: format!(
                "{} or {}",
                SessionStatus::PendingAcceptance,
                SessionStatus::Active
            ),
            actual: session.status.to_string(),
        })
    }
}
