// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic sweeps over stalled and silent sessions.
//!
//! Both sweeps are stateless and safe to re-run: every candidate row is
//! re-read and re-checked before anything is done to it, and a failure on one
//! session is logged and counted without stopping the sweep.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use handoff_core::HandoffError;
use handoff_core::types::{EndedBy, SessionStatus};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::escalation::EscalationOutcome;
use crate::lifecycle::RematchOutcome;
use crate::notify;
use crate::service::HandoffService;

const INACTIVITY_REASON: &str = "inactivity";

/// Which sweep produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    Timeout,
    Inactivity,
}

/// Counters from one sweep run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub kind: SweepKind,
    /// Sessions selected by the sweep query.
    pub examined: usize,
    /// Sessions escalated (timeout) or ended (inactivity).
    pub acted: usize,
    /// Sessions now waiting on a different professional.
    pub reassigned: usize,
    /// Sessions for which no replacement was found.
    pub unmatched: usize,
    pub failures: usize,
}

impl SweepReport {
    pub fn new(kind: SweepKind) -> Self {
        Self {
            kind,
            examined: 0,
            acted: 0,
            reassigned: 0,
            unmatched: 0,
            failures: 0,
        }
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, verb) = match self.kind {
            SweepKind::Timeout => ("timeout", "escalated"),
            SweepKind::Inactivity => ("inactivity", "ended"),
        };
        write!(
            f,
            "{name} sweep: {} examined, {} {verb}, {} reassigned, {} unmatched, {} failed",
            self.examined, self.acted, self.reassigned, self.unmatched, self.failures
        )
    }
}

/// What happened to one session during a sweep.
enum Step {
    Skipped,
    Escalated { reassigned: bool },
    Unmatched,
    Ended(Option<RematchOutcome>),
}

fn seconds_before(now: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn elapsed_at_least(since: DateTime<Utc>, now: DateTime<Utc>, secs: u64) -> bool {
    (now - since).num_seconds() >= i64::try_from(secs).unwrap_or(i64::MAX)
}

impl HandoffService {
    /// Escalate sessions that have waited for acceptance past the grace
    /// window and whose rules say so. Hand-offs happen without asking the
    /// user unless the governing rule itself requires confirmation.
    pub async fn run_timeout_sweep(&self) -> Result<SweepReport, HandoffError> {
        let cutoff = seconds_before(self.now(), self.config.monitor.pending_grace_secs);
        let sessions = self.store.pending_sessions_assigned_before(cutoff).await?;

        let mut report = SweepReport::new(SweepKind::Timeout);
        for session in sessions {
            report.examined += 1;
            match self.check_pending(&session.id, cutoff).await {
                Ok(Step::Escalated { reassigned }) => {
                    report.acted += 1;
                    if reassigned {
                        report.reassigned += 1;
                    }
                }
                Ok(Step::Unmatched) => report.unmatched += 1,
                Ok(_) => {}
                Err(e) => {
                    report.failures += 1;
                    warn!(session_id = %session.id, error = %e, "timeout check failed");
                }
            }
        }

        if report.examined > 0 {
            info!(%report, "timeout sweep finished");
        } else {
            debug!("timeout sweep found no stalled sessions");
        }
        Ok(report)
    }

    async fn check_pending(
        &self,
        session_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Step, HandoffError> {
        let session = self.load_session(session_id).await?;
        if session.status != SessionStatus::PendingAcceptance || session.assigned_at > cutoff {
            debug!(session_id, status = %session.status, "session moved on, skipping");
            return Ok(Step::Skipped);
        }

        let rules = self.store.rules_for_role(&session.role_id).await?;
        let anchor = self.timeout_anchor(&session).await?;
        let decision = crate::policy::evaluate(&rules, &session, anchor, self.now());
        let (Some(rule), Some(reason)) = (decision.rule, decision.reason) else {
            debug!(
                session_id,
                escalation_level = session.escalation_level,
                "no rule fires"
            );
            return Ok(Step::Skipped);
        };

        let outcome = self
            .execute_escalation(
                &session,
                &rule,
                &reason,
                rule.require_user_confirmation,
                false,
            )
            .await?;
        Ok(match outcome {
            EscalationOutcome::Transferred { .. } => Step::Escalated { reassigned: true },
            EscalationOutcome::AwaitingConfirmation { .. } => {
                Step::Escalated { reassigned: false }
            }
            EscalationOutcome::AlreadyOffered { .. } => Step::Skipped,
            EscalationOutcome::NoCandidates => Step::Unmatched,
        })
    }

    /// End active sessions that have been silent for the inactivity
    /// threshold, then try to reassign each one.
    pub async fn run_inactivity_sweep(&self) -> Result<SweepReport, HandoffError> {
        let sessions = self.store.active_joined_sessions().await?;

        let mut report = SweepReport::new(SweepKind::Inactivity);
        for session in sessions {
            report.examined += 1;
            match self.check_inactive(&session.id).await {
                Ok(Step::Ended(rematch)) => {
                    report.acted += 1;
                    match rematch {
                        Some(RematchOutcome::Reassigned(_)) => report.reassigned += 1,
                        Some(RematchOutcome::NoneAvailable) => report.unmatched += 1,
                        None => report.failures += 1,
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    report.failures += 1;
                    warn!(session_id = %session.id, error = %e, "inactivity check failed");
                }
            }
        }

        if report.examined > 0 {
            info!(%report, "inactivity sweep finished");
        } else {
            debug!("inactivity sweep found no active sessions");
        }
        Ok(report)
    }

    async fn check_inactive(&self, session_id: &str) -> Result<Step, HandoffError> {
        let session = self.load_session(session_id).await?;
        let Some(joined_at) = session.professional_joined_at else {
            return Ok(Step::Skipped);
        };
        if session.status != SessionStatus::Active {
            return Ok(Step::Skipped);
        }

        let last_message = self
            .store
            .last_message_at(&session.conversation_id, None)
            .await?;
        let last_activity = last_message.map_or(joined_at, |at| at.max(joined_at));
        let now = self.now();
        if !elapsed_at_least(last_activity, now, self.config.monitor.inactivity_threshold_secs) {
            return Ok(Step::Skipped);
        }

        if !self
            .store
            .mark_ended(session_id, EndedBy::System, Some(INACTIVITY_REASON), now)
            .await?
        {
            debug!(session_id, "session already closed, skipping");
            return Ok(Step::Skipped);
        }
        self.withdraw_offers(session_id, None).await;
        info!(
            session_id,
            professional_id = %session.professional_id,
            idle_secs = (now - last_activity).num_seconds(),
            ended_by = %EndedBy::System,
            "session ended for inactivity"
        );
        self.deliver(notify::session_ended(&session, Some(INACTIVITY_REASON))).await;

        let ended = self.load_session(session_id).await?;
        let reason = format!("{} was inactive", session.professional_id);
        match self.rematch(&ended, &reason).await {
            Ok(outcome) => Ok(Step::Ended(Some(outcome))),
            Err(e) => {
                warn!(session_id, error = %e, "reassignment after inactivity failed");
                self.deliver(notify::can_request_again(&ended)).await;
                Ok(Step::Ended(None))
            }
        }
    }
}
