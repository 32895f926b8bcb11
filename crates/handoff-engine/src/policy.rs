// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation rules as data.
//!
//! Each active rule is turned into a [`RulePolicy`] variant and the rules are
//! walked in ascending priority. The first rule that fires wins; rules whose
//! attempt budget the session already used up are skipped. Everything here is
//! pure so the precedence semantics can be tested without a store.

use chrono::{DateTime, Utc};
use handoff_core::types::{EscalationRule, EscalationStrategy, Session, TriggerType};
use serde::Serialize;

/// What a single rule reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulePolicy {
    /// Fires once `timeout_seconds` elapsed since the anchor instant.
    Timeout { timeout_seconds: u64 },
    /// Driven by an explicit request from the user.
    UserRequest,
    /// Driven by the non-agreement detector.
    AiDetection,
    /// Driven by an operator.
    Manual,
}

impl RulePolicy {
    pub fn from_rule(rule: &EscalationRule) -> Self {
        match rule.trigger_type {
            TriggerType::Timeout => RulePolicy::Timeout {
                timeout_seconds: rule.timeout_seconds,
            },
            TriggerType::UserRequest => RulePolicy::UserRequest,
            TriggerType::AiDetection => RulePolicy::AiDetection,
            TriggerType::Manual => RulePolicy::Manual,
        }
    }

    /// The reason this policy fires at `now`, or `None`. Only timeouts fire
    /// on their own; the other triggers arrive as explicit calls.
    pub fn fires(&self, anchor: DateTime<Utc>, now: DateTime<Utc>) -> Option<String> {
        match *self {
            RulePolicy::Timeout { timeout_seconds } => {
                let elapsed = (now - anchor).num_seconds();
                let limit = i64::try_from(timeout_seconds).unwrap_or(i64::MAX);
                (elapsed >= limit)
                    .then(|| format!("no response within {timeout_seconds}s ({elapsed}s elapsed)"))
            }
            RulePolicy::UserRequest | RulePolicy::AiDetection | RulePolicy::Manual => None,
        }
    }
}

/// Outcome of evaluating the rule table against a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EscalationDecision {
    pub should_escalate: bool,
    pub rule: Option<EscalationRule>,
    pub reason: Option<String>,
}

impl EscalationDecision {
    pub fn no_escalation() -> Self {
        Self::default()
    }
}

/// Active rules in evaluation order. The sort is stable, so equal
/// priorities keep the order the store returned them in.
fn ordered(rules: &[EscalationRule]) -> Vec<&EscalationRule> {
    let mut active: Vec<&EscalationRule> = rules.iter().filter(|r| r.is_active).collect();
    active.sort_by_key(|r| r.priority);
    active
}

fn has_attempts_left(rule: &EscalationRule, level: u32) -> bool {
    level < rule.max_escalation_attempts
}

/// Walk the rules in priority order and return the first one that fires.
pub fn evaluate(
    rules: &[EscalationRule],
    session: &Session,
    anchor: DateTime<Utc>,
    now: DateTime<Utc>,
) -> EscalationDecision {
    for rule in ordered(rules) {
        if !has_attempts_left(rule, session.escalation_level) {
            continue;
        }
        if let Some(reason) = RulePolicy::from_rule(rule).fires(anchor, now) {
            return EscalationDecision {
                should_escalate: true,
                rule: Some(rule.clone()),
                reason: Some(reason),
            };
        }
    }
    EscalationDecision::no_escalation()
}

/// The highest-precedence rule that still allows another hand-off at
/// `level`, regardless of its trigger. Governs explicit escalations and
/// re-matches.
pub fn first_applicable(rules: &[EscalationRule], level: u32) -> Option<&EscalationRule> {
    ordered(rules)
        .into_iter()
        .find(|rule| has_attempts_left(rule, level))
}

/// Pick the hand-off targets from a ranked list.
///
/// `level` is the session's current escalation level; round-robin rotates
/// through the ranking with it.
pub fn select_targets<T>(
    strategy: EscalationStrategy,
    ranked: &[T],
    level: u32,
    broadcast_fanout: usize,
) -> Vec<&T> {
    if ranked.is_empty() {
        return Vec::new();
    }
    match strategy {
        EscalationStrategy::Sequential => vec![&ranked[0]],
        EscalationStrategy::RoundRobin => {
            let index = usize::try_from(level).unwrap_or(0) % ranked.len();
            vec![&ranked[index]]
        }
        EscalationStrategy::Broadcast => ranked.iter().take(broadcast_fanout.max(1)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use handoff_core::types::{FallbackRules, SessionStatus};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn rule(
        id: &str,
        trigger: TriggerType,
        timeout: u64,
        max: u32,
        priority: i32,
    ) -> EscalationRule {
        EscalationRule {
            id: id.to_string(),
            role_id: None,
            trigger_type: trigger,
            timeout_seconds: timeout,
            max_escalation_attempts: max,
            escalation_strategy: EscalationStrategy::Sequential,
            fallback_rules: FallbackRules::default(),
            require_user_confirmation: false,
            priority,
            is_active: true,
        }
    }

    fn session(level: u32) -> Session {
        Session {
            id: "s-1".into(),
            conversation_id: "c-1".into(),
            user_id: "u-1".into(),
            professional_id: "p-1".into(),
            role_id: "therapist".into(),
            status: SessionStatus::PendingAcceptance,
            ai_summary: None,
            user_consent_given: true,
            consent_given_at: Some(t0()),
            professional_joined_at: None,
            professional_ended_at: None,
            escalation_level: level,
            escalation_reason: None,
            ai_observer_mode: false,
            ended_by: None,
            ended_reason: None,
            user_location: None,
            parent_session_id: None,
            assigned_at: t0(),
            created_at: t0(),
            updated_at: t0(),
        }
    }

    #[test]
    fn timeout_fires_at_the_boundary() {
        let policy = RulePolicy::Timeout { timeout_seconds: 300 };
        assert!(policy.fires(t0(), t0() + Duration::seconds(299)).is_none());
        assert!(policy.fires(t0(), t0() + Duration::seconds(300)).is_some());
    }

    #[test]
    fn explicit_triggers_never_fire_on_their_own() {
        for trigger in [TriggerType::UserRequest, TriggerType::AiDetection, TriggerType::Manual] {
            let policy = RulePolicy::from_rule(&rule("r", trigger, 0, 3, 0));
            assert!(policy.fires(t0(), t0() + Duration::days(30)).is_none());
        }
    }

    #[test]
    fn first_firing_rule_by_priority_wins() {
        let rules = vec![
            rule("slow", TriggerType::Timeout, 600, 3, 5),
            rule("fast", TriggerType::Timeout, 60, 3, 1),
            rule("manual", TriggerType::Manual, 0, 3, 0),
        ];
        let decision = evaluate(&rules, &session(0), t0(), t0() + Duration::minutes(20));
        assert!(decision.should_escalate);
        assert_eq!(decision.rule.unwrap().id, "fast");
    }

    #[test]
    fn exhausted_rules_are_skipped() {
        let rules = vec![
            rule("tight", TriggerType::Timeout, 60, 1, 0),
            rule("loose", TriggerType::Timeout, 60, 4, 1),
        ];
        let later = t0() + Duration::minutes(5);
        assert_eq!(evaluate(&rules, &session(0), t0(), later).rule.unwrap().id, "tight");
        assert_eq!(evaluate(&rules, &session(1), t0(), later).rule.unwrap().id, "loose");
        assert!(!evaluate(&rules, &session(4), t0(), later).should_escalate);
    }

    #[test]
    fn inactive_rules_are_ignored() {
        let mut off = rule("off", TriggerType::Timeout, 1, 3, 0);
        off.is_active = false;
        let decision = evaluate(&[off], &session(0), t0(), t0() + Duration::hours(1));
        assert_eq!(decision, EscalationDecision::no_escalation());
    }

    #[test]
    fn equal_priorities_keep_input_order() {
        let rules = vec![
            rule("first", TriggerType::Timeout, 10, 3, 2),
            rule("second", TriggerType::Timeout, 10, 3, 2),
        ];
        let decision = evaluate(&rules, &session(0), t0(), t0() + Duration::minutes(1));
        assert_eq!(decision.rule.unwrap().id, "first");
    }

    #[test]
    fn first_applicable_ignores_trigger_type() {
        let rules = vec![
            rule("done", TriggerType::Timeout, 60, 1, 0),
            rule("manual", TriggerType::Manual, 0, 3, 1),
        ];
        assert_eq!(first_applicable(&rules, 0).unwrap().id, "done");
        assert_eq!(first_applicable(&rules, 1).unwrap().id, "manual");
        assert!(first_applicable(&rules, 3).is_none());
        assert!(first_applicable(&[], 0).is_none());
    }

    #[test]
    fn strategies_pick_targets() {
        let ranked = ["a", "b", "c", "d"];
        let pick = |strategy, level, fanout| -> Vec<&str> {
            select_targets(strategy, &ranked, level, fanout)
                .into_iter()
                .copied()
                .collect()
        };
        assert_eq!(pick(EscalationStrategy::Sequential, 2, 3), vec!["a"]);
        assert_eq!(pick(EscalationStrategy::RoundRobin, 0, 3), vec!["a"]);
        assert_eq!(pick(EscalationStrategy::RoundRobin, 1, 3), vec!["b"]);
        assert_eq!(pick(EscalationStrategy::RoundRobin, 5, 3), vec!["b"]);
        assert_eq!(pick(EscalationStrategy::Broadcast, 0, 3), vec!["a", "b", "c"]);
        assert_eq!(pick(EscalationStrategy::Broadcast, 0, 10), vec!["a", "b", "c", "d"]);
        assert!(select_targets::<&str>(EscalationStrategy::Broadcast, &[], 0, 3).is_empty());
    }
}
