// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation policy evaluation and execution end to end.

use handoff_config::model::{HandoffConfig, TimeoutAnchor};
use handoff_core::types::{
    EscalationStrategy, EventResult, NotificationKind, SenderKind, SessionStatus, TriggerType,
};
use handoff_core::{HandoffError, SessionStore};
use handoff_engine::EscalationOutcome;
use handoff_test_utils::{TestHarness, rule};

async fn harness_with(config: HandoffConfig, pros: &[(&str, f64)]) -> TestHarness {
    let harness = TestHarness::builder()
        .with_config(config)
        .build()
        .await
        .unwrap();
    harness.seed_role("therapist", "mental_health").await.unwrap();
    for (id, rating) in pros {
        harness
            .seed_professional(id, "therapist", *rating)
            .await
            .unwrap();
    }
    harness
}

async fn default_harness(pros: &[(&str, f64)]) -> TestHarness {
    harness_with(HandoffConfig::default(), pros).await
}

// ---- evaluate ----

#[tokio::test]
async fn evaluate_fires_timeout_rule_from_assignment_while_pending() {
    let h = default_harness(&[("p1", 4.5)]).await;
    h.seed_rule(&rule("timeout", TriggerType::Timeout, 3))
        .await
        .unwrap();
    let session = h.open_session("c1", "p1").await.unwrap();

    h.clock.advance_secs(299);
    let decision = h.service.evaluate_escalation(&session.id).await.unwrap();
    assert!(!decision.should_escalate);

    h.clock.advance_secs(1);
    let decision = h.service.evaluate_escalation(&session.id).await.unwrap();
    assert!(decision.should_escalate);
    assert_eq!(decision.rule.unwrap().id, "timeout");
    assert!(decision.reason.is_some());
}

#[tokio::test]
async fn evaluate_ignores_explicit_triggers() {
    let h = default_harness(&[("p1", 4.5)]).await;
    for (id, trigger) in [
        ("user", TriggerType::UserRequest),
        ("ai", TriggerType::AiDetection),
        ("manual", TriggerType::Manual),
    ] {
        h.seed_rule(&rule(id, trigger, 3)).await.unwrap();
    }
    let session = h.open_session("c1", "p1").await.unwrap();
    h.clock.advance_secs(3600);

    let decision = h.service.evaluate_escalation(&session.id).await.unwrap();
    assert!(!decision.should_escalate);
    assert!(decision.rule.is_none());
}

#[tokio::test]
async fn joined_anchor_ignores_professional_replies() {
    let h = default_harness(&[("p1", 4.5)]).await;
    h.seed_rule(&rule("timeout", TriggerType::Timeout, 3))
        .await
        .unwrap();
    let session = h.open_active_session("c1", "p1").await.unwrap();

    h.clock.advance_secs(240);
    h.say("c1", "p1", SenderKind::Professional, "still here")
        .await
        .unwrap();
    h.clock.advance_secs(120);

    let decision = h.service.evaluate_escalation(&session.id).await.unwrap();
    assert!(decision.should_escalate, "6 minutes since join");
}

#[tokio::test]
async fn last_reply_anchor_measures_from_latest_professional_message() {
    let mut config = HandoffConfig::default();
    config.monitor.timeout_anchor = TimeoutAnchor::LastProfessionalReply;
    let h = harness_with(config, &[("p1", 4.5)]).await;
    h.seed_rule(&rule("timeout", TriggerType::Timeout, 3))
        .await
        .unwrap();
    let session = h.open_active_session("c1", "p1").await.unwrap();

    h.clock.advance_secs(240);
    h.say("c1", "p1", SenderKind::Professional, "still here")
        .await
        .unwrap();
    // User messages do not move the anchor.
    h.clock.advance_secs(120);
    h.say("c1", &session.user_id, SenderKind::User, "ok").await.unwrap();

    let decision = h.service.evaluate_escalation(&session.id).await.unwrap();
    assert!(!decision.should_escalate, "only 2 minutes since the reply");

    h.clock.advance_secs(180);
    let decision = h.service.evaluate_escalation(&session.id).await.unwrap();
    assert!(decision.should_escalate);
}

#[tokio::test]
async fn closed_sessions_never_escalate() {
    let h = default_harness(&[("p1", 4.5), ("p2", 4.0)]).await;
    h.seed_rule(&rule("timeout", TriggerType::Timeout, 3))
        .await
        .unwrap();
    let session = h.open_session("c1", "p1").await.unwrap();
    h.service.decline_session(&session.id, "p1").await.unwrap();
    h.clock.advance_secs(3600);

    let decision = h.service.evaluate_escalation(&session.id).await.unwrap();
    assert!(!decision.should_escalate);

    let err = h
        .service
        .escalate_session(&session.id, "too late", false)
        .await
        .unwrap_err();
    assert!(matches!(err, HandoffError::InvalidState { .. }));
}

// ---- escalate ----

#[tokio::test]
async fn immediate_escalation_transfers_in_place() {
    let h = default_harness(&[("p1", 4.5), ("p2", 4.0)]).await;
    h.seed_rule(&rule("manual", TriggerType::Manual, 3))
        .await
        .unwrap();
    let session = h.open_active_session("c1", "p1").await.unwrap();
    assert_eq!(h.load_of("p1").await.unwrap(), 1);
    h.notifier.clear().await;

    let outcome = h
        .service
        .escalate_session(&session.id, "operator request", false)
        .await
        .unwrap();
    let EscalationOutcome::Transferred { session: moved, event } = outcome else {
        panic!("expected an immediate transfer");
    };
    assert_eq!(moved.id, session.id);
    assert_eq!(moved.professional_id, "p2");
    assert_eq!(moved.escalation_level, 1);
    assert_eq!(moved.status, SessionStatus::PendingAcceptance);
    assert!(moved.professional_joined_at.is_none());
    assert!(!moved.ai_observer_mode);
    assert_eq!(moved.escalation_reason.as_deref(), Some("operator request"));

    assert_eq!(event.from_professional_id, "p1");
    assert_eq!(event.to_professional_id, "p2");
    assert_eq!(event.escalation_level, 1);
    assert_eq!(event.result, EventResult::Accepted);
    assert!(!event.user_confirmed);

    assert_eq!(h.load_of("p1").await.unwrap(), 0);
    assert_eq!(
        h.notifier.kinds().await,
        vec![NotificationKind::RequestingNewProfessional]
    );
}

#[tokio::test]
async fn escalation_without_a_governing_rule_conflicts() {
    let h = default_harness(&[("p1", 4.5), ("p2", 4.0)]).await;
    let session = h.open_session("c1", "p1").await.unwrap();
    let err = h
        .service
        .escalate_session(&session.id, "help", false)
        .await
        .unwrap_err();
    assert!(matches!(err, HandoffError::Conflict(_)));
}

#[tokio::test]
async fn escalation_level_is_capped_by_the_rule() {
    let h = default_harness(&[("p1", 4.9), ("p2", 4.5), ("p3", 4.0), ("p4", 3.5)]).await;
    h.seed_rule(&rule("manual", TriggerType::Manual, 2))
        .await
        .unwrap();
    let session = h.open_session("c1", "p1").await.unwrap();

    for expected in 1..=2 {
        let outcome = h
            .service
            .escalate_session(&session.id, "again", false)
            .await
            .unwrap();
        assert!(matches!(outcome, EscalationOutcome::Transferred { .. }));
        assert_eq!(h.session(&session.id).await.unwrap().escalation_level, expected);
    }

    let err = h
        .service
        .escalate_session(&session.id, "once more", false)
        .await
        .unwrap_err();
    assert!(matches!(err, HandoffError::Conflict(_)));
    assert_eq!(h.session(&session.id).await.unwrap().escalation_level, 2);
}

#[tokio::test]
async fn no_candidates_notifies_the_user() {
    let h = default_harness(&[("p1", 4.5)]).await;
    h.seed_rule(&rule("manual", TriggerType::Manual, 3))
        .await
        .unwrap();
    let session = h.open_session("c1", "p1").await.unwrap();

    let outcome = h
        .service
        .escalate_session(&session.id, "help", false)
        .await
        .unwrap();
    assert_eq!(outcome, EscalationOutcome::NoCandidates);
    assert_eq!(
        h.notifier.kinds().await,
        vec![NotificationKind::NoProfessionalAvailable]
    );
    let unchanged = h.session(&session.id).await.unwrap();
    assert_eq!(unchanged.professional_id, "p1");
    assert_eq!(unchanged.escalation_level, 0);
}

// ---- confirmation round trip ----

#[tokio::test]
async fn confirmed_escalation_round_trip_happens_once() {
    let h = default_harness(&[("p1", 4.5), ("p2", 4.0)]).await;
    let mut confirm = rule("user", TriggerType::UserRequest, 3);
    confirm.require_user_confirmation = true;
    h.seed_rule(&confirm).await.unwrap();
    let session = h.open_active_session("c1", "p1").await.unwrap();
    h.notifier.clear().await;

    let outcome = h
        .service
        .escalate_session(&session.id, "user asked for someone else", false)
        .await
        .unwrap();
    let EscalationOutcome::AwaitingConfirmation { events } = outcome else {
        panic!("expected pending confirmation");
    };
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.to_professional_id, "p2");
    assert_eq!(event.result, EventResult::Pending);
    assert_eq!(
        h.notifier.kinds().await,
        vec![NotificationKind::EscalationConfirmationRequested]
    );

    // Nothing moved yet.
    let waiting = h.session(&session.id).await.unwrap();
    assert_eq!(waiting.professional_id, "p1");
    assert_eq!(waiting.status, SessionStatus::Active);

    // Asking again does not duplicate the offer.
    let again = h
        .service
        .escalate_session(&session.id, "still waiting", false)
        .await
        .unwrap();
    assert!(matches!(again, EscalationOutcome::AlreadyOffered { ref events } if events.len() == 1));

    assert!(
        h.service
            .accept_escalation(&session.id, "p2", &event.id)
            .await
            .unwrap()
    );
    let moved = h.session(&session.id).await.unwrap();
    assert_eq!(moved.professional_id, "p2");
    assert_eq!(moved.escalation_level, 1);
    assert_eq!(moved.status, SessionStatus::PendingAcceptance);
    assert_eq!(h.load_of("p1").await.unwrap(), 0);

    let resolved = h.store.get_event(&event.id).await.unwrap().unwrap();
    assert_eq!(resolved.result, EventResult::Accepted);
    assert!(resolved.user_confirmed);
    assert!(resolved.resolved_at.is_some());

    let err = h
        .service
        .accept_escalation(&session.id, "p2", &event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, HandoffError::InvalidState { .. }));
    assert_eq!(h.session(&session.id).await.unwrap().escalation_level, 1);
}

#[tokio::test]
async fn request_flag_forces_confirmation() {
    let h = default_harness(&[("p1", 4.5), ("p2", 4.0)]).await;
    h.seed_rule(&rule("ai", TriggerType::AiDetection, 3))
        .await
        .unwrap();
    let session = h.open_session("c1", "p1").await.unwrap();

    let outcome = h
        .service
        .escalate_session(&session.id, "dissatisfaction", true)
        .await
        .unwrap();
    assert!(matches!(outcome, EscalationOutcome::AwaitingConfirmation { .. }));
}

#[tokio::test]
async fn accept_escalation_guards() {
    let h = default_harness(&[("p1", 4.5), ("p2", 4.0), ("p3", 3.0)]).await;
    let mut confirm = rule("user", TriggerType::UserRequest, 3);
    confirm.require_user_confirmation = true;
    h.seed_rule(&confirm).await.unwrap();
    let first = h.open_session("c1", "p1").await.unwrap();
    let other = h.open_session("c2", "p3").await.unwrap();

    let EscalationOutcome::AwaitingConfirmation { events } = h
        .service
        .escalate_session(&first.id, "switch", false)
        .await
        .unwrap()
    else {
        panic!("expected pending confirmation");
    };
    let event = &events[0];

    let missing = h
        .service
        .accept_escalation(&first.id, "p2", "no-such-event")
        .await
        .unwrap_err();
    assert!(matches!(missing, HandoffError::NotFound { .. }));

    let wrong_session = h
        .service
        .accept_escalation(&other.id, "p2", &event.id)
        .await
        .unwrap_err();
    assert!(matches!(wrong_session, HandoffError::NotFound { .. }));

    let wrong_professional = h
        .service
        .accept_escalation(&first.id, "p3", &event.id)
        .await
        .unwrap_err();
    assert!(matches!(wrong_professional, HandoffError::Unauthorized { .. }));
}

#[tokio::test]
async fn declined_offer_cannot_be_accepted() {
    let h = default_harness(&[("p1", 4.5), ("p2", 4.0)]).await;
    let mut confirm = rule("user", TriggerType::UserRequest, 3);
    confirm.require_user_confirmation = true;
    h.seed_rule(&confirm).await.unwrap();
    let session = h.open_session("c1", "p1").await.unwrap();

    let EscalationOutcome::AwaitingConfirmation { events } = h
        .service
        .escalate_session(&session.id, "switch", false)
        .await
        .unwrap()
    else {
        panic!("expected pending confirmation");
    };
    let event = &events[0];

    assert!(
        h.service
            .decline_escalation(&event.id, Some("user changed their mind"))
            .await
            .unwrap()
    );
    let err = h
        .service
        .decline_escalation(&event.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, HandoffError::InvalidState { .. }));

    let err = h
        .service
        .accept_escalation(&session.id, "p2", &event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, HandoffError::InvalidState { .. }));
    assert_eq!(h.session(&session.id).await.unwrap().professional_id, "p1");
}

#[tokio::test]
async fn assignee_accepting_withdraws_open_offers() {
    let h = default_harness(&[("p1", 4.5), ("p2", 4.0)]).await;
    let mut confirm = rule("user", TriggerType::UserRequest, 3);
    confirm.require_user_confirmation = true;
    h.seed_rule(&confirm).await.unwrap();
    let session = h.open_session("c1", "p1").await.unwrap();

    let EscalationOutcome::AwaitingConfirmation { events } = h
        .service
        .escalate_session(&session.id, "switch", false)
        .await
        .unwrap()
    else {
        panic!("expected pending confirmation");
    };

    h.service.accept_session(&session.id, "p1").await.unwrap();
    let event = h.store.get_event(&events[0].id).await.unwrap().unwrap();
    assert_eq!(event.result, EventResult::Declined);
}

// ---- strategies ----

#[tokio::test]
async fn broadcast_offers_to_several_and_first_acceptance_wins() {
    let h = default_harness(&[("p1", 4.9), ("p2", 4.5), ("p3", 4.0), ("p4", 3.5), ("p5", 3.0)])
        .await;
    let mut broadcast = rule("broadcast", TriggerType::Manual, 3);
    broadcast.escalation_strategy = EscalationStrategy::Broadcast;
    h.seed_rule(&broadcast).await.unwrap();
    let session = h.open_session("c1", "p1").await.unwrap();

    let EscalationOutcome::AwaitingConfirmation { events } = h
        .service
        .escalate_session(&session.id, "broadcast", false)
        .await
        .unwrap()
    else {
        panic!("broadcast always waits for confirmation");
    };
    let targets: Vec<&str> = events
        .iter()
        .map(|e| e.to_professional_id.as_str())
        .collect();
    assert_eq!(targets, vec!["p2", "p3", "p4"]);
    assert_eq!(h.notifier.count_of(NotificationKind::EscalationOffered).await, 3);
    assert_eq!(
        h.notifier
            .count_of(NotificationKind::EscalationConfirmationRequested)
            .await,
        1
    );

    let winner = &events[1];
    h.service
        .accept_escalation(&session.id, "p3", &winner.id)
        .await
        .unwrap();
    assert_eq!(h.session(&session.id).await.unwrap().professional_id, "p3");

    for event in h.store.events_for_session(&session.id).await.unwrap() {
        let expected = if event.id == winner.id {
            EventResult::Accepted
        } else {
            EventResult::Declined
        };
        assert_eq!(event.result, expected, "{}", event.to_professional_id);
    }

    let late = h
        .service
        .accept_escalation(&session.id, "p2", &events[0].id)
        .await
        .unwrap_err();
    assert!(matches!(late, HandoffError::InvalidState { .. }));
}

#[tokio::test]
async fn broadcast_fanout_is_configurable() {
    let mut config = HandoffConfig::default();
    config.escalation.broadcast_fanout = 1;
    let h = harness_with(config, &[("p1", 4.9), ("p2", 4.5), ("p3", 4.0)]).await;
    let mut broadcast = rule("broadcast", TriggerType::Manual, 3);
    broadcast.escalation_strategy = EscalationStrategy::Broadcast;
    h.seed_rule(&broadcast).await.unwrap();
    let session = h.open_session("c1", "p1").await.unwrap();

    let outcome = h
        .service
        .escalate_session(&session.id, "broadcast", false)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        EscalationOutcome::AwaitingConfirmation { ref events } if events.len() == 1
    ));
}

#[tokio::test]
async fn round_robin_rotates_with_the_level() {
    let h = default_harness(&[("p1", 5.0), ("p2", 4.8), ("p3", 4.4), ("p4", 4.0)]).await;
    let mut rotating = rule("rr", TriggerType::Manual, 5);
    rotating.escalation_strategy = EscalationStrategy::RoundRobin;
    h.seed_rule(&rotating).await.unwrap();
    let session = h.open_session("c1", "p1").await.unwrap();

    // Level 0 takes the top of [p2, p3, p4].
    h.service
        .escalate_session(&session.id, "first", false)
        .await
        .unwrap();
    assert_eq!(h.session(&session.id).await.unwrap().professional_id, "p2");

    // Level 1 takes the second of [p3, p4].
    h.service
        .escalate_session(&session.id, "second", false)
        .await
        .unwrap();
    assert_eq!(h.session(&session.id).await.unwrap().professional_id, "p4");
}

#[tokio::test]
async fn sequential_always_takes_the_top_candidate() {
    let h = default_harness(&[("p1", 5.0), ("p2", 4.8), ("p3", 4.4), ("p4", 4.0)]).await;
    h.seed_rule(&rule("seq", TriggerType::Manual, 5))
        .await
        .unwrap();
    let session = h.open_session("c1", "p1").await.unwrap();

    h.service
        .escalate_session(&session.id, "first", false)
        .await
        .unwrap();
    h.service
        .escalate_session(&session.id, "second", false)
        .await
        .unwrap();
    assert_eq!(h.session(&session.id).await.unwrap().professional_id, "p3");
}

// ---- fallback ----

#[tokio::test]
async fn fallback_drops_the_minimum_rating_once() {
    let mut config = HandoffConfig::default();
    config.matching.escalation_min_rating = Some(4.5);
    let h = harness_with(config, &[("p1", 4.9), ("p2", 4.0)]).await;
    h.seed_rule(&rule("manual", TriggerType::Manual, 3))
        .await
        .unwrap();
    let session = h.open_session("c1", "p1").await.unwrap();

    let outcome = h
        .service
        .escalate_session(&session.id, "help", false)
        .await
        .unwrap();
    assert!(matches!(outcome, EscalationOutcome::Transferred { .. }));
    assert_eq!(h.session(&session.id).await.unwrap().professional_id, "p2");
}

#[tokio::test]
async fn disabled_fallback_keeps_the_primary_constraints() {
    let mut config = HandoffConfig::default();
    config.matching.escalation_min_rating = Some(4.5);
    let h = harness_with(config, &[("p1", 4.9), ("p2", 4.0)]).await;
    let mut strict = rule("manual", TriggerType::Manual, 3);
    strict.fallback_rules.enabled = false;
    h.seed_rule(&strict).await.unwrap();
    let session = h.open_session("c1", "p1").await.unwrap();

    let outcome = h
        .service
        .escalate_session(&session.id, "help", false)
        .await
        .unwrap();
    assert_eq!(outcome, EscalationOutcome::NoCandidates);
}

#[tokio::test]
async fn fallback_can_widen_to_sibling_roles() {
    let h = default_harness(&[("p1", 4.9)]).await;
    h.seed_role("counselor", "mental_health").await.unwrap();
    h.seed_role("nutritionist", "physical_health").await.unwrap();
    h.seed_professional("c-1", "counselor", 4.0).await.unwrap();
    h.seed_professional("n-1", "nutritionist", 5.0).await.unwrap();

    let mut wide = rule("manual", TriggerType::Manual, 3);
    wide.fallback_rules.widen_to_category = true;
    h.seed_rule(&wide).await.unwrap();
    let session = h.open_session("c1", "p1").await.unwrap();

    h.service
        .escalate_session(&session.id, "help", false)
        .await
        .unwrap();
    let moved = h.session(&session.id).await.unwrap();
    assert_eq!(moved.professional_id, "c-1");
    assert_eq!(moved.role_id, "therapist");
}

// ---- detector ----

#[tokio::test]
async fn detector_proposes_but_does_not_escalate() {
    let h = TestHarness::builder()
        .with_generator_responses(vec!["I hear you. Let me find someone else.".to_string()])
        .build()
        .await
        .unwrap();
    h.seed_role("therapist", "mental_health").await.unwrap();
    h.seed_professional("p1", "therapist", 4.5).await.unwrap();
    h.seed_professional("p2", "therapist", 4.0).await.unwrap();
    let session = h.open_active_session("c1", "p1").await.unwrap();

    h.say("c1", "p1", SenderKind::Professional, "have you tried journaling?")
        .await
        .unwrap();
    let complaint = h
        .say("c1", &session.user_id, SenderKind::User, "This is not helping me at all")
        .await
        .unwrap();

    let result = h.service.detect_non_agreement("c1").await.unwrap();
    assert!(result.should_escalate);
    assert_eq!(result.matched_phrase.as_deref(), Some("not helping"));
    assert_eq!(result.message_id.as_deref(), Some(complaint.id.as_str()));
    assert_eq!(
        result.suggestion.as_deref(),
        Some("I hear you. Let me find someone else.")
    );

    let unchanged = h.session(&session.id).await.unwrap();
    assert_eq!(unchanged.professional_id, "p1");
    assert_eq!(unchanged.status, SessionStatus::Active);
}

#[tokio::test]
async fn detector_can_be_disabled() {
    let mut config = HandoffConfig::default();
    config.detector.enabled = false;
    let h = harness_with(config, &[]).await;
    h.say("c1", "u-1", SenderKind::User, "waste of time").await.unwrap();
    let result = h.service.detect_non_agreement("c1").await.unwrap();
    assert!(!result.should_escalate);
}
