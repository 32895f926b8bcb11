// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Handoff escalation service.
//!
//! This crate provides the error taxonomy, the domain model (professionals,
//! sessions, escalation rules and events), and the collaborator traits the
//! engine is written against. Storage, delivery, and text generation all
//! plug in behind the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::HandoffError;
pub use types::{AdapterType, HealthStatus};

pub use traits::{
    Clock, Notifier, PluginAdapter, ProfessionalDirectory, SessionStore, SystemClock,
    TextGenerator,
};

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::types::*;

    #[test]
    fn handoff_error_has_all_variants() {
        let _not_found = HandoffError::session_not_found("s-1");
        let _unauthorized = HandoffError::Unauthorized {
            actor: "professional:p-2".into(),
            session_id: "s-1".into(),
        };
        let _state = HandoffError::InvalidState {
            session_id: "s-1".into(),
            expected: "pending_acceptance".into(),
            actual: "active".into(),
        };
        let _conflict = HandoffError::Conflict("live session exists".into());
        let _none = HandoffError::NoCandidates {
            role_id: "therapist".into(),
        };
        let _persistence = HandoffError::Persistence {
            source: Box::new(std::io::Error::other("disk full")),
        };
        let _config = HandoffError::Config("bad".into());
        let _collab = HandoffError::Collaborator {
            message: "push failed".into(),
            source: None,
        };
        let _internal = HandoffError::Internal("test".into());
    }

    #[test]
    fn caller_errors_are_classified() {
        assert!(HandoffError::session_not_found("x").is_caller_error());
        assert!(HandoffError::Conflict("x".into()).is_caller_error());
        assert!(!HandoffError::NoCandidates { role_id: "r".into() }.is_caller_error());
        assert!(!HandoffError::Internal("x".into()).is_caller_error());
    }

    #[test]
    fn session_status_strings_are_snake_case() {
        let all = [
            (SessionStatus::PendingAcceptance, "pending_acceptance"),
            (SessionStatus::Active, "active"),
            (SessionStatus::Declined, "declined"),
            (SessionStatus::Ended, "ended"),
        ];
        for (status, text) in all {
            assert_eq!(status.to_string(), text);
            assert_eq!(SessionStatus::from_str(text).unwrap(), status);
        }
    }

    #[test]
    fn terminal_states() {
        assert!(!SessionStatus::PendingAcceptance.is_terminal());
        assert!(!SessionStatus::Active.is_terminal());
        assert!(SessionStatus::Declined.is_terminal());
        assert!(SessionStatus::Ended.is_terminal());
        assert!(SessionStatus::Active.is_live());
    }

    #[test]
    fn actor_maps_to_ended_by() {
        assert_eq!(Actor::User("u".into()).ended_by(), EndedBy::User);
        assert_eq!(Actor::Professional("p".into()).ended_by(), EndedBy::Professional);
        assert_eq!(Actor::System.ended_by(), EndedBy::System);
        assert_eq!(Actor::Admin("a".into()).ended_by(), EndedBy::Admin);
        assert_eq!(Actor::Professional("p-1".into()).to_string(), "professional:p-1");
    }

    #[test]
    fn trigger_and_strategy_parse() {
        assert_eq!(TriggerType::from_str("user_request").unwrap(), TriggerType::UserRequest);
        assert_eq!(TriggerType::AiDetection.to_string(), "ai_detection");
        assert_eq!(
            EscalationStrategy::from_str("round_robin").unwrap(),
            EscalationStrategy::RoundRobin
        );
        assert!(EscalationStrategy::from_str("random").is_err());
    }

    #[test]
    fn fallback_rules_deserialize_with_defaults() {
        let rules: FallbackRules = serde_json::from_str(r#"{"widen_to_category": true}"#).unwrap();
        assert!(rules.enabled);
        assert!(rules.online_only);
        assert!(rules.widen_to_category);
    }

    #[test]
    fn all_traits_are_object_safe() {
        fn _assert_store(_: &dyn SessionStore) {}
        fn _assert_directory(_: &dyn ProfessionalDirectory) {}
        fn _assert_notifier(_: &dyn Notifier) {}
        fn _assert_generator(_: &dyn TextGenerator) {}
        fn _assert_clock(_: &dyn Clock) {}
    }
}
