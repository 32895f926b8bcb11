// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Handoff escalation service.

use thiserror::Error;

/// The primary error type used across all Handoff adapter traits and engine operations.
#[derive(Debug, Error)]
pub enum HandoffError {
    /// A session, professional, role, rule, or escalation event does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The caller is not the assigned professional, the session's user, or an admin.
    #[error("{actor} is not authorized to act on session {session_id}")]
    Unauthorized { actor: String, session_id: String },

    /// The action was attempted from a disallowed session state (e.g. double accept).
    #[error("session {session_id} is {actual}, expected {expected}")]
    InvalidState {
        session_id: String,
        expected: String,
        actual: String,
    },

    /// A guard rejected the action for a reason other than the session status
    /// (duplicate live session, missing consent, exhausted attempts, lost race).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Scoring plus fallback produced zero eligible professionals.
    #[error("no eligible professionals for role {role_id}")]
    NoCandidates { role_id: String },

    /// Store read or write failure.
    #[error("persistence error: {source}")]
    Persistence {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Notification delivery or text-generation collaborator failure.
    #[error("collaborator error: {message}")]
    Collaborator {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HandoffError {
    /// Shorthand for a missing session.
    pub fn session_not_found(id: impl Into<String>) -> Self {
        HandoffError::NotFound {
            entity: "session",
            id: id.into(),
        }
    }

    /// Returns true for errors callers are expected to surface directly
    /// (not found, unauthorized, invalid state).
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            HandoffError::NotFound { .. }
                | HandoffError::Unauthorized { .. }
                | HandoffError::InvalidState { .. }
                | HandoffError::Conflict(_)
        )
    }
}
