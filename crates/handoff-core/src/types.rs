// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter traits and the Handoff engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a collaborator boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Directory,
    Notifier,
    TextGenerator,
}

// --- Professional directory ---

/// Outcome of the external approval workflow for a professional.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

/// Live presence of a professional, maintained by heartbeats.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Offline,
    Online,
    Busy,
}

/// A professional's profile, owned by the approval workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalProfile {
    pub id: String,
    pub display_name: String,
    pub role_id: String,
    pub approval_status: ApprovalStatus,
    pub is_active: bool,
    /// Self-declared "available for live chat" flag.
    pub online_availability: bool,
    pub max_concurrent_sessions: u32,
    /// Average review rating on a 0-5 scale.
    pub rating_average: f64,
    pub review_count: u32,
    pub location: Option<String>,
}

/// Live status and load counter for a professional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalStatus {
    pub professional_id: String,
    pub status: PresenceStatus,
    pub current_session_count: u32,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl ProfessionalStatus {
    /// Status assumed for a professional that never sent a heartbeat.
    pub fn offline(professional_id: impl Into<String>) -> Self {
        Self {
            professional_id: professional_id.into(),
            status: PresenceStatus::Offline,
            current_session_count: 0,
            last_seen_at: None,
        }
    }
}

/// A category of professional (e.g. "licensed therapist").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalRole {
    pub id: String,
    pub name: String,
    pub category: String,
    pub eligible_for_live_chat: bool,
    /// Matching hints (keywords and categories) used upstream to pick a role.
    pub keywords: Vec<String>,
    pub is_active: bool,
}

/// A profile joined with its live status, as returned by the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub profile: ProfessionalProfile,
    pub status: ProfessionalStatus,
}

// --- Escalation rules ---

/// What kind of signal a rule reacts to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Timeout,
    UserRequest,
    AiDetection,
    Manual,
}

/// How a replacement is chosen from the ranked candidates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EscalationStrategy {
    /// Always the top-ranked candidate.
    Sequential,
    /// Rotate through the ranking by escalation level.
    RoundRobin,
    /// Offer the hand-off to several candidates; the first to accept wins.
    Broadcast,
}

/// Relaxed matching criteria applied once when the primary search is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackRules {
    pub enabled: bool,
    pub drop_location: bool,
    pub drop_min_rating: bool,
    pub online_only: bool,
    /// Also search other active live-chat roles in the same category.
    pub widen_to_category: bool,
}

impl Default for FallbackRules {
    fn default() -> Self {
        Self {
            enabled: true,
            drop_location: true,
            drop_min_rating: true,
            online_only: true,
            widen_to_category: false,
        }
    }
}

/// Admin-defined escalation policy row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRule {
    pub id: String,
    /// `None` applies the rule to every role.
    pub role_id: Option<String>,
    pub trigger_type: TriggerType,
    pub timeout_seconds: u64,
    pub max_escalation_attempts: u32,
    pub escalation_strategy: EscalationStrategy,
    pub fallback_rules: FallbackRules,
    pub require_user_confirmation: bool,
    /// Ascending: lower values are evaluated first.
    pub priority: i32,
    pub is_active: bool,
}

// --- Sessions ---

/// Lifecycle state of a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    PendingAcceptance,
    Active,
    Declined,
    Ended,
}

impl SessionStatus {
    /// Declined and ended sessions never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Declined | SessionStatus::Ended)
    }

    /// At most one live session may exist per conversation.
    pub fn is_live(self) -> bool {
        !self.is_terminal()
    }
}

/// Who terminated a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EndedBy {
    User,
    Professional,
    System,
    Admin,
}

/// The caller of a guarded session operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    User(String),
    Professional(String),
    System,
    Admin(String),
}

impl Actor {
    pub fn ended_by(&self) -> EndedBy {
        match self {
            Actor::User(_) => EndedBy::User,
            Actor::Professional(_) => EndedBy::Professional,
            Actor::System => EndedBy::System,
            Actor::Admin(_) => EndedBy::Admin,
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::User(id) => write!(f, "user:{id}"),
            Actor::Professional(id) => write!(f, "professional:{id}"),
            Actor::System => write!(f, "system"),
            Actor::Admin(id) => write!(f, "admin:{id}"),
        }
    }
}

/// One instance of a user connected to a specific professional for live help.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub professional_id: String,
    pub role_id: String,
    pub status: SessionStatus,
    pub ai_summary: Option<String>,
    pub user_consent_given: bool,
    pub consent_given_at: Option<DateTime<Utc>>,
    pub professional_joined_at: Option<DateTime<Utc>>,
    pub professional_ended_at: Option<DateTime<Utc>>,
    /// Number of hand-offs this session (and its re-match chain) went through.
    pub escalation_level: u32,
    pub escalation_reason: Option<String>,
    pub ai_observer_mode: bool,
    pub ended_by: Option<EndedBy>,
    pub ended_reason: Option<String>,
    /// Location the user asked to be matched near, if any.
    pub user_location: Option<String>,
    /// Session this one re-matches after a decline or inactivity.
    pub parent_session_id: Option<String>,
    /// When the current professional was assigned.
    pub assigned_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A guarded move of a session to a new professional.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTransfer {
    pub session_id: String,
    pub from_professional_id: String,
    pub to_professional_id: String,
    /// Level the session must still be at; guards against double transfer.
    pub expected_level: u32,
    pub reason: String,
    pub at: DateTime<Utc>,
}

// --- Escalation events ---

/// Resolution of a single hand-off attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventResult {
    Pending,
    Accepted,
    Declined,
}

/// Append-only audit row, one per hand-off attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationEvent {
    pub id: String,
    pub session_id: String,
    pub rule_id: Option<String>,
    pub from_professional_id: String,
    pub to_professional_id: String,
    /// Level the session reaches if this hand-off is accepted.
    pub escalation_level: u32,
    pub reason: String,
    pub user_notified: bool,
    pub user_confirmed: bool,
    pub result: EventResult,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

// --- Conversation ---

/// Author of a conversation message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SenderKind {
    User,
    Professional,
    Assistant,
    System,
}

/// A single turn in the surrounding conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_kind: SenderKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// --- Notifications ---

/// What a user-facing notification is about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ProfessionalJoined,
    RequestingNewProfessional,
    NoProfessionalAvailable,
    SessionEnded,
    CanRequestAgain,
    EscalationOffered,
    EscalationConfirmationRequested,
}

/// A message handed to the delivery collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub conversation_id: String,
    /// Recipient: the user for most kinds, the professional for offers.
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub text: String,
    pub session_id: Option<String>,
}
