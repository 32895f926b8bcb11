// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Handoff escalation service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Handoff configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HandoffConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Match scorer settings.
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Timeout and inactivity sweep settings.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Non-agreement detector settings.
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Escalation execution settings.
    #[serde(default)]
    pub escalation: EscalationConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "handoff".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("handoff").join("handoff.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("handoff.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Match scorer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    /// Number of ranked candidates returned by `find_matches` when no limit is given.
    #[serde(default = "default_match_limit")]
    pub default_limit: usize,

    /// Number of alternatives fetched when looking for a replacement.
    #[serde(default = "default_match_limit")]
    pub escalation_candidate_limit: usize,

    /// Minimum rating (0-5) required of replacements on the primary search.
    #[serde(default)]
    pub escalation_min_rating: Option<f64>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            default_limit: default_match_limit(),
            escalation_candidate_limit: default_match_limit(),
            escalation_min_rating: None,
        }
    }
}

fn default_match_limit() -> usize {
    5
}

/// Which instant the timeout trigger measures elapsed time from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutAnchor {
    /// The professional's join time, or the assignment time while still pending.
    #[default]
    Joined,
    /// The professional's latest message, falling back to `Joined`.
    LastProfessionalReply,
}

/// Timeout and inactivity sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// Whether `handoff serve` schedules the sweeps.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Cadence of the pending-acceptance timeout sweep.
    #[serde(default = "default_sweep_interval")]
    pub timeout_sweep_interval_secs: u64,

    /// Cadence of the active-session inactivity sweep.
    #[serde(default = "default_sweep_interval")]
    pub inactivity_sweep_interval_secs: u64,

    /// How long a session may wait for acceptance before the timeout sweep looks at it.
    #[serde(default = "default_five_minutes")]
    pub pending_grace_secs: u64,

    /// Maximum silence in an active session before it is ended.
    #[serde(default = "default_five_minutes")]
    pub inactivity_threshold_secs: u64,

    /// Reference instant for timeout rules.
    #[serde(default)]
    pub timeout_anchor: TimeoutAnchor,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_sweep_interval_secs: default_sweep_interval(),
            inactivity_sweep_interval_secs: default_sweep_interval(),
            pending_grace_secs: default_five_minutes(),
            inactivity_threshold_secs: default_five_minutes(),
            timeout_anchor: TimeoutAnchor::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_five_minutes() -> u64 {
    300
}

/// Non-agreement detector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Number of most recent conversation turns inspected.
    #[serde(default = "default_detector_window")]
    pub window: usize,

    /// Ask the text generator for an empathetic suggestion on a match.
    #[serde(default = "default_true")]
    pub suggest: bool,

    /// Additional dissatisfaction phrases (case-insensitive substrings).
    #[serde(default)]
    pub extra_phrases: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: default_detector_window(),
            suggest: true,
            extra_phrases: Vec::new(),
        }
    }
}

fn default_detector_window() -> usize {
    10
}

/// Escalation execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EscalationConfig {
    /// Number of candidates offered the hand-off under the broadcast strategy.
    #[serde(default = "default_broadcast_fanout")]
    pub broadcast_fanout: usize,

    /// Reject session creation without user consent.
    #[serde(default = "default_true")]
    pub require_consent: bool,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            broadcast_fanout: default_broadcast_fanout(),
            require_consent: true,
        }
    }
}

fn default_broadcast_fanout() -> usize {
    3
}
