// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as positive intervals, rating bounds, and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::HandoffConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &HandoffConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
    if !LEVELS.contains(&config.service.log_level.as_str()) {
        fail(format!(
            "service.log_level `{}` must be one of {}",
            config.service.log_level,
            LEVELS.join(", ")
        ));
    }

    if config.matching.default_limit == 0 {
        fail("matching.default_limit must be at least 1".to_string());
    }
    if config.matching.escalation_candidate_limit == 0 {
        fail("matching.escalation_candidate_limit must be at least 1".to_string());
    }
    if let Some(rating) = config.matching.escalation_min_rating
        && !(0.0..=5.0).contains(&rating)
    {
        fail(format!(
            "matching.escalation_min_rating must be between 0 and 5, got {rating}"
        ));
    }

    let positive = [
        (
            "monitor.timeout_sweep_interval_secs",
            config.monitor.timeout_sweep_interval_secs,
        ),
        (
            "monitor.inactivity_sweep_interval_secs",
            config.monitor.inactivity_sweep_interval_secs,
        ),
        ("monitor.pending_grace_secs", config.monitor.pending_grace_secs),
        (
            "monitor.inactivity_threshold_secs",
            config.monitor.inactivity_threshold_secs,
        ),
    ];
    for (key, value) in positive {
        if value == 0 {
            fail(format!("{key} must be greater than 0"));
        }
    }

    if config.detector.window == 0 {
        fail("detector.window must be at least 1".to_string());
    }
    for (i, phrase) in config.detector.extra_phrases.iter().enumerate() {
        if phrase.trim().is_empty() {
            fail(format!("detector.extra_phrases[{i}] must not be empty"));
        }
    }

    if config.escalation.broadcast_fanout == 0 {
        fail("escalation.broadcast_fanout must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
