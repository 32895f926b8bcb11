// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot operator commands: `sweep`, `match`, `evaluate`, `check-config`.

use std::fmt::Write as _;
use std::sync::Arc;

use handoff_config::HandoffConfig;
use handoff_core::{HandoffError, SessionStore};
use handoff_engine::{EscalationDecision, HandoffService, SweepKind};
use handoff_matching::{MatchCriteria, RankedCandidate};
use handoff_storage::SqliteStore;
use tracing::info;

use crate::SweepTarget;
use crate::notifier::LogNotifier;
use crate::serve::run_once;

/// Filters for `handoff match`.
#[derive(Debug, Clone, Default)]
pub struct MatchQuery {
    pub role_id: String,
    pub location: Option<String>,
    pub min_rating: Option<f64>,
    pub online_only: bool,
    pub excluded: Vec<String>,
    pub limit: Option<usize>,
}

impl MatchQuery {
    fn criteria(&self) -> MatchCriteria {
        let mut criteria = MatchCriteria::for_role(&self.role_id);
        if let Some(location) = &self.location {
            criteria = criteria.near(location);
        }
        if let Some(rating) = self.min_rating {
            criteria = criteria.with_min_rating(rating);
        }
        if self.online_only {
            criteria = criteria.online_only();
        }
        for id in &self.excluded {
            criteria = criteria.excluding(id);
        }
        criteria
    }
}

/// Open the configured store and wire a service that logs its notifications.
pub async fn open_service(
    config: HandoffConfig,
) -> Result<(HandoffService, Arc<SqliteStore>), HandoffError> {
    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;
    info!(database_path = %config.storage.database_path, "store opened");

    let notifier = Arc::new(LogNotifier::new());
    let service = HandoffService::new(store.clone(), store.clone(), notifier, config);
    Ok((service, store))
}

pub async fn run_sweep(config: HandoffConfig, target: SweepTarget) -> Result<(), HandoffError> {
    let kind = match target {
        SweepTarget::Timeout => SweepKind::Timeout,
        SweepTarget::Inactivity => SweepKind::Inactivity,
    };
    let (service, store) = open_service(config).await?;
    let report = run_once(&service, kind).await?;
    println!("{report}");
    store.close().await
}

pub async fn run_match(config: HandoffConfig, query: MatchQuery) -> Result<(), HandoffError> {
    let (service, store) = open_service(config).await?;
    let ranked = service.find_matches(&query.criteria(), query.limit).await?;
    print!("{}", format_ranked(&query.role_id, &ranked));
    store.close().await
}

pub async fn run_evaluate(config: HandoffConfig, session_id: &str) -> Result<(), HandoffError> {
    let (service, store) = open_service(config).await?;
    let decision = service.evaluate_escalation(session_id).await?;
    println!("{}", format_decision(session_id, &decision));
    store.close().await
}

pub fn print_config_summary(config: &HandoffConfig) {
    println!("configuration OK");
    println!("  database: {}", config.storage.database_path);
    println!(
        "  monitors: {} (timeout every {}s, inactivity every {}s)",
        if config.monitor.enabled { "enabled" } else { "disabled" },
        config.monitor.timeout_sweep_interval_secs,
        config.monitor.inactivity_sweep_interval_secs
    );
    println!(
        "  grace window: {}s, inactivity threshold: {}s",
        config.monitor.pending_grace_secs, config.monitor.inactivity_threshold_secs
    );
}

fn format_ranked(role_id: &str, ranked: &[RankedCandidate]) -> String {
    if ranked.is_empty() {
        return format!("no eligible professionals for role {role_id}\n");
    }
    let mut out = String::new();
    for (position, entry) in ranked.iter().enumerate() {
        let profile = &entry.candidate.profile;
        let _ = writeln!(
            out,
            "{}. {} ({})  score {:.1}",
            position + 1,
            profile.display_name,
            profile.id,
            entry.score
        );
        for reason in &entry.reasons {
            let _ = writeln!(out, "     - {reason}");
        }
    }
    out
}

fn format_decision(session_id: &str, decision: &EscalationDecision) -> String {
    match (&decision.rule, &decision.reason) {
        (Some(rule), Some(reason)) if decision.should_escalate => format!(
            "session {session_id}: escalate under rule {} ({}, {}): {reason}",
            rule.id, rule.trigger_type, rule.escalation_strategy
        ),
        _ => format!("session {session_id}: no escalation due"),
    }
}
