// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation rule queries.

use handoff_core::HandoffError;
use rusqlite::{Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{EscalationRule, encode_json, enum_at, json_at};

fn row_to_rule(row: &Row<'_>) -> rusqlite::Result<EscalationRule> {
    Ok(EscalationRule {
        id: row.get(0)?,
        role_id: row.get(1)?,
        trigger_type: enum_at(row, 2)?,
        timeout_seconds: row.get::<_, i64>(3)?.max(0) as u64,
        max_escalation_attempts: row.get(4)?,
        escalation_strategy: enum_at(row, 5)?,
        fallback_rules: json_at(row, 6)?,
        require_user_confirmation: row.get(7)?,
        priority: row.get(8)?,
        is_active: row.get(9)?,
    })
}

/// Insert or replace a rule.
pub async fn upsert_rule(db: &Database, rule: &EscalationRule) -> Result<(), HandoffError> {
    let rule = rule.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO escalation_rules (id, role_id, trigger_type, timeout_seconds,
                     max_escalation_attempts, escalation_strategy, fallback_rules,
                     require_user_confirmation, priority, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                     role_id = excluded.role_id,
                     trigger_type = excluded.trigger_type,
                     timeout_seconds = excluded.timeout_seconds,
                     max_escalation_attempts = excluded.max_escalation_attempts,
                     escalation_strategy = excluded.escalation_strategy,
                     fallback_rules = excluded.fallback_rules,
                     require_user_confirmation = excluded.require_user_confirmation,
                     priority = excluded.priority,
                     is_active = excluded.is_active",
                params![
                    rule.id,
                    rule.role_id,
                    rule.trigger_type.to_string(),
                    i64::try_from(rule.timeout_seconds).unwrap_or(i64::MAX),
                    rule.max_escalation_attempts,
                    rule.escalation_strategy.to_string(),
                    encode_json(&rule.fallback_rules)?,
                    rule.require_user_confirmation,
                    rule.priority,
                    rule.is_active,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Active rules that are global or bound to `role_id`, by ascending priority.
pub async fn rules_for_role(
    db: &Database,
    role_id: &str,
) -> Result<Vec<EscalationRule>, HandoffError> {
    let role_id = role_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, role_id, trigger_type, timeout_seconds, max_escalation_attempts,
                        escalation_strategy, fallback_rules, require_user_confirmation,
                        priority, is_active
                 FROM escalation_rules
                 WHERE is_active = 1 AND (role_id IS NULL OR role_id = ?1)
                 ORDER BY priority ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(params![role_id], row_to_rule)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::types::{EscalationStrategy, FallbackRules, TriggerType};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn rule(id: &str, role_id: Option<&str>, priority: i32) -> EscalationRule {
        EscalationRule {
            id: id.to_string(),
            role_id: role_id.map(str::to_string),
            trigger_type: TriggerType::Timeout,
            timeout_seconds: 300,
            max_escalation_attempts: 3,
            escalation_strategy: EscalationStrategy::Sequential,
            fallback_rules: FallbackRules::default(),
            require_user_confirmation: false,
            priority,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn rules_for_role_orders_by_priority_and_includes_global() {
        let (db, _dir) = setup_db().await;
        upsert_rule(&db, &rule("r-low", Some("therapist"), 10)).await.unwrap();
        upsert_rule(&db, &rule("r-global", None, 1)).await.unwrap();
        upsert_rule(&db, &rule("r-other", Some("lawyer"), 0)).await.unwrap();
        let mut inactive = rule("r-off", Some("therapist"), 0);
        inactive.is_active = false;
        upsert_rule(&db, &inactive).await.unwrap();

        let ids: Vec<String> = rules_for_role(&db, "therapist")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["r-global", "r-low"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fallback_rules_survive_storage() {
        let (db, _dir) = setup_db().await;
        let mut r = rule("r-1", Some("therapist"), 0);
        r.escalation_strategy = EscalationStrategy::Broadcast;
        r.fallback_rules.widen_to_category = true;
        r.fallback_rules.drop_location = false;
        upsert_rule(&db, &r).await.unwrap();

        let stored = rules_for_role(&db, "therapist").await.unwrap();
        assert_eq!(stored, vec![r]);
        db.close().await.unwrap();
    }
}
