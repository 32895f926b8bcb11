// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation event log. Rows are appended once and only their result changes.

use chrono::{DateTime, Utc};
use handoff_core::HandoffError;
use handoff_core::types::EventResult;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{
    EscalationEvent, encode_opt_time, encode_time, enum_at, opt_time_at, time_at,
};

const EVENT_COLUMNS: &str = "id, session_id, rule_id, from_professional_id, to_professional_id,
    escalation_level, reason, user_notified, user_confirmed, result, created_at, resolved_at";

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<EscalationEvent> {
    Ok(EscalationEvent {
        id: row.get(0)?,
        session_id: row.get(1)?,
        rule_id: row.get(2)?,
        from_professional_id: row.get(3)?,
        to_professional_id: row.get(4)?,
        escalation_level: row.get(5)?,
        reason: row.get(6)?,
        user_notified: row.get(7)?,
        user_confirmed: row.get(8)?,
        result: enum_at(row, 9)?,
        created_at: time_at(row, 10)?,
        resolved_at: opt_time_at(row, 11)?,
    })
}

pub async fn insert_event(db: &Database, event: &EscalationEvent) -> Result<(), HandoffError> {
    let event = event.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO escalation_events ({EVENT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
                ),
                params![
                    event.id,
                    event.session_id,
                    event.rule_id,
                    event.from_professional_id,
                    event.to_professional_id,
                    event.escalation_level,
                    event.reason,
                    event.user_notified,
                    event.user_confirmed,
                    event.result.to_string(),
                    encode_time(&event.created_at),
                    encode_opt_time(&event.resolved_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_event(db: &Database, id: &str) -> Result<Option<EscalationEvent>, HandoffError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {EVENT_COLUMNS} FROM escalation_events WHERE id = ?1"),
                params![id],
                row_to_event,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Events of a session, oldest first.
pub async fn events_for_session(
    db: &Database,
    session_id: &str,
) -> Result<Vec<EscalationEvent>, HandoffError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM escalation_events
                 WHERE session_id = ?1
                 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![session_id], row_to_event)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// pending -> `result`; `false` when the event was already resolved.
pub async fn resolve_event(
    db: &Database,
    id: &str,
    result: EventResult,
    user_confirmed: bool,
    at: DateTime<Utc>,
) -> Result<bool, HandoffError> {
    let id = id.to_string();
    let result = result.to_string();
    let at = encode_time(&at);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE escalation_events
                 SET result = ?2, user_confirmed = ?3, resolved_at = ?4
                 WHERE id = ?1 AND result = 'pending'",
                params![id, result, user_confirmed, at],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}
