// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session persistence and guarded status transitions.
//!
//! Every transition is a compare-and-set on the current status (and the
//! assigned professional where relevant). Load counter changes run in the
//! same transaction as the status change they belong to.

use chrono::{DateTime, Utc};
use handoff_core::HandoffError;
use handoff_core::types::{EndedBy, SessionStatus, SessionTransfer};
use rusqlite::{ErrorCode, OptionalExtension, Row, Transaction, params};
use tracing::debug;

use crate::database::{Database, map_tr_err};
use crate::models::{
    Session, encode_opt_time, encode_time, enum_at, opt_enum_at, opt_time_at, time_at,
};

const SESSION_COLUMNS: &str = "id, conversation_id, user_id, professional_id, role_id, status,
    ai_summary, user_consent_given, consent_given_at, professional_joined_at,
    professional_ended_at, escalation_level, escalation_reason, ai_observer_mode,
    ended_by, ended_reason, user_location, parent_session_id, assigned_at,
    created_at, updated_at";

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        user_id: row.get(2)?,
        professional_id: row.get(3)?,
        role_id: row.get(4)?,
        status: enum_at(row, 5)?,
        ai_summary: row.get(6)?,
        user_consent_given: row.get(7)?,
        consent_given_at: opt_time_at(row, 8)?,
        professional_joined_at: opt_time_at(row, 9)?,
        professional_ended_at: opt_time_at(row, 10)?,
        escalation_level: row.get(11)?,
        escalation_reason: row.get(12)?,
        ai_observer_mode: row.get(13)?,
        ended_by: opt_enum_at(row, 14)?,
        ended_reason: row.get(15)?,
        user_location: row.get(16)?,
        parent_session_id: row.get(17)?,
        assigned_at: time_at(row, 18)?,
        created_at: time_at(row, 19)?,
        updated_at: time_at(row, 20)?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Insert a new session.
///
/// The partial unique index on live sessions turns a second pending/active
/// session for the same conversation into `Conflict`.
pub async fn insert_session(db: &Database, session: &Session) -> Result<(), HandoffError> {
    let session = session.clone();
    let conversation_id = session.conversation_id.clone();
    let inserted = db
        .connection()
        .call(move |conn| {
            let result = conn.execute(
                &format!(
                    "INSERT INTO sessions ({SESSION_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                             ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)"
                ),
                params![
                    session.id,
                    session.conversation_id,
                    session.user_id,
                    session.professional_id,
                    session.role_id,
                    session.status.to_string(),
                    session.ai_summary,
                    session.user_consent_given,
                    encode_opt_time(&session.consent_given_at),
                    encode_opt_time(&session.professional_joined_at),
                    encode_opt_time(&session.professional_ended_at),
                    session.escalation_level,
                    session.escalation_reason,
                    session.ai_observer_mode,
                    session.ended_by.map(|e| e.to_string()),
                    session.ended_reason,
                    session.user_location,
                    session.parent_session_id,
                    encode_time(&session.assigned_at),
                    encode_time(&session.created_at),
                    encode_time(&session.updated_at),
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    if inserted {
        Ok(())
    } else {
        Err(HandoffError::Conflict(format!(
            "conversation {conversation_id} already has a live session"
        )))
    }
}

/// Get a session by ID.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<Session>, HandoffError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id],
                row_to_session,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// The pending or active session of a conversation, if any.
pub async fn live_session_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<Session>, HandoffError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE conversation_id = ?1
                       AND status IN ('pending_acceptance', 'active')"
                ),
                params![conversation_id],
                row_to_session,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List sessions, optionally filtered by status, newest first.
pub async fn list_sessions(
    db: &Database,
    status: Option<SessionStatus>,
) -> Result<Vec<Session>, HandoffError> {
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE ?1 IS NULL OR status = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map(params![status], row_to_session)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Pending sessions whose professional was assigned at or before `cutoff`,
/// oldest assignment first.
pub async fn pending_sessions_assigned_before(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Session>, HandoffError> {
    let cutoff = encode_time(&cutoff);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE status = 'pending_acceptance' AND assigned_at <= ?1
                 ORDER BY assigned_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map(params![cutoff], row_to_session)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Active sessions that have a join time.
pub async fn active_joined_sessions(db: &Database) -> Result<Vec<Session>, HandoffError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions
                 WHERE status = 'active' AND professional_joined_at IS NOT NULL
                 ORDER BY professional_joined_at ASC, rowid ASC"
            ))?;
            let rows = stmt.query_map([], row_to_session)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

fn increment_load(tx: &Transaction<'_>, professional_id: &str) -> rusqlite::Result<()> {
    tx.execute(
        "INSERT INTO professional_status (professional_id, current_session_count)
         VALUES (?1, 1)
         ON CONFLICT(professional_id)
         DO UPDATE SET current_session_count = current_session_count + 1",
        params![professional_id],
    )?;
    Ok(())
}

fn decrement_load(tx: &Transaction<'_>, professional_id: &str) -> rusqlite::Result<()> {
    tx.execute(
        "UPDATE professional_status
         SET current_session_count = current_session_count - 1
         WHERE professional_id = ?1 AND current_session_count > 0",
        params![professional_id],
    )?;
    Ok(())
}

/// pending_acceptance -> active for the assigned professional; the assistant
/// stays in the conversation as an observer.
pub async fn mark_accepted(
    db: &Database,
    session_id: &str,
    professional_id: &str,
    joined_at: DateTime<Utc>,
) -> Result<bool, HandoffError> {
    let session_id = session_id.to_string();
    let professional_id = professional_id.to_string();
    let joined_at = encode_time(&joined_at);
    let applied = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE sessions
                 SET status = 'active', professional_joined_at = ?3, ai_observer_mode = 1,
                     updated_at = ?3
                 WHERE id = ?1 AND professional_id = ?2 AND status = 'pending_acceptance'",
                params![session_id, professional_id, joined_at],
            )?;
            if changed == 1 {
                increment_load(&tx, &professional_id)?;
            }
            tx.commit()?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)?;
    debug!(applied, "mark_accepted");
    Ok(applied)
}

/// pending_acceptance -> declined for the assigned professional.
pub async fn mark_declined(
    db: &Database,
    session_id: &str,
    professional_id: &str,
    at: DateTime<Utc>,
) -> Result<bool, HandoffError> {
    let session_id = session_id.to_string();
    let professional_id = professional_id.to_string();
    let at = encode_time(&at);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE sessions SET status = 'declined', updated_at = ?3
                 WHERE id = ?1 AND professional_id = ?2 AND status = 'pending_acceptance'",
                params![session_id, professional_id, at],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// active -> ended, releasing the professional's load slot.
pub async fn mark_ended(
    db: &Database,
    session_id: &str,
    ended_by: EndedBy,
    reason: Option<&str>,
    ended_at: DateTime<Utc>,
) -> Result<bool, HandoffError> {
    let session_id = session_id.to_string();
    let ended_by = ended_by.to_string();
    let reason = reason.map(str::to_string);
    let ended_at = encode_time(&ended_at);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let professional_id: Option<String> = tx
                .query_row(
                    "SELECT professional_id FROM sessions WHERE id = ?1 AND status = 'active'",
                    params![session_id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(professional_id) = professional_id else {
                return Ok(false);
            };
            let changed = tx.execute(
                "UPDATE sessions
                 SET status = 'ended', ended_by = ?2, ended_reason = ?3,
                     professional_ended_at = ?4, updated_at = ?4
                 WHERE id = ?1 AND status = 'active'",
                params![session_id, ended_by, reason, ended_at],
            )?;
            if changed == 1 {
                decrement_load(&tx, &professional_id)?;
            }
            tx.commit()?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Move a live session to a new professional at `expected_level + 1`.
pub async fn transfer_session(
    db: &Database,
    transfer: &SessionTransfer,
) -> Result<bool, HandoffError> {
    let transfer = transfer.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current: Option<(String, String, u32)> = tx
                .query_row(
                    "SELECT status, professional_id, escalation_level FROM sessions WHERE id = ?1",
                    params![transfer.session_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;
            let Some((status, professional_id, level)) = current else {
                return Ok(false);
            };
            let live = status == "pending_acceptance" || status == "active";
            if !live
                || professional_id != transfer.from_professional_id
                || level != transfer.expected_level
            {
                return Ok(false);
            }

            let at = encode_time(&transfer.at);
            let changed = tx.execute(
                "UPDATE sessions
                 SET professional_id = ?2, status = 'pending_acceptance',
                     professional_joined_at = NULL, ai_observer_mode = 0, assigned_at = ?5,
                     escalation_level = escalation_level + 1, escalation_reason = ?4,
                     updated_at = ?5
                 WHERE id = ?1 AND escalation_level = ?3 AND status = ?6",
                params![
                    transfer.session_id,
                    transfer.to_professional_id,
                    transfer.expected_level,
                    transfer.reason,
                    at,
                    status,
                ],
            )?;
            if changed == 1 && status == "active" {
                decrement_load(&tx, &transfer.from_professional_id)?;
            }
            tx.commit()?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}
