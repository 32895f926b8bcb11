// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation message log.

use chrono::{DateTime, Utc};
use handoff_core::HandoffError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{ConversationMessage, encode_time, enum_at, time_at};

pub async fn append_message(
    db: &Database,
    message: &ConversationMessage,
) -> Result<(), HandoffError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversation_messages
                     (id, conversation_id, sender_id, sender_kind, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message.id,
                    message.conversation_id,
                    message.sender_id,
                    message.sender_kind.to_string(),
                    message.content,
                    encode_time(&message.created_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The latest `limit` messages of a conversation, returned oldest first.
pub async fn recent_messages(
    db: &Database,
    conversation_id: &str,
    limit: usize,
) -> Result<Vec<ConversationMessage>, HandoffError> {
    let conversation_id = conversation_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, sender_id, sender_kind, content, created_at
                 FROM conversation_messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![conversation_id, limit], |row| {
                Ok(ConversationMessage {
                    id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    sender_id: row.get(2)?,
                    sender_kind: enum_at(row, 3)?,
                    content: row.get(4)?,
                    created_at: time_at(row, 5)?,
                })
            })?;
            let mut messages = rows.collect::<Result<Vec<_>, _>>()?;
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Timestamp of the latest message, optionally from one sender only.
pub async fn last_message_at(
    db: &Database,
    conversation_id: &str,
    sender_id: Option<&str>,
) -> Result<Option<DateTime<Utc>>, HandoffError> {
    let conversation_id = conversation_id.to_string();
    let sender_id = sender_id.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let raw: Option<String> = conn.query_row(
                "SELECT MAX(created_at) FROM conversation_messages
                 WHERE conversation_id = ?1 AND (?2 IS NULL OR sender_id = ?2)",
                params![conversation_id, sender_id],
                |row| row.get(0),
            )?;
            Ok(raw)
        })
        .await
        .map_err(map_tr_err)?
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| HandoffError::Persistence {
                    source: Box::new(e),
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use handoff_core::types::SenderKind;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn msg(id: &str, sender: &str, kind: SenderKind, secs: i64) -> ConversationMessage {
        ConversationMessage {
            id: id.into(),
            conversation_id: "conv-1".into(),
            sender_id: sender.into(),
            sender_kind: kind,
            content: format!("message {id}"),
            created_at: Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap()
                + chrono::Duration::seconds(secs),
        }
    }

    #[tokio::test]
    async fn recent_window_is_oldest_first() {
        let (db, _dir) = setup_db().await;
        for (i, secs) in [0, 10, 20, 30].into_iter().enumerate() {
            append_message(&db, &msg(&format!("m{i}"), "u-1", SenderKind::User, secs))
                .await
                .unwrap();
        }

        let ids: Vec<String> = recent_messages(&db, "conv-1", 2)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["m2", "m3"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn last_message_per_sender() {
        let (db, _dir) = setup_db().await;
        append_message(&db, &msg("m1", "p-1", SenderKind::Professional, 5))
            .await
            .unwrap();
        append_message(&db, &msg("m2", "u-1", SenderKind::User, 50))
            .await
            .unwrap();

        let any = last_message_at(&db, "conv-1", None).await.unwrap().unwrap();
        let pro = last_message_at(&db, "conv-1", Some("p-1"))
            .await
            .unwrap()
            .unwrap();
        assert!(any > pro);
        assert!(last_message_at(&db, "conv-2", None).await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
