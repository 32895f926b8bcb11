// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Professional directory queries: roles, profiles, and live status.

use chrono::{DateTime, Utc};
use handoff_core::HandoffError;
use handoff_core::types::PresenceStatus;
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};
use crate::models::{
    Candidate, ProfessionalProfile, ProfessionalRole, ProfessionalStatus, encode_json,
    encode_time, enum_at, json_at, opt_enum_at, opt_time_at,
};

const ROLE_COLUMNS: &str = "id, name, category, eligible_for_live_chat, keywords, is_active";

const PROFILE_COLUMNS: &str = "p.id, p.display_name, p.role_id, p.approval_status, p.is_active,
    p.online_availability, p.max_concurrent_sessions, p.rating_average, p.review_count,
    p.location";

fn row_to_role(row: &Row<'_>) -> rusqlite::Result<ProfessionalRole> {
    Ok(ProfessionalRole {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        eligible_for_live_chat: row.get(3)?,
        keywords: json_at(row, 4)?,
        is_active: row.get(5)?,
    })
}

fn row_to_profile(row: &Row<'_>) -> rusqlite::Result<ProfessionalProfile> {
    Ok(ProfessionalProfile {
        id: row.get(0)?,
        display_name: row.get(1)?,
        role_id: row.get(2)?,
        approval_status: enum_at(row, 3)?,
        is_active: row.get(4)?,
        online_availability: row.get(5)?,
        max_concurrent_sessions: row.get(6)?,
        rating_average: row.get(7)?,
        review_count: row.get(8)?,
        location: row.get(9)?,
    })
}

/// Profile columns (0..=9) followed by the left-joined status columns.
fn row_to_candidate(row: &Row<'_>) -> rusqlite::Result<Candidate> {
    let profile = row_to_profile(row)?;
    let status = ProfessionalStatus {
        professional_id: profile.id.clone(),
        status: opt_enum_at(row, 10)?.unwrap_or(PresenceStatus::Offline),
        current_session_count: row.get::<_, Option<u32>>(11)?.unwrap_or(0),
        last_seen_at: opt_time_at(row, 12)?,
    };
    Ok(Candidate { profile, status })
}

/// Insert or replace a role.
pub async fn upsert_role(db: &Database, role: &ProfessionalRole) -> Result<(), HandoffError> {
    let role = role.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO roles (id, name, category, eligible_for_live_chat, keywords, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                     name = excluded.name,
                     category = excluded.category,
                     eligible_for_live_chat = excluded.eligible_for_live_chat,
                     keywords = excluded.keywords,
                     is_active = excluded.is_active",
                params![
                    role.id,
                    role.name,
                    role.category,
                    role.eligible_for_live_chat,
                    encode_json(&role.keywords)?,
                    role.is_active,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_role(db: &Database, id: &str) -> Result<Option<ProfessionalRole>, HandoffError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = ?1"),
                params![id],
                row_to_role,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Active, live-chat-eligible roles of a category, in registration order.
pub async fn roles_in_category(
    db: &Database,
    category: &str,
) -> Result<Vec<ProfessionalRole>, HandoffError> {
    let category = category.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ROLE_COLUMNS} FROM roles
                 WHERE category = ?1 AND is_active = 1 AND eligible_for_live_chat = 1
                 ORDER BY rowid ASC"
            ))?;
            let rows = stmt.query_map(params![category], row_to_role)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or update a profile. Updates keep the original registration order.
pub async fn upsert_profile(
    db: &Database,
    profile: &ProfessionalProfile,
) -> Result<(), HandoffError> {
    let profile = profile.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO professionals (id, display_name, role_id, approval_status, is_active,
                     online_availability, max_concurrent_sessions, rating_average, review_count,
                     location)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                     display_name = excluded.display_name,
                     role_id = excluded.role_id,
                     approval_status = excluded.approval_status,
                     is_active = excluded.is_active,
                     online_availability = excluded.online_availability,
                     max_concurrent_sessions = excluded.max_concurrent_sessions,
                     rating_average = excluded.rating_average,
                     review_count = excluded.review_count,
                     location = excluded.location",
                params![
                    profile.id,
                    profile.display_name,
                    profile.role_id,
                    profile.approval_status.to_string(),
                    profile.is_active,
                    profile.online_availability,
                    profile.max_concurrent_sessions,
                    profile.rating_average,
                    profile.review_count,
                    profile.location,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_profile(
    db: &Database,
    id: &str,
) -> Result<Option<ProfessionalProfile>, HandoffError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {PROFILE_COLUMNS} FROM professionals p WHERE p.id = ?1"),
                params![id],
                row_to_profile,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Every professional registered for a role joined with live status.
///
/// Professionals without a status row are reported offline with no load.
pub async fn candidates_for_role(
    db: &Database,
    role_id: &str,
) -> Result<Vec<Candidate>, HandoffError> {
    let role_id = role_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROFILE_COLUMNS}, s.status, s.current_session_count, s.last_seen_at
                 FROM professionals p
                 JOIN roles r ON r.id = p.role_id
                 LEFT JOIN professional_status s ON s.professional_id = p.id
                 WHERE p.role_id = ?1 AND r.is_active = 1 AND r.eligible_for_live_chat = 1
                 ORDER BY p.rowid ASC"
            ))?;
            let rows = stmt.query_map(params![role_id], row_to_candidate)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_status(
    db: &Database,
    professional_id: &str,
) -> Result<Option<ProfessionalStatus>, HandoffError> {
    let professional_id = professional_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT professional_id, status, current_session_count, last_seen_at
                 FROM professional_status WHERE professional_id = ?1",
                params![professional_id],
                |row| {
                    Ok(ProfessionalStatus {
                        professional_id: row.get(0)?,
                        status: enum_at(row, 1)?,
                        current_session_count: row.get(2)?,
                        last_seen_at: opt_time_at(row, 3)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Heartbeat upsert. The load counter is left untouched.
pub async fn record_presence(
    db: &Database,
    professional_id: &str,
    status: PresenceStatus,
    seen_at: DateTime<Utc>,
) -> Result<(), HandoffError> {
    let professional_id = professional_id.to_string();
    let status = status.to_string();
    let seen_at = encode_time(&seen_at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO professional_status (professional_id, status, last_seen_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(professional_id) DO UPDATE SET
                     status = excluded.status,
                     last_seen_at = excluded.last_seen_at",
                params![professional_id, status, seen_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_core::types::ApprovalStatus;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn role(id: &str, category: &str) -> ProfessionalRole {
        ProfessionalRole {
            id: id.to_string(),
            name: format!("{id} role"),
            category: category.to_string(),
            eligible_for_live_chat: true,
            keywords: vec!["anxiety".to_string(), "stress".to_string()],
            is_active: true,
        }
    }

    fn profile(id: &str, role_id: &str) -> ProfessionalProfile {
        ProfessionalProfile {
            id: id.to_string(),
            display_name: format!("Dr. {id}"),
            role_id: role_id.to_string(),
            approval_status: ApprovalStatus::Approved,
            is_active: true,
            online_availability: true,
            max_concurrent_sessions: 3,
            rating_average: 4.5,
            review_count: 12,
            location: Some("Berlin".to_string()),
        }
    }

    #[tokio::test]
    async fn roles_roundtrip_and_category_lookup() {
        let (db, _dir) = setup_db().await;
        upsert_role(&db, &role("therapist", "mental_health")).await.unwrap();
        upsert_role(&db, &role("counselor", "mental_health")).await.unwrap();
        let mut retired = role("coach", "mental_health");
        retired.is_active = false;
        upsert_role(&db, &retired).await.unwrap();
        upsert_role(&db, &role("lawyer", "legal")).await.unwrap();

        let fetched = get_role(&db, "therapist").await.unwrap().unwrap();
        assert_eq!(fetched.keywords, vec!["anxiety", "stress"]);

        let ids: Vec<String> = roles_in_category(&db, "mental_health")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["therapist", "counselor"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn candidates_keep_registration_order_and_default_to_offline() {
        let (db, _dir) = setup_db().await;
        upsert_role(&db, &role("therapist", "mental_health")).await.unwrap();
        upsert_role(&db, &role("lawyer", "legal")).await.unwrap();
        upsert_profile(&db, &profile("p-1", "therapist")).await.unwrap();
        upsert_profile(&db, &profile("p-2", "therapist")).await.unwrap();
        upsert_profile(&db, &profile("p-3", "lawyer")).await.unwrap();

        // Updating p-1 must not move it to the end.
        let mut updated = profile("p-1", "therapist");
        updated.rating_average = 4.9;
        upsert_profile(&db, &updated).await.unwrap();

        record_presence(&db, "p-2", PresenceStatus::Online, Utc::now())
            .await
            .unwrap();

        let candidates = candidates_for_role(&db, "therapist").await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].profile.id, "p-1");
        assert_eq!(candidates[0].profile.rating_average, 4.9);
        assert_eq!(candidates[0].status.status, PresenceStatus::Offline);
        assert_eq!(candidates[1].status.status, PresenceStatus::Online);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn candidates_require_an_active_live_chat_role() {
        let (db, _dir) = setup_db().await;
        let mut retired = role("coach", "mental_health");
        retired.is_active = false;
        upsert_role(&db, &retired).await.unwrap();
        let mut offline_only = role("auditor", "legal");
        offline_only.eligible_for_live_chat = false;
        upsert_role(&db, &offline_only).await.unwrap();

        upsert_profile(&db, &profile("p-1", "coach")).await.unwrap();
        upsert_profile(&db, &profile("p-2", "auditor")).await.unwrap();
        upsert_profile(&db, &profile("p-3", "unregistered")).await.unwrap();

        assert!(candidates_for_role(&db, "coach").await.unwrap().is_empty());
        assert!(candidates_for_role(&db, "auditor").await.unwrap().is_empty());
        assert!(candidates_for_role(&db, "unregistered").await.unwrap().is_empty());

        retired.is_active = true;
        upsert_role(&db, &retired).await.unwrap();
        assert_eq!(candidates_for_role(&db, "coach").await.unwrap().len(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn presence_does_not_touch_load_counter() {
        let (db, _dir) = setup_db().await;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO professional_status (professional_id, current_session_count)
                     VALUES ('p-1', 2)",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        record_presence(&db, "p-1", PresenceStatus::Busy, Utc::now())
            .await
            .unwrap();

        let status = get_status(&db, "p-1").await.unwrap().unwrap();
        assert_eq!(status.status, PresenceStatus::Busy);
        assert_eq!(status.current_session_count, 2);
        assert!(status.last_seen_at.is_some());
        db.close().await.unwrap();
    }
}
