// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL files under `migrations/` are compiled into the binary by
//! `embed_migrations!` and applied on every open.

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Run all pending migrations against the given connection.
///
/// Refinery tracks applied versions in `refinery_schema_history`. The error
/// is rendered to a string so it can cross the connection thread boundary.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), String> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| format!("migration failed: {e}"))?;
    for migration in report.applied_migrations() {
        tracing::info!(version = migration.version(), name = %migration.name(), "applied migration");
    }
    Ok(())
}
