//! Database schema migrations.
//!
//! Applies the audit schema: requests, actions, policy_decisions,
//! execution_results, and the schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use agentic_core::error::AgenticError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), AgenticError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| AgenticError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| AgenticError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: audit_schema");
    }

    Ok(())
}

/// Version 1: audit schema.
///
/// Policy decisions carry no foreign key: denied actions are never written
/// to `actions`, yet their decisions are kept.
fn apply_v1(conn: &Connection) -> Result<(), AgenticError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS requests (
            id          TEXT PRIMARY KEY NOT NULL,
            raw_query   TEXT NOT NULL,
            intent_type TEXT NOT NULL,
            confidence  REAL NOT NULL,
            created_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_requests_created_at
            ON requests (created_at DESC);

        CREATE TABLE IF NOT EXISTS actions (
            id               TEXT PRIMARY KEY NOT NULL,
            request_id       TEXT NOT NULL REFERENCES requests(id),
            action_type      TEXT NOT NULL,
            description      TEXT NOT NULL,
            command          TEXT NOT NULL DEFAULT '',
            target           TEXT NOT NULL DEFAULT '',
            parameters       TEXT NOT NULL DEFAULT '{}',
            rollback_command TEXT,
            risk_level       INTEGER NOT NULL CHECK (risk_level BETWEEN 1 AND 5),
            approved         INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_actions_request
            ON actions (request_id);

        CREATE TABLE IF NOT EXISTS policy_decisions (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            action_id     TEXT NOT NULL,
            risk_level    INTEGER NOT NULL CHECK (risk_level BETWEEN 1 AND 5),
            approved      INTEGER NOT NULL,
            requires_sudo INTEGER NOT NULL DEFAULT 0,
            reason        TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_policy_decisions_action
            ON policy_decisions (action_id);

        CREATE TABLE IF NOT EXISTS execution_results (
            id          TEXT PRIMARY KEY NOT NULL,
            action_id   TEXT NOT NULL REFERENCES actions(id),
            success     INTEGER NOT NULL,
            output      TEXT NOT NULL DEFAULT '',
            error       TEXT NOT NULL DEFAULT '',
            rolled_back INTEGER NOT NULL DEFAULT 0,
            executed_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_execution_results_action
            ON execution_results (action_id, executed_at);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'audit_schema');
        ",
    )
    .map_err(|e| AgenticError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}
