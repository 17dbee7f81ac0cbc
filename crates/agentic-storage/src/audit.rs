//! SQLite-backed audit log.
//!
//! Records every request, approved action, policy decision and execution
//! result, and answers the history, context and rollback lookups.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use agentic_core::audit::{ActionRecord, AuditLog, ExecutionRecord, PolicyRecord, RequestRecord};
use agentic_core::error::AgenticError;
use agentic_core::types::{RiskLevel, Timestamp};

use crate::db::Database;

/// A request together with the actions approved for it.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub request: RequestRecord,
    pub actions: Vec<ActionRecord>,
}

pub struct AuditStore {
    db: Arc<Database>,
}

impl AuditStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Most recent requests with their actions, newest first.
    pub fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, AgenticError> {
        let requests = self.recent_requests(limit)?;
        requests
            .into_iter()
            .map(|request| {
                let actions = self.actions_for(request.id)?;
                Ok(HistoryEntry { request, actions })
            })
            .collect()
    }

    /// Look up one recorded action, e.g. to roll it back.
    pub fn get_action(&self, id: Uuid) -> Result<Option<ActionRecord>, AgenticError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    &format!("{} WHERE id = ?1", SELECT_ACTIONS),
                    rusqlite::params![id.to_string()],
                    |row| Ok(row_to_action(row)),
                )
                .optional()
                .map_err(|e| AgenticError::Storage(e.to_string()))?;

            match result {
                Some(action) => Ok(Some(action?)),
                None => Ok(None),
            }
        })
    }

    /// Every execution and rollback result for an action, oldest first.
    pub fn executions_for(&self, action_id: Uuid) -> Result<Vec<ExecutionRecord>, AgenticError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, action_id, success, output, error, rolled_back, executed_at
                     FROM execution_results WHERE action_id = ?1
                     ORDER BY executed_at ASC, rowid ASC",
                )
                .map_err(|e| AgenticError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params![action_id.to_string()], |row| {
                    Ok(row_to_execution(row))
                })
                .map_err(|e| AgenticError::Storage(e.to_string()))?;
            collect_rows(rows)
        })
    }

    /// Policy decisions recorded for an action.
    pub fn decisions_for(&self, action_id: Uuid) -> Result<Vec<PolicyRecord>, AgenticError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT action_id, risk_level, approved, requires_sudo, reason
                     FROM policy_decisions WHERE action_id = ?1 ORDER BY id ASC",
                )
                .map_err(|e| AgenticError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params![action_id.to_string()], |row| {
                    Ok(row_to_decision(row))
                })
                .map_err(|e| AgenticError::Storage(e.to_string()))?;
            collect_rows(rows)
        })
    }

    fn recent_requests(&self, limit: usize) -> Result<Vec<RequestRecord>, AgenticError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, raw_query, intent_type, confidence, created_at
                     FROM requests ORDER BY created_at DESC, rowid DESC LIMIT ?1",
                )
                .map_err(|e| AgenticError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params![limit as i64], |row| Ok(row_to_request(row)))
                .map_err(|e| AgenticError::Storage(e.to_string()))?;
            collect_rows(rows)
        })
    }

    fn actions_for(&self, request_id: Uuid) -> Result<Vec<ActionRecord>, AgenticError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "{} WHERE request_id = ?1 ORDER BY rowid ASC",
                    SELECT_ACTIONS
                ))
                .map_err(|e| AgenticError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params![request_id.to_string()], |row| {
                    Ok(row_to_action(row))
                })
                .map_err(|e| AgenticError::Storage(e.to_string()))?;
            collect_rows(rows)
        })
    }
}

#[async_trait]
impl AuditLog for AuditStore {
    async fn record_request(&self, record: &RequestRecord) -> Result<(), AgenticError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO requests (id, raw_query, intent_type, confidence, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    record.id.to_string(),
                    record.raw_query,
                    record.intent_type.to_string(),
                    record.confidence as f64,
                    record.created_at.0,
                ],
            )
            .map_err(|e| AgenticError::Storage(format!("Failed to record request: {}", e)))?;
            Ok(())
        })
    }

    async fn record_action(&self, record: &ActionRecord) -> Result<(), AgenticError> {
        let parameters = serde_json::to_string(&record.parameters)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO actions (id, request_id, action_type, description, command, target,
                                      parameters, rollback_command, risk_level, approved)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    record.id.to_string(),
                    record.request_id.to_string(),
                    record.action_kind,
                    record.description,
                    record.command,
                    record.target,
                    parameters,
                    record.rollback_command,
                    record.risk_level.value(),
                    record.approved as i32,
                ],
            )
            .map_err(|e| AgenticError::Storage(format!("Failed to record action: {}", e)))?;
            Ok(())
        })
    }

    async fn record_policy_decision(&self, record: &PolicyRecord) -> Result<(), AgenticError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO policy_decisions (action_id, risk_level, approved, requires_sudo, reason)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    record.action_id.to_string(),
                    record.risk_level.value(),
                    record.approved as i32,
                    record.requires_sudo as i32,
                    record.reason,
                ],
            )
            .map_err(|e| {
                AgenticError::Storage(format!("Failed to record policy decision: {}", e))
            })?;
            Ok(())
        })
    }

    async fn record_execution(&self, record: &ExecutionRecord) -> Result<(), AgenticError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO execution_results (id, action_id, success, output, error, rolled_back, executed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    record.id.to_string(),
                    record.action_id.to_string(),
                    record.success as i32,
                    record.output,
                    record.error,
                    record.rolled_back as i32,
                    record.executed_at.0,
                ],
            )
            .map_err(|e| AgenticError::Storage(format!("Failed to record execution: {}", e)))?;
            debug!(action_id = %record.action_id, rolled_back = record.rolled_back, "Execution recorded");
            Ok(())
        })
    }

    async fn recent(&self, limit: usize) -> Result<Vec<RequestRecord>, AgenticError> {
        self.recent_requests(limit)
    }
}

// =============================================================================
// Row mapping
// =============================================================================

const SELECT_ACTIONS: &str = "SELECT id, request_id, action_type, description, command, target,
        parameters, rollback_command, risk_level, approved FROM actions";

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<Result<T, AgenticError>>>,
) -> Result<Vec<T>, AgenticError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| AgenticError::Storage(e.to_string()))??);
    }
    Ok(out)
}

fn parse_uuid(raw: &str) -> Result<Uuid, AgenticError> {
    Uuid::parse_str(raw).map_err(|e| AgenticError::Storage(format!("Invalid id {}: {}", raw, e)))
}

fn parse_risk(raw: u8) -> Result<RiskLevel, AgenticError> {
    RiskLevel::from_value(raw)
        .ok_or_else(|| AgenticError::Storage(format!("Invalid risk level: {}", raw)))
}

fn storage_err(e: rusqlite::Error) -> AgenticError {
    AgenticError::Storage(e.to_string())
}

fn row_to_request(row: &Row) -> Result<RequestRecord, AgenticError> {
    let id: String = row.get(0).map_err(storage_err)?;
    let intent_type: String = row.get(2).map_err(storage_err)?;
    let confidence: f64 = row.get(3).map_err(storage_err)?;
    Ok(RequestRecord {
        id: parse_uuid(&id)?,
        raw_query: row.get(1).map_err(storage_err)?,
        intent_type: intent_type.parse().map_err(AgenticError::Storage)?,
        confidence: confidence as f32,
        created_at: Timestamp(row.get(4).map_err(storage_err)?),
    })
}

fn row_to_action(row: &Row) -> Result<ActionRecord, AgenticError> {
    let id: String = row.get(0).map_err(storage_err)?;
    let request_id: String = row.get(1).map_err(storage_err)?;
    let parameters: String = row.get(6).map_err(storage_err)?;
    let parameters: BTreeMap<String, String> = serde_json::from_str(&parameters)?;
    let approved: i32 = row.get(9).map_err(storage_err)?;
    Ok(ActionRecord {
        id: parse_uuid(&id)?,
        request_id: parse_uuid(&request_id)?,
        action_kind: row.get(2).map_err(storage_err)?,
        description: row.get(3).map_err(storage_err)?,
        command: row.get(4).map_err(storage_err)?,
        target: row.get(5).map_err(storage_err)?,
        parameters,
        rollback_command: row.get(7).map_err(storage_err)?,
        risk_level: parse_risk(row.get(8).map_err(storage_err)?)?,
        approved: approved != 0,
    })
}

fn row_to_decision(row: &Row) -> Result<PolicyRecord, AgenticError> {
    let action_id: String = row.get(0).map_err(storage_err)?;
    let approved: i32 = row.get(2).map_err(storage_err)?;
    let requires_sudo: i32 = row.get(3).map_err(storage_err)?;
    Ok(PolicyRecord {
        action_id: parse_uuid(&action_id)?,
        risk_level: parse_risk(row.get(1).map_err(storage_err)?)?,
        approved: approved != 0,
        requires_sudo: requires_sudo != 0,
        reason: row.get(4).map_err(storage_err)?,
    })
}

fn row_to_execution(row: &Row) -> Result<ExecutionRecord, AgenticError> {
    let id: String = row.get(0).map_err(storage_err)?;
    let action_id: String = row.get(1).map_err(storage_err)?;
    let success: i32 = row.get(2).map_err(storage_err)?;
    let rolled_back: i32 = row.get(5).map_err(storage_err)?;
    Ok(ExecutionRecord {
        id: parse_uuid(&id)?,
        action_id: parse_uuid(&action_id)?,
        success: success != 0,
        output: row.get(3).map_err(storage_err)?,
        error: row.get(4).map_err(storage_err)?,
        rolled_back: rolled_back != 0,
        executed_at: Timestamp(row.get(6).map_err(storage_err)?),
    })
}
