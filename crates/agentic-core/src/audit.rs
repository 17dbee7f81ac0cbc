//! Audit records and the audit sink contract.
//!
//! The pipeline reports every classified request, approved action, policy
//! decision and execution outcome through [`AuditLog`]. Implementations live
//! elsewhere (SQLite in `agentic-storage`); [`InMemoryAuditLog`] backs tests
//! and ephemeral runs.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AgenticError, Result};
use crate::intent::{IntentType, ParsedIntent};
use crate::types::{RiskLevel, Timestamp};

/// One classified user query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: Uuid,
    pub raw_query: String,
    pub intent_type: IntentType,
    pub confidence: f32,
    pub created_at: Timestamp,
}

impl RequestRecord {
    pub fn from_intent(intent: &ParsedIntent) -> Self {
        Self {
            id: intent.id,
            raw_query: intent.raw_query.clone(),
            intent_type: intent.intent_type,
            confidence: intent.confidence,
            created_at: intent.created_at,
        }
    }
}

/// An approved action, with enough detail to rebuild it for rollback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: Uuid,
    pub request_id: Uuid,
    pub action_kind: String,
    pub description: String,
    pub command: String,
    pub target: String,
    pub parameters: BTreeMap<String, String>,
    pub rollback_command: Option<String>,
    pub risk_level: RiskLevel,
    pub approved: bool,
}

/// The gate's verdict on one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub action_id: Uuid,
    pub risk_level: RiskLevel,
    pub approved: bool,
    pub requires_sudo: bool,
    pub reason: String,
}

/// Outcome of running, or rolling back, one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub action_id: Uuid,
    pub success: bool,
    pub output: String,
    pub error: String,
    pub rolled_back: bool,
    pub executed_at: Timestamp,
}

/// Sink for audit events plus the read path used to build classifier context.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record_request(&self, record: &RequestRecord) -> Result<()>;

    async fn record_action(&self, record: &ActionRecord) -> Result<()>;

    async fn record_policy_decision(&self, record: &PolicyRecord) -> Result<()>;

    async fn record_execution(&self, record: &ExecutionRecord) -> Result<()>;

    /// Most recent requests, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<RequestRecord>>;
}

/// Render recent requests as classifier context.
pub fn format_context(records: &[RequestRecord]) -> String {
    if records.is_empty() {
        return "No previous context available.".to_string();
    }
    let lines: Vec<String> = records
        .iter()
        .map(|r| {
            format!(
                "- [{}] {} (confidence: {:.2})",
                r.intent_type, r.raw_query, r.confidence
            )
        })
        .collect();
    format!("Recent history:\n{}", lines.join("\n"))
}

#[derive(Default)]
struct Recorded {
    requests: Vec<RequestRecord>,
    actions: Vec<ActionRecord>,
    decisions: Vec<PolicyRecord>,
    executions: Vec<ExecutionRecord>,
}

/// Audit log kept in process memory.
#[derive(Default)]
pub struct InMemoryAuditLog {
    inner: Mutex<Recorded>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut Recorded) -> T) -> Result<T> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| AgenticError::Storage(format!("Lock poisoned: {}", e)))?;
        Ok(f(&mut inner))
    }

    pub fn requests(&self) -> Vec<RequestRecord> {
        self.with_inner(|i| i.requests.clone()).unwrap_or_default()
    }

    pub fn actions(&self) -> Vec<ActionRecord> {
        self.with_inner(|i| i.actions.clone()).unwrap_or_default()
    }

    pub fn decisions(&self) -> Vec<PolicyRecord> {
        self.with_inner(|i| i.decisions.clone()).unwrap_or_default()
    }

    pub fn executions(&self) -> Vec<ExecutionRecord> {
        self.with_inner(|i| i.executions.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record_request(&self, record: &RequestRecord) -> Result<()> {
        self.with_inner(|i| i.requests.push(record.clone()))
    }

    async fn record_action(&self, record: &ActionRecord) -> Result<()> {
        self.with_inner(|i| i.actions.push(record.clone()))
    }

    async fn record_policy_decision(&self, record: &PolicyRecord) -> Result<()> {
        self.with_inner(|i| i.decisions.push(record.clone()))
    }

    async fn record_execution(&self, record: &ExecutionRecord) -> Result<()> {
        self.with_inner(|i| i.executions.push(record.clone()))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<RequestRecord>> {
        self.with_inner(|i| i.requests.iter().rev().take(limit).cloned().collect())
    }
}
