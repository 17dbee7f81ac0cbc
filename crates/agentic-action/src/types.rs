//! Core types and value objects for the action engine.
//!
//! Defines action kinds, candidates, plans, policy decisions and results.

use agentic_core::audit::{ActionRecord, ExecutionRecord, PolicyRecord};
use agentic_core::types::{RiskLevel, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Target meaning "the whole system" rather than a named process or package.
pub const SYSTEM_TARGET: &str = "system";

// =============================================================================
// Enums
// =============================================================================

/// Every privileged operation the engine knows how to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    KillProcess,
    SuspendProcess,
    ReniceProcess,
    AptInstall,
    AptUpgrade,
    DropCaches,
    KillByMemory,
    SystemctlStart,
    SystemctlStop,
    SystemctlRestart,
}

impl ActionKind {
    pub const ALL: [ActionKind; 10] = [
        ActionKind::KillProcess,
        ActionKind::SuspendProcess,
        ActionKind::ReniceProcess,
        ActionKind::AptInstall,
        ActionKind::AptUpgrade,
        ActionKind::DropCaches,
        ActionKind::KillByMemory,
        ActionKind::SystemctlStart,
        ActionKind::SystemctlStop,
        ActionKind::SystemctlRestart,
    ];

    /// The runner family that executes this kind.
    pub fn family(self) -> RunnerFamily {
        match self {
            ActionKind::KillProcess | ActionKind::SuspendProcess | ActionKind::ReniceProcess => {
                RunnerFamily::Process
            }
            ActionKind::AptInstall | ActionKind::AptUpgrade => RunnerFamily::Package,
            ActionKind::DropCaches | ActionKind::KillByMemory => RunnerFamily::Memory,
            ActionKind::SystemctlStart
            | ActionKind::SystemctlStop
            | ActionKind::SystemctlRestart => RunnerFamily::Service,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::KillProcess => "KILL_PROCESS",
            ActionKind::SuspendProcess => "SUSPEND_PROCESS",
            ActionKind::ReniceProcess => "RENICE_PROCESS",
            ActionKind::AptInstall => "APT_INSTALL",
            ActionKind::AptUpgrade => "APT_UPGRADE",
            ActionKind::DropCaches => "DROP_CACHES",
            ActionKind::KillByMemory => "KILL_BY_MEMORY",
            ActionKind::SystemctlStart => "SYSTEMCTL_START",
            ActionKind::SystemctlStop => "SYSTEMCTL_STOP",
            ActionKind::SystemctlRestart => "SYSTEMCTL_RESTART",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown action kind: {}", s))
    }
}

/// Groups of action kinds that share one runner implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerFamily {
    Process,
    Package,
    Memory,
    Service,
}

impl RunnerFamily {
    pub const ALL: [RunnerFamily; 4] = [
        RunnerFamily::Process,
        RunnerFamily::Package,
        RunnerFamily::Memory,
        RunnerFamily::Service,
    ];
}

impl fmt::Display for RunnerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerFamily::Process => write!(f, "process"),
            RunnerFamily::Package => write!(f, "package"),
            RunnerFamily::Memory => write!(f, "memory"),
            RunnerFamily::Service => write!(f, "service"),
        }
    }
}

// =============================================================================
// Domain Structs
// =============================================================================

/// A proposed operation awaiting policy evaluation.
///
/// Read-only once built: neither the gate nor the executor mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCandidate {
    pub id: Uuid,
    pub kind: ActionKind,
    pub description: String,
    /// Shell command; empty when the runner synthesizes its own.
    pub command: String,
    pub target: String,
    pub parameters: BTreeMap<String, String>,
    pub rollback_command: Option<String>,
}

impl ActionCandidate {
    pub fn new(kind: ActionKind, description: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            description: description.into(),
            command: String::new(),
            target: target.into(),
            parameters: BTreeMap::new(),
            rollback_command: None,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn with_rollback(mut self, command: impl Into<String>) -> Self {
        self.rollback_command = Some(command.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// True when the target names the whole system rather than one item.
    pub fn targets_system(&self) -> bool {
        self.target.is_empty() || self.target == SYSTEM_TARGET
    }

    /// Audit record for this candidate once approved at `risk_level`.
    pub fn to_record(&self, request_id: Uuid, risk_level: RiskLevel) -> ActionRecord {
        ActionRecord {
            id: self.id,
            request_id,
            action_kind: self.kind.to_string(),
            description: self.description.clone(),
            command: self.command.clone(),
            target: self.target.clone(),
            parameters: self.parameters.clone(),
            rollback_command: self.rollback_command.clone(),
            risk_level,
            approved: true,
        }
    }

    /// Rebuild a candidate from its audit record, keeping the original id.
    pub fn from_record(record: &ActionRecord) -> Result<Self, String> {
        Ok(Self {
            id: record.id,
            kind: record.action_kind.parse()?,
            description: record.description.clone(),
            command: record.command.clone(),
            target: record.target.clone(),
            parameters: record.parameters.clone(),
            rollback_command: record.rollback_command.clone(),
        })
    }
}

/// An ordered batch of candidates produced for one classified intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlan {
    pub id: Uuid,
    pub intent_id: Uuid,
    pub actions: Vec<ActionCandidate>,
    pub reasoning: String,
    pub created_at: Timestamp,
}

impl ActionPlan {
    pub fn new(intent_id: Uuid, actions: Vec<ActionCandidate>, reasoning: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            intent_id,
            actions,
            reasoning: reasoning.into(),
            created_at: Timestamp::now(),
        }
    }

    pub fn empty(intent_id: Uuid, reasoning: impl Into<String>) -> Self {
        Self::new(intent_id, Vec::new(), reasoning)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// The safety gate's verdict for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub action_id: Uuid,
    pub risk_level: RiskLevel,
    pub approved: bool,
    pub requires_sudo: bool,
    pub reason: String,
    pub requires_confirmation: bool,
}

impl PolicyDecision {
    pub fn to_record(&self) -> PolicyRecord {
        PolicyRecord {
            action_id: self.action_id,
            risk_level: self.risk_level,
            approved: self.approved,
            requires_sudo: self.requires_sudo,
            reason: self.reason.clone(),
        }
    }
}

/// Outcome of executing, or rolling back, one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: Uuid,
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub rolled_back: bool,
    pub completed_at: Timestamp,
}

impl ActionResult {
    pub fn succeeded(action_id: Uuid, output: impl Into<String>) -> Self {
        Self {
            action_id,
            success: true,
            output: Some(output.into()),
            error: None,
            rolled_back: false,
            completed_at: Timestamp::now(),
        }
    }

    pub fn failed(action_id: Uuid, error: impl Into<String>) -> Self {
        Self {
            action_id,
            success: false,
            output: None,
            error: Some(error.into()),
            rolled_back: false,
            completed_at: Timestamp::now(),
        }
    }

    /// A successful compensation.
    pub fn rolled_back(action_id: Uuid, output: impl Into<String>) -> Self {
        Self {
            rolled_back: true,
            ..Self::succeeded(action_id, output)
        }
    }

    pub fn to_record(&self) -> ExecutionRecord {
        ExecutionRecord {
            id: Uuid::new_v4(),
            action_id: self.action_id,
            success: self.success,
            output: self.output.clone().unwrap_or_default(),
            error: self.error.clone().unwrap_or_default(),
            rolled_back: self.rolled_back,
            executed_at: self.completed_at,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
