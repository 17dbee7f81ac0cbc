//! Permission table mapping each action kind to its risk and sudo need.

use std::collections::HashMap;

use agentic_core::types::RiskLevel;

use crate::types::ActionKind;

/// Risk tier and privilege requirement for one action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permission {
    pub risk: RiskLevel,
    pub requires_sudo: bool,
}

impl Permission {
    pub const fn new(risk: RiskLevel, requires_sudo: bool) -> Self {
        Self {
            risk,
            requires_sudo,
        }
    }

    /// Used by the gate when a kind has no entry.
    pub const FALLBACK: Permission = Permission::new(RiskLevel::Medium, false);
}

/// Built-in permission for a kind. Exhaustive, so a new kind cannot compile
/// without one.
pub fn default_permission(kind: ActionKind) -> Permission {
    use RiskLevel::*;
    match kind {
        ActionKind::KillProcess => Permission::new(Medium, false),
        ActionKind::SuspendProcess => Permission::new(Low, false),
        ActionKind::ReniceProcess => Permission::new(Low, false),
        ActionKind::AptInstall => Permission::new(Medium, true),
        ActionKind::AptUpgrade => Permission::new(High, true),
        ActionKind::DropCaches => Permission::new(Medium, true),
        ActionKind::KillByMemory => Permission::new(High, false),
        ActionKind::SystemctlStart => Permission::new(Medium, true),
        ActionKind::SystemctlStop => Permission::new(High, true),
        ActionKind::SystemctlRestart => Permission::new(High, true),
    }
}

/// Per-gate permission configuration.
///
/// Each [`SafetyGate`](crate::policy::SafetyGate) owns its own table, so
/// overriding an entry never leaks into another gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTable {
    entries: HashMap<ActionKind, Permission>,
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self {
            entries: ActionKind::ALL
                .into_iter()
                .map(|kind| (kind, default_permission(kind)))
                .collect(),
        }
    }
}

impl PermissionTable {
    /// A table with no entries at all.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with_override(mut self, kind: ActionKind, permission: Permission) -> Self {
        self.entries.insert(kind, permission);
        self
    }

    pub fn without(mut self, kind: ActionKind) -> Self {
        self.entries.remove(&kind);
        self
    }

    pub fn get(&self, kind: ActionKind) -> Option<Permission> {
        self.entries.get(&kind).copied()
    }

    /// Kinds with no entry, in enumeration order.
    pub fn missing_kinds(&self) -> Vec<ActionKind> {
        ActionKind::ALL
            .into_iter()
            .filter(|kind| !self.entries.contains_key(kind))
            .collect()
    }

    /// Startup completeness check.
    pub fn validate(&self) -> Result<(), String> {
        let missing = self.missing_kinds();
        if missing.is_empty() {
            Ok(())
        } else {
            let names: Vec<&str> = missing.iter().map(|k| k.as_str()).collect();
            Err(format!("Permission table missing entries for: {}", names.join(", ")))
        }
    }
}
