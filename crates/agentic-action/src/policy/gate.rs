//! Safety gate: approves or denies candidates by risk.
//!
//! Evaluation order matters and is fixed:
//! 1. CRITICAL without force is always denied, whatever the ceiling.
//! 2. Risk strictly above the configured ceiling is denied.
//! 3. Everything else is approved; MEDIUM+ asks for confirmation unless forced.

use std::collections::HashMap;

use agentic_core::types::RiskLevel;
use tracing::debug;
use uuid::Uuid;

use crate::policy::permissions::{Permission, PermissionTable};
use crate::types::{ActionCandidate, ActionPlan, PolicyDecision};

pub struct SafetyGate {
    max_risk: RiskLevel,
    force: bool,
    permissions: PermissionTable,
}

impl SafetyGate {
    /// Gate with the built-in permission table.
    pub fn new(max_risk: RiskLevel, force: bool) -> Self {
        Self::with_permissions(max_risk, force, PermissionTable::default())
    }

    pub fn with_permissions(max_risk: RiskLevel, force: bool, permissions: PermissionTable) -> Self {
        Self {
            max_risk,
            force,
            permissions,
        }
    }

    pub fn max_risk(&self) -> RiskLevel {
        self.max_risk
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn permissions(&self) -> &PermissionTable {
        &self.permissions
    }

    pub fn evaluate(&self, candidate: &ActionCandidate) -> PolicyDecision {
        let Permission {
            risk,
            requires_sudo,
        } = self.permissions.get(candidate.kind).unwrap_or_else(|| {
            debug!(kind = %candidate.kind, "No permission entry, using MEDIUM fallback");
            Permission::FALLBACK
        });

        let decision = if risk == RiskLevel::Critical && !self.force {
            PolicyDecision {
                action_id: candidate.id,
                risk_level: risk,
                approved: false,
                requires_sudo,
                reason: format!(
                    "CRITICAL risk action blocked: {}. Use --force to override.",
                    candidate.kind
                ),
                requires_confirmation: false,
            }
        } else if risk.exceeds(self.max_risk) {
            PolicyDecision {
                action_id: candidate.id,
                risk_level: risk,
                approved: false,
                requires_sudo,
                reason: format!(
                    "Risk level {} exceeds maximum allowed {}.",
                    risk, self.max_risk
                ),
                requires_confirmation: false,
            }
        } else {
            PolicyDecision {
                action_id: candidate.id,
                risk_level: risk,
                approved: true,
                requires_sudo,
                reason: format!("Action approved at {} risk.", risk),
                requires_confirmation: risk.requires_confirmation() && !self.force,
            }
        };

        debug!(
            action_id = %candidate.id,
            kind = %candidate.kind,
            risk = %risk,
            approved = decision.approved,
            "Policy decision"
        );
        decision
    }

    /// One decision per candidate, in plan order.
    pub fn evaluate_plan(&self, plan: &ActionPlan) -> Vec<PolicyDecision> {
        plan.actions.iter().map(|a| self.evaluate(a)).collect()
    }

    /// Approved candidates and their decisions, both in plan order.
    ///
    /// A candidate without a decision counts as denied.
    pub fn filter_approved(
        &self,
        plan: &ActionPlan,
        decisions: &[PolicyDecision],
    ) -> (Vec<ActionCandidate>, Vec<PolicyDecision>) {
        let by_id: HashMap<Uuid, &PolicyDecision> =
            decisions.iter().map(|d| (d.action_id, d)).collect();

        plan.actions
            .iter()
            .filter_map(|action| match by_id.get(&action.id) {
                Some(decision) if decision.approved => {
                    Some((action.clone(), (*decision).clone()))
                }
                _ => None,
            })
            .unzip()
    }
}
