//! End-to-end orchestration of one request.
//!
//! context -> classify -> plan -> gate -> confirm -> execute, reporting each
//! step to the audit log. Steps run strictly in sequence and plan order is
//! kept throughout.

use std::sync::Arc;

use agentic_core::audit::{format_context, AuditLog, RequestRecord};
use agentic_core::intent::{IntentClassifier, ParsedIntent};
use agentic_core::types::RiskLevel;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::executor::ActionExecutor;
use crate::policy::SafetyGate;
use crate::strategy::DecisionEngine;
use crate::types::{ActionCandidate, ActionPlan, ActionResult, PolicyDecision};

/// Asks the operator to approve the listed actions. Called at most once per run.
pub type ConfirmCallback =
    Box<dyn Fn(&[ActionCandidate], &[PolicyDecision]) -> bool + Send + Sync>;

pub const DEFAULT_CONTEXT_LIMIT: usize = 5;

/// Everything one successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub intent: ParsedIntent,
    /// The full plan, including denied actions.
    pub plan: ActionPlan,
    /// One decision per plan action, in plan order.
    pub decisions: Vec<PolicyDecision>,
    /// Results for approved actions only.
    pub results: Vec<ActionResult>,
}

impl PipelineOutcome {
    fn without_actions(intent: ParsedIntent, plan: ActionPlan) -> Self {
        Self {
            intent,
            plan,
            decisions: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn decision_for(&self, candidate: &ActionCandidate) -> Option<&PolicyDecision> {
        self.decisions.iter().find(|d| d.action_id == candidate.id)
    }
}

pub struct Pipeline {
    classifier: Arc<dyn IntentClassifier>,
    engine: DecisionEngine,
    gate: SafetyGate,
    executor: ActionExecutor,
    audit: Arc<dyn AuditLog>,
    simulate: bool,
    confirm: Option<ConfirmCallback>,
    context_limit: usize,
}

impl Pipeline {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        engine: DecisionEngine,
        gate: SafetyGate,
        executor: ActionExecutor,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            classifier,
            engine,
            gate,
            executor,
            audit,
            simulate: false,
            confirm: None,
            context_limit: DEFAULT_CONTEXT_LIMIT,
        }
    }

    pub fn simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    /// Without a callback, confirmation is skipped.
    pub fn with_confirm(mut self, confirm: ConfirmCallback) -> Self {
        self.confirm = Some(confirm);
        self
    }

    pub fn context_limit(mut self, limit: usize) -> Self {
        self.context_limit = limit;
        self
    }

    pub fn is_simulating(&self) -> bool {
        self.simulate
    }

    pub fn gate(&self) -> &SafetyGate {
        &self.gate
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    /// Process one free-text request.
    pub async fn run(&self, query: &str) -> Result<PipelineOutcome, PipelineError> {
        let context = self.context().await;
        let intent = self.classifier.classify(query, &context).await?;
        info!(
            intent_id = %intent.id,
            intent = %intent.intent_type,
            confidence = intent.confidence,
            "Query classified"
        );
        let request = RequestRecord::from_intent(&intent);
        self.audit_step("request", self.audit.record_request(&request).await);

        if intent.is_unknown() {
            let plan = self.engine.decide(&intent);
            info!(intent_id = %intent.id, "Unknown intent, nothing to do");
            return Ok(PipelineOutcome::without_actions(intent, plan));
        }

        let plan = self.engine.decide(&intent);
        if plan.is_empty() {
            info!(intent_id = %intent.id, reasoning = %plan.reasoning, "Empty plan");
            return Ok(PipelineOutcome::without_actions(intent, plan));
        }

        let decisions = self.gate.evaluate_plan(&plan);
        for decision in &decisions {
            self.audit_step(
                "policy decision",
                self.audit.record_policy_decision(&decision.to_record()).await,
            );
        }

        let (approved, approved_decisions) = self.gate.filter_approved(&plan, &decisions);
        if approved.is_empty() {
            let critical_blocked = !self.gate.force()
                && decisions
                    .iter()
                    .any(|d| !d.approved && d.risk_level == RiskLevel::Critical);
            warn!(intent_id = %intent.id, denied = decisions.len(), "Every action denied");
            return Err(PipelineError::PolicyDenied {
                reason: "All actions were denied by the safety gate.".to_string(),
                critical_blocked,
            });
        }

        for (candidate, decision) in approved.iter().zip(&approved_decisions) {
            self.audit_step(
                "action",
                self.audit
                    .record_action(&candidate.to_record(intent.id, decision.risk_level))
                    .await,
            );
        }

        let needs_confirmation = approved_decisions.iter().any(|d| d.requires_confirmation);
        if needs_confirmation && !self.simulate {
            if let Some(confirm) = &self.confirm {
                if !confirm(approved.as_slice(), approved_decisions.as_slice()) {
                    info!(intent_id = %intent.id, "Operator declined");
                    return Err(PipelineError::Cancelled);
                }
            }
        }

        let results = self.execute(&approved).await?;
        info!(
            intent_id = %intent.id,
            executed = results.len(),
            simulate = self.simulate,
            "Pipeline complete"
        );
        Ok(PipelineOutcome {
            intent,
            plan,
            decisions,
            results,
        })
    }

    /// Compensate a previously executed action and audit the attempt as a
    /// new execution record.
    pub async fn rollback(&self, candidate: &ActionCandidate) -> ActionResult {
        let result = self.executor.rollback(candidate).await;
        let record = result.to_record();
        self.audit_step("rollback", self.audit.record_execution(&record).await);
        result
    }

    async fn context(&self) -> String {
        match self.audit.recent(self.context_limit).await {
            Ok(records) => format_context(&records),
            Err(e) => {
                warn!(error = %e, "History unavailable, classifying without context");
                format_context(&[])
            }
        }
    }

    /// Runs in order and records each result as it lands, so actions that
    /// already ran stay audited when a later one fails.
    async fn execute(
        &self,
        approved: &[ActionCandidate],
    ) -> Result<Vec<ActionResult>, PipelineError> {
        let mut results = Vec::with_capacity(approved.len());
        for candidate in approved {
            match self.executor.execute(candidate, self.simulate).await {
                Ok(result) => {
                    let record = result.to_record();
                    self.audit_step("execution", self.audit.record_execution(&record).await);
                    results.push(result);
                }
                Err(e) => {
                    let failed = ActionResult::failed(candidate.id, e.message.clone());
                    let record = failed.to_record();
                    self.audit_step("execution", self.audit.record_execution(&record).await);
                    warn!(action_id = %candidate.id, error = %e, "Execution failed, aborting run");
                    return Err(e.into());
                }
            }
        }
        Ok(results)
    }

    fn audit_step(&self, step: &str, outcome: agentic_core::Result<()>) {
        if let Err(e) = outcome {
            warn!(step = step, error = %e, "Audit write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::MockProcessTable;
    use agentic_core::audit::InMemoryAuditLog;
    use agentic_core::error::ParseError;
    use agentic_core::intent::IntentType;
    use async_trait::async_trait;

    struct Fixed(IntentType);

    #[async_trait]
    impl IntentClassifier for Fixed {
        async fn classify(&self, query: &str, _context: &str) -> Result<ParsedIntent, ParseError> {
            if query.trim().is_empty() {
                return Err(ParseError::EmptyQuery);
            }
            Ok(ParsedIntent::new(query, self.0, 0.9))
        }
    }

    fn pipeline(intent: IntentType, max: RiskLevel) -> (Pipeline, Arc<InMemoryAuditLog>) {
        let audit = Arc::new(InMemoryAuditLog::new());
        let pipeline = Pipeline::new(
            Arc::new(Fixed(intent)),
            DecisionEngine::new(),
            SafetyGate::new(max, false),
            ActionExecutor::new(Arc::new(MockProcessTable::new())),
            audit.clone(),
        )
        .simulate(true);
        (pipeline, audit)
    }

    #[tokio::test]
    async fn test_empty_query_is_classification_error() {
        let (p, audit) = pipeline(IntentType::Focus, RiskLevel::High);
        let err = p.run("   ").await.unwrap_err();
        assert!(matches!(err, PipelineError::Classification(ParseError::EmptyQuery)));
        assert!(audit.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_intent_ends_quietly() {
        let (p, audit) = pipeline(IntentType::Unknown, RiskLevel::High);
        let outcome = p.run("what is the weather").await.unwrap();
        assert!(outcome.plan.is_empty());
        assert!(outcome.results.is_empty());
        assert_eq!(audit.requests().len(), 1);
        assert!(audit.decisions().is_empty());
    }

    #[tokio::test]
    async fn test_all_denied_is_policy_error() {
        let (p, audit) = pipeline(IntentType::Update, RiskLevel::Low);
        let err = p.run("upgrade everything").await.unwrap_err();
        match err {
            PipelineError::PolicyDenied {
                critical_blocked, ..
            } => assert!(!critical_blocked),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(audit.decisions().len(), 1);
        assert!(audit.actions().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_is_recorded_separately() {
        let (p, audit) = pipeline(IntentType::CleanMemory, RiskLevel::High);
        let outcome = p.run("free memory").await.unwrap();
        let first = outcome.plan.actions[0].clone();
        let undo = p.rollback(&first).await;
        assert!(!undo.rolled_back);
        let records = audit.executions();
        assert_eq!(records.len(), outcome.results.len() + 1);
        assert_eq!(records.iter().filter(|r| r.action_id == first.id).count(), 2);
    }
}
