//! Pipeline scenarios against the in-memory audit log and a mock process
//! table. Every test builds its own pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use agentic_action::runner::procs::{ProcessCall, Signal};
use agentic_action::runner::{MemoryRunner, MockProcessTable};
use agentic_action::strategy::IntentStrategy;
use agentic_action::{
    ActionCandidate, ActionExecutor, ActionKind, ConfirmCallback, DecisionEngine, Permission,
    PermissionTable, Pipeline, PipelineError, PolicyDecision, SafetyGate, SYSTEM_TARGET,
};
use agentic_core::audit::InMemoryAuditLog;
use agentic_core::error::ParseError;
use agentic_core::intent::{IntentClassifier, IntentType, ParsedIntent};
use agentic_core::types::RiskLevel;
use async_trait::async_trait;

// =============================================================================
// Helpers
// =============================================================================

/// Classifier that always returns the same category and entities.
struct Scripted {
    intent_type: IntentType,
    entities: Vec<(&'static str, &'static str)>,
}

impl Scripted {
    fn new(intent_type: IntentType) -> Self {
        Self {
            intent_type,
            entities: Vec::new(),
        }
    }

    fn entity(mut self, name: &'static str, value: &'static str) -> Self {
        self.entities.push((name, value));
        self
    }
}

#[async_trait]
impl IntentClassifier for Scripted {
    async fn classify(&self, query: &str, _context: &str) -> Result<ParsedIntent, ParseError> {
        let mut intent = ParsedIntent::new(query, self.intent_type, 0.95);
        for (name, value) in &self.entities {
            intent = intent.with_entity(*name, *value);
        }
        Ok(intent)
    }
}

struct SuspendThenHogs;

impl IntentStrategy for SuspendThenHogs {
    fn intent_type(&self) -> IntentType {
        IntentType::CleanMemory
    }

    fn generate(&self, _intent: &ParsedIntent) -> Vec<ActionCandidate> {
        vec![
            ActionCandidate::new(ActionKind::SuspendProcess, "Suspend process: x", "x"),
            ActionCandidate::new(ActionKind::KillByMemory, "Kill memory hog: y", "y"),
        ]
    }
}

struct Harness {
    audit: Arc<InMemoryAuditLog>,
    table: Arc<MockProcessTable>,
}

impl Harness {
    fn new() -> Self {
        Self {
            audit: Arc::new(InMemoryAuditLog::new()),
            table: Arc::new(MockProcessTable::new()),
        }
    }

    fn executor(&self) -> ActionExecutor {
        ActionExecutor::new(self.table.clone())
    }

    fn pipeline(&self, classifier: Scripted, gate: SafetyGate) -> Pipeline {
        self.pipeline_with(classifier, gate, DecisionEngine::new(), self.executor())
    }

    fn pipeline_with(
        &self,
        classifier: Scripted,
        gate: SafetyGate,
        engine: DecisionEngine,
        executor: ActionExecutor,
    ) -> Pipeline {
        Pipeline::new(
            Arc::new(classifier),
            engine,
            gate,
            executor,
            self.audit.clone(),
        )
    }
}

fn counting_confirm(answer: bool) -> (ConfirmCallback, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let callback: ConfirmCallback =
        Box::new(move |_: &[ActionCandidate], _: &[PolicyDecision]| {
            seen.fetch_add(1, Ordering::SeqCst);
            answer
        });
    (callback, calls)
}

// =============================================================================
// Planning scenarios
// =============================================================================

#[tokio::test]
async fn test_focus_without_entities_suspends_default_distractions() {
    let h = Harness::new();
    let pipeline = h
        .pipeline(Scripted::new(IntentType::Focus), SafetyGate::new(RiskLevel::High, false))
        .simulate(true);

    let outcome = pipeline.run("help me focus").await.unwrap();
    assert_eq!(outcome.plan.actions.len(), 8);
    assert_eq!(outcome.results.len(), 8);
    for action in &outcome.plan.actions {
        assert_eq!(action.kind, ActionKind::SuspendProcess);
        let rollback = action.rollback_command.as_deref().unwrap_or_default();
        assert!(rollback.contains(action.target.as_str()));
    }
    for result in &outcome.results {
        assert!(result.success);
        assert!(result.output.as_deref().unwrap().starts_with("[DRY RUN] "));
    }

    assert_eq!(h.audit.requests().len(), 1);
    assert_eq!(h.audit.decisions().len(), 8);
    assert_eq!(h.audit.actions().len(), 8);
    assert_eq!(h.audit.executions().len(), 8);
    assert!(h.table.calls().is_empty());
}

#[tokio::test]
async fn test_update_with_package_installs_it() {
    let h = Harness::new();
    let pipeline = h
        .pipeline(
            Scripted::new(IntentType::Update).entity("package", "vim"),
            SafetyGate::new(RiskLevel::High, false),
        )
        .simulate(true);

    let outcome = pipeline.run("install vim").await.unwrap();
    assert_eq!(outcome.plan.actions.len(), 1);
    let action = &outcome.plan.actions[0];
    assert_eq!(action.kind, ActionKind::AptInstall);
    assert_eq!(action.target, "vim");
    assert_eq!(action.rollback_command.as_deref(), Some("apt remove -y vim"));

    let record = &h.audit.actions()[0];
    assert_eq!(record.risk_level, RiskLevel::Medium);
    assert_eq!(record.request_id, outcome.intent.id);
}

#[tokio::test]
async fn test_update_without_entities_upgrades_system() {
    let h = Harness::new();
    let pipeline = h
        .pipeline(Scripted::new(IntentType::Update), SafetyGate::new(RiskLevel::High, false))
        .simulate(true);

    let outcome = pipeline.run("update my system").await.unwrap();
    assert_eq!(outcome.plan.actions.len(), 1);
    assert_eq!(outcome.plan.actions[0].kind, ActionKind::AptUpgrade);
    assert_eq!(outcome.plan.actions[0].target, SYSTEM_TARGET);
    assert!(outcome.plan.actions[0].rollback_command.is_none());
}

#[tokio::test]
async fn test_low_ceiling_approves_suspend_only() {
    let h = Harness::new();
    let engine = DecisionEngine::empty().with_strategy(Box::new(SuspendThenHogs));
    let pipeline = h
        .pipeline_with(
            Scripted::new(IntentType::CleanMemory),
            SafetyGate::new(RiskLevel::Low, false),
            engine,
            h.executor(),
        )
        .simulate(true);

    let outcome = pipeline.run("tidy up").await.unwrap();
    assert_eq!(outcome.decisions.len(), 2);
    assert!(outcome.decisions[0].approved);
    assert!(!outcome.decisions[1].approved);
    assert!(outcome.decisions[1].reason.contains("exceeds"));

    // Denied actions stay in the plan for display but never run.
    assert_eq!(outcome.plan.actions.len(), 2);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].action_id, outcome.plan.actions[0].id);

    assert_eq!(h.audit.decisions().len(), 2);
    assert_eq!(h.audit.actions().len(), 1);
}

// =============================================================================
// Policy failures
// =============================================================================

#[tokio::test]
async fn test_every_action_denied_raises_policy_denied() {
    let h = Harness::new();
    let pipeline = h
        .pipeline(
            Scripted::new(IntentType::CleanMemory),
            SafetyGate::new(RiskLevel::Safe, false),
        )
        .simulate(true);

    let err = pipeline.run("free memory").await.unwrap_err();
    assert!(matches!(err, PipelineError::PolicyDenied { .. }));
    assert!(!err.suggests_force());
    assert!(h.audit.executions().is_empty());
}

#[tokio::test]
async fn test_critical_block_suggests_force() {
    let h = Harness::new();
    let table = PermissionTable::default()
        .with_override(ActionKind::SuspendProcess, Permission::new(RiskLevel::Critical, true));
    let gate = SafetyGate::with_permissions(RiskLevel::Critical, false, table);
    let pipeline = h
        .pipeline(Scripted::new(IntentType::Focus).entity("process", "steam"), gate)
        .simulate(true);

    let err = pipeline.run("pause steam").await.unwrap_err();
    assert!(err.suggests_force());
    let decision = &h.audit.decisions()[0];
    assert!(!decision.approved);
    assert!(decision.reason.contains("SUSPEND_PROCESS"));
    assert!(decision.requires_sudo);
}

#[tokio::test]
async fn test_forced_critical_runs_without_confirmation() {
    let h = Harness::new();
    let table = PermissionTable::default()
        .with_override(ActionKind::SuspendProcess, Permission::new(RiskLevel::Critical, false));
    let gate = SafetyGate::with_permissions(RiskLevel::Critical, true, table);
    let (confirm, calls) = counting_confirm(false);
    let pipeline = h
        .pipeline(Scripted::new(IntentType::Focus).entity("process", "steam"), gate)
        .with_confirm(confirm);
    h.table.add_process(42, "steam", 300);

    let outcome = pipeline.run("pause steam").await.unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert!(!outcome.decisions[0].requires_confirmation);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.table.calls().len(), 1);
}

// =============================================================================
// Confirmation
// =============================================================================

#[tokio::test]
async fn test_declined_confirmation_cancels_before_execution() {
    let h = Harness::new();
    h.table.add_process(7, "chrome", 900);
    let (confirm, calls) = counting_confirm(false);
    let pipeline = h
        .pipeline(
            Scripted::new(IntentType::CleanMemory).entity("process", "chrome"),
            SafetyGate::new(RiskLevel::High, false),
        )
        .with_confirm(confirm);

    let err = pipeline.run("chrome is hogging memory").await.unwrap_err();
    assert!(matches!(err, PipelineError::Cancelled));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(h.audit.executions().is_empty());
    assert_eq!(h.audit.actions().len(), 2);
    assert!(h.table.calls().is_empty());
}

#[tokio::test]
async fn test_simulate_skips_confirmation() {
    let h = Harness::new();
    let (confirm, calls) = counting_confirm(false);
    let pipeline = h
        .pipeline(
            Scripted::new(IntentType::CleanMemory),
            SafetyGate::new(RiskLevel::High, false),
        )
        .with_confirm(confirm)
        .simulate(true);

    let outcome = pipeline.run("free memory").await.unwrap();
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_low_risk_plan_needs_no_confirmation() {
    let h = Harness::new();
    h.table.add_process(3, "discord", 200);
    let (confirm, calls) = counting_confirm(false);
    let pipeline = h
        .pipeline(
            Scripted::new(IntentType::Focus).entity("process", "discord"),
            SafetyGate::new(RiskLevel::High, false),
        )
        .with_confirm(confirm);

    pipeline.run("pause discord").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.table.calls(), vec![ProcessCall::Signal(3, Signal::for_suspend())]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_confirmed_cleanup_terminates_hogs() {
    let h = Harness::new();
    h.table.add_process(20, "chrome", 1500);
    h.table.add_process(21, "bash", 4);
    let executor = h
        .executor()
        .with_runner(Arc::new(MemoryRunner::new(h.table.clone()).with_drop_caches_command("true")));
    let (confirm, calls) = counting_confirm(true);
    let pipeline = h
        .pipeline_with(
            Scripted::new(IntentType::CleanMemory),
            SafetyGate::new(RiskLevel::High, false),
            DecisionEngine::new(),
            executor,
        )
        .with_confirm(confirm);

    let outcome = pipeline.run("free memory").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(outcome.results.iter().all(|r| r.success));
    assert_eq!(h.table.calls(), vec![ProcessCall::Signal(20, Signal::Terminate)]);
    assert_eq!(h.audit.executions().len(), 2);
}

// =============================================================================
// Execution failures and rollback
// =============================================================================

#[tokio::test]
async fn test_focus_suspends_only_running_distractions() {
    let h = Harness::new();
    h.table.add_process(42, "slack", 300);
    let pipeline = h.pipeline(
        Scripted::new(IntentType::Focus),
        SafetyGate::new(RiskLevel::High, false),
    );

    let outcome = pipeline.run("help me focus").await.unwrap();
    assert_eq!(outcome.results.len(), 8);
    assert!(outcome.results.iter().all(|r| r.success));

    let absent = outcome
        .results
        .iter()
        .filter(|r| {
            r.output
                .as_deref()
                .unwrap_or_default()
                .starts_with("No matching processes found for: ")
        })
        .count();
    assert_eq!(absent, 7);
    assert_eq!(
        h.table.calls(),
        vec![ProcessCall::Signal(42, Signal::for_suspend())]
    );
    assert_eq!(h.audit.executions().len(), 8);
}

#[tokio::test]
async fn test_failure_stops_batch_and_is_audited() {
    let h = Harness::new();
    h.table.add_process(4, "discord", 100);
    h.table.add_process(5, "slack", 100);
    h.table.deny(4);
    let pipeline = h.pipeline(
        Scripted::new(IntentType::Focus)
            .entity("process", "discord")
            .entity("process", "slack"),
        SafetyGate::new(RiskLevel::High, false),
    );

    let err = pipeline.run("pause discord and slack").await.unwrap_err();
    let PipelineError::Execution(exec) = err else {
        panic!("expected execution failure");
    };
    assert!(exec.message.contains("pid 4"));
    let executions = h.audit.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].action_id, exec.action_id);
    assert!(!executions[0].success);
    assert!(h.table.calls().is_empty());
}

#[tokio::test]
async fn test_essential_target_refused_even_in_simulation() {
    let h = Harness::new();
    let pipeline = h
        .pipeline(
            Scripted::new(IntentType::Focus).entity("process", "sshd"),
            SafetyGate::new(RiskLevel::High, false),
        )
        .simulate(true);

    let err = pipeline.run("pause sshd").await.unwrap_err();
    assert!(matches!(err, PipelineError::Execution(_)));
    assert!(err.to_string().contains("essential"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_suspend_rollback_resumes_current_pids() {
    let h = Harness::new();
    h.table.add_process(30, "spotify", 250);
    let pipeline = h.pipeline(
        Scripted::new(IntentType::Focus).entity("process", "spotify"),
        SafetyGate::new(RiskLevel::High, false),
    );
    let outcome = pipeline.run("pause spotify").await.unwrap();
    let action = outcome.plan.actions[0].clone();

    h.table.add_process(31, "spotify", 250);
    let undo = pipeline.rollback(&action).await;
    assert!(undo.rolled_back);
    assert_eq!(
        h.table.calls(),
        vec![
            ProcessCall::Signal(30, Signal::Stop),
            ProcessCall::Signal(30, Signal::Continue),
            ProcessCall::Signal(31, Signal::Continue),
        ]
    );
    // Original execution plus the rollback attempt.
    assert_eq!(h.audit.executions().len(), 2);
}

#[tokio::test]
async fn test_memory_rollback_is_refused() {
    let h = Harness::new();
    let pipeline = h
        .pipeline(
            Scripted::new(IntentType::CleanMemory),
            SafetyGate::new(RiskLevel::High, false),
        )
        .simulate(true);
    let outcome = pipeline.run("free memory").await.unwrap();
    for action in &outcome.plan.actions {
        let undo = pipeline.rollback(action).await;
        assert!(!undo.success);
        assert!(!undo.rolled_back);
        assert!(!undo.error.unwrap_or_default().is_empty());
    }
}
