//! Action executor: routes candidates to their family's runner.
//!
//! Each action kind maps to exactly one [`RunnerFamily`]. Runners are built
//! lazily from registered factories and cached, so every kind of a family
//! shares one instance for the executor's lifetime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::error::ExecutionError;
use crate::runner::{
    ActionRunner, MemoryRunner, PackageRunner, ProcessRunner, ProcessTable, ServiceRunner,
    SystemProcessTable,
};
use crate::types::{ActionCandidate, ActionKind, ActionResult, RunnerFamily};

/// Builds a runner on first use.
pub type RunnerFactory = Box<dyn Fn() -> Arc<dyn ActionRunner> + Send + Sync>;

pub struct ActionExecutor {
    factories: HashMap<RunnerFamily, RunnerFactory>,
    cache: Mutex<HashMap<RunnerFamily, Arc<dyn ActionRunner>>>,
}

impl ActionExecutor {
    /// Executor with all four runner families, sharing `table` for process access.
    pub fn new(table: Arc<dyn ProcessTable>) -> Self {
        let process_table = Arc::clone(&table);
        let memory_table = table;
        Self::empty()
            .with_factory(RunnerFamily::Process, move || -> Arc<dyn ActionRunner> {
                Arc::new(ProcessRunner::new(Arc::clone(&process_table)))
            })
            .with_factory(RunnerFamily::Package, || -> Arc<dyn ActionRunner> {
                Arc::new(PackageRunner::new())
            })
            .with_factory(RunnerFamily::Memory, move || -> Arc<dyn ActionRunner> {
                Arc::new(MemoryRunner::new(Arc::clone(&memory_table)))
            })
            .with_factory(RunnerFamily::Service, || -> Arc<dyn ActionRunner> {
                Arc::new(ServiceRunner::new())
            })
    }

    /// Executor acting on the live system.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemProcessTable::new()))
    }

    /// Executor with no runners registered.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_factory<F>(mut self, family: RunnerFamily, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn ActionRunner> + Send + Sync + 'static,
    {
        self.factories.insert(family, Box::new(factory));
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(&family);
        }
        self
    }

    /// Register a prebuilt runner for its own family.
    pub fn with_runner(self, runner: Arc<dyn ActionRunner>) -> Self {
        let family = runner.family();
        self.with_factory(family, move || Arc::clone(&runner))
    }

    /// Families with no registered runner, in enumeration order.
    pub fn missing_families(&self) -> Vec<RunnerFamily> {
        RunnerFamily::ALL
            .into_iter()
            .filter(|f| !self.factories.contains_key(f))
            .collect()
    }

    /// Startup completeness check over every action kind.
    pub fn validate(&self) -> Result<(), String> {
        let missing: Vec<String> = ActionKind::ALL
            .into_iter()
            .filter(|k| !self.factories.contains_key(&k.family()))
            .map(|k| k.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("No runner registered for: {}", missing.join(", ")))
        }
    }

    /// Number of runner instances built so far.
    pub fn cached_runners(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn runner_for(&self, kind: ActionKind) -> Result<Arc<dyn ActionRunner>, String> {
        let family = kind.family();
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| "Runner cache lock poisoned".to_string())?;
        if let Some(runner) = cache.get(&family) {
            return Ok(Arc::clone(runner));
        }
        let factory = self
            .factories
            .get(&family)
            .ok_or_else(|| format!("No runner registered for {}", kind))?;
        let runner = factory();
        debug!(family = %family, "Runner constructed");
        cache.insert(family, Arc::clone(&runner));
        Ok(runner)
    }

    /// Run one candidate through its runner.
    pub async fn execute(
        &self,
        candidate: &ActionCandidate,
        simulate: bool,
    ) -> Result<ActionResult, ExecutionError> {
        let runner = self
            .runner_for(candidate.kind)
            .map_err(|msg| ExecutionError::new(candidate.id, msg))?;
        info!(
            action_id = %candidate.id,
            kind = %candidate.kind,
            simulate = simulate,
            "Executing action"
        );
        runner.run(candidate, simulate).await
    }

    /// Run candidates strictly in order, stopping at the first failure.
    pub async fn execute_many(
        &self,
        candidates: &[ActionCandidate],
        simulate: bool,
    ) -> Result<Vec<ActionResult>, ExecutionError> {
        let mut results = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let result = self.execute(candidate, simulate).await.map_err(|e| {
                warn!(action_id = %candidate.id, error = %e, "Action failed; aborting batch");
                e
            })?;
            results.push(result);
        }
        Ok(results)
    }

    /// Attempt to compensate a previously executed candidate. Never fails.
    pub async fn rollback(&self, candidate: &ActionCandidate) -> ActionResult {
        let runner = match self.runner_for(candidate.kind) {
            Ok(runner) => runner,
            Err(msg) => return ActionResult::failed(candidate.id, msg),
        };
        let result = runner.rollback(candidate).await;
        info!(
            action_id = %candidate.id,
            kind = %candidate.kind,
            rolled_back = result.rolled_back,
            "Rollback attempted"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::procs::{MockProcessTable, ProcessCall, Signal};
    use crate::types::SYSTEM_TARGET;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn executor(table: Arc<MockProcessTable>) -> ActionExecutor {
        ActionExecutor::new(table)
    }

    #[test]
    fn test_default_registry_is_complete() {
        let exec = executor(Arc::new(MockProcessTable::new()));
        assert!(exec.missing_families().is_empty());
        assert!(exec.validate().is_ok());
    }

    #[test]
    fn test_empty_registry_reports_every_kind() {
        let exec = ActionExecutor::empty();
        assert_eq!(exec.missing_families(), RunnerFamily::ALL.to_vec());
        let err = exec.validate().unwrap_err();
        for kind in ActionKind::ALL {
            assert!(err.contains(kind.as_str()));
        }
    }

    #[tokio::test]
    async fn test_unmapped_kind_is_execution_failure() {
        let exec = ActionExecutor::empty().with_runner(Arc::new(PackageRunner::new()));
        let c = ActionCandidate::new(ActionKind::DropCaches, "drop", "caches");
        let err = exec.execute(&c, true).await.unwrap_err();
        assert_eq!(err.action_id, c.id);
        assert_eq!(err.message, "No runner registered for DROP_CACHES");

        let undo = exec.rollback(&c).await;
        assert!(!undo.success);
        assert!(!undo.rolled_back);
    }

    #[tokio::test]
    async fn test_runner_constructed_once_per_family() {
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        let exec = ActionExecutor::empty().with_factory(RunnerFamily::Service, move || -> Arc<dyn ActionRunner> {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(ServiceRunner::new())
        });
        for kind in [
            ActionKind::SystemctlStart,
            ActionKind::SystemctlStop,
            ActionKind::SystemctlRestart,
        ] {
            let c = ActionCandidate::new(kind, "svc", "nginx");
            exec.execute(&c, true).await.unwrap();
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(exec.cached_runners(), 1);
    }

    #[tokio::test]
    async fn test_execute_many_preserves_order() {
        let exec = executor(Arc::new(MockProcessTable::new()));
        let batch = vec![
            ActionCandidate::new(ActionKind::DropCaches, "drop", "caches"),
            ActionCandidate::new(ActionKind::KillByMemory, "hogs", SYSTEM_TARGET),
            ActionCandidate::new(ActionKind::SystemctlStart, "start", "nginx"),
        ];
        let results = exec.execute_many(&batch, true).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.action_id).collect();
        let expected: Vec<_> = batch.iter().map(|c| c.id).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_execute_many_stops_at_first_failure() {
        let table = Arc::new(
            MockProcessTable::new()
                .with_process(3, "discord", 10)
                .with_process(4, "slack", 10),
        );
        table.deny(3);
        let exec = executor(table.clone());
        let batch = vec![
            ActionCandidate::new(ActionKind::KillProcess, "kill discord", "discord"),
            ActionCandidate::new(ActionKind::KillProcess, "kill slack", "slack"),
        ];
        let err = exec.execute_many(&batch, false).await.unwrap_err();
        assert_eq!(err.action_id, batch[0].id);
        assert!(table.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_routes_to_runner() {
        let table = Arc::new(MockProcessTable::new().with_process(8, "spotify", 10));
        let exec = executor(table.clone());
        let c = ActionCandidate::new(ActionKind::SuspendProcess, "pause", "spotify");
        exec.execute(&c, false).await.unwrap();
        let undo = exec.rollback(&c).await;
        assert_eq!(undo.action_id, c.id);
        if crate::runner::procs::pause_resume_supported() {
            assert!(undo.rolled_back);
            assert_eq!(table.calls().last(), Some(&ProcessCall::Signal(8, Signal::Continue)));
        }
    }

    struct FailingRunner;

    #[async_trait]
    impl ActionRunner for FailingRunner {
        fn family(&self) -> RunnerFamily {
            RunnerFamily::Package
        }

        async fn run(
            &self,
            candidate: &ActionCandidate,
            _simulate: bool,
        ) -> Result<ActionResult, ExecutionError> {
            Err(ExecutionError::new(candidate.id, "boom"))
        }

        async fn rollback(&self, candidate: &ActionCandidate) -> ActionResult {
            ActionResult::failed(candidate.id, "nope")
        }
    }

    #[tokio::test]
    async fn test_with_runner_replaces_family() {
        let exec = executor(Arc::new(MockProcessTable::new())).with_runner(Arc::new(FailingRunner));
        let c = ActionCandidate::new(ActionKind::AptUpgrade, "upgrade", SYSTEM_TARGET);
        let err = exec.execute(&c, true).await.unwrap_err();
        assert_eq!(err.message, "boom");
    }
}
