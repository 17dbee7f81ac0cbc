//! Service runner: start, stop and restart units through the init system.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::ExecutionError;
use crate::runner::shell::run_shell;
use crate::runner::{dry_run, rollback_unsupported, ActionRunner};
use crate::types::{ActionCandidate, ActionKind, ActionResult, RunnerFamily};

pub const DEFAULT_SERVICE_PROGRAM: &str = "systemctl";

/// Runner for the service family.
pub struct ServiceRunner {
    program: String,
}

impl Default for ServiceRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRunner {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_SERVICE_PROGRAM)
    }

    /// Use a different control program, e.g. `echo` in tests.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn verb(kind: ActionKind) -> Option<&'static str> {
        match kind {
            ActionKind::SystemctlStart => Some("start"),
            ActionKind::SystemctlStop => Some("stop"),
            ActionKind::SystemctlRestart => Some("restart"),
            _ => None,
        }
    }

    /// start and stop undo each other; restart undoes itself.
    pub fn inverse(kind: ActionKind) -> Option<ActionKind> {
        match kind {
            ActionKind::SystemctlStart => Some(ActionKind::SystemctlStop),
            ActionKind::SystemctlStop => Some(ActionKind::SystemctlStart),
            ActionKind::SystemctlRestart => Some(ActionKind::SystemctlRestart),
            _ => None,
        }
    }

    fn command(&self, verb: &str, service: &str) -> String {
        format!("{} {} {}", self.program, verb, service)
    }
}

#[async_trait]
impl ActionRunner for ServiceRunner {
    fn family(&self) -> RunnerFamily {
        RunnerFamily::Service
    }

    async fn run(
        &self,
        candidate: &ActionCandidate,
        simulate: bool,
    ) -> Result<ActionResult, ExecutionError> {
        let verb = Self::verb(candidate.kind).ok_or_else(|| {
            ExecutionError::new(
                candidate.id,
                format!("Service runner cannot handle {}", candidate.kind),
            )
        })?;
        if candidate.targets_system() {
            return Err(ExecutionError::new(candidate.id, "No service specified"));
        }
        let command = self.command(verb, &candidate.target);
        if simulate {
            return Ok(dry_run(candidate, format!("Would run: {}", command)));
        }

        let output = run_shell(&command).await.map_err(|e| {
            ExecutionError::new(candidate.id, format!("Failed to spawn '{}': {}", command, e))
        })?;
        if !output.success() {
            warn!(command = %command, status = ?output.status, "Service command failed");
            return Err(ExecutionError::new(candidate.id, output.failure_message()));
        }
        info!(service = %candidate.target, verb = verb, "Service command succeeded");
        let text = output.text();
        Ok(ActionResult::succeeded(
            candidate.id,
            if text.is_empty() { command } else { text },
        ))
    }

    async fn rollback(&self, candidate: &ActionCandidate) -> ActionResult {
        let Some(verb) = Self::inverse(candidate.kind).and_then(Self::verb) else {
            return rollback_unsupported(candidate);
        };
        let command = self.command(verb, &candidate.target);
        match run_shell(&command).await {
            Ok(output) if output.success() => {
                info!(service = %candidate.target, verb = verb, "Service action rolled back");
                ActionResult::rolled_back(candidate.id, command)
            }
            Ok(output) => ActionResult::failed(candidate.id, output.failure_message()),
            Err(e) => ActionResult::failed(
                candidate.id,
                format!("Failed to spawn '{}': {}", command, e),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_mapping() {
        assert_eq!(
            ServiceRunner::inverse(ActionKind::SystemctlStart),
            Some(ActionKind::SystemctlStop)
        );
        assert_eq!(
            ServiceRunner::inverse(ActionKind::SystemctlStop),
            Some(ActionKind::SystemctlStart)
        );
        assert_eq!(
            ServiceRunner::inverse(ActionKind::SystemctlRestart),
            Some(ActionKind::SystemctlRestart)
        );
        assert_eq!(ServiceRunner::inverse(ActionKind::DropCaches), None);
    }

    #[tokio::test]
    async fn test_simulate_uses_systemctl() {
        let c = ActionCandidate::new(ActionKind::SystemctlStop, "stop nginx", "nginx");
        let result = ServiceRunner::new().run(&c, true).await.unwrap();
        assert_eq!(
            result.output.as_deref(),
            Some("[DRY RUN] Would run: systemctl stop nginx")
        );
    }

    #[tokio::test]
    async fn test_missing_service_refused() {
        let c = ActionCandidate::new(ActionKind::SystemctlStart, "start", "");
        assert!(ServiceRunner::new().run(&c, true).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_and_rollback_with_echo() {
        let runner = ServiceRunner::with_program("echo");
        let c = ActionCandidate::new(ActionKind::SystemctlStart, "start nginx", "nginx");
        let result = runner.run(&c, false).await.unwrap();
        assert_eq!(result.output.as_deref(), Some("start nginx"));

        let undo = runner.rollback(&c).await;
        assert!(undo.rolled_back);
        assert_eq!(undo.output.as_deref(), Some("echo stop nginx"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_program_surfaces_error() {
        let runner = ServiceRunner::with_program("false");
        let c = ActionCandidate::new(ActionKind::SystemctlRestart, "restart x", "x");
        let err = runner.run(&c, false).await.unwrap_err();
        assert_eq!(err.action_id, c.id);
        let undo = runner.rollback(&c).await;
        assert!(!undo.success);
        assert!(!undo.rolled_back);
    }
}
