//! Package runner: apt install and upgrade through the shell.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::ExecutionError;
use crate::runner::shell::run_shell;
use crate::runner::{dry_run, ActionRunner};
use crate::types::{ActionCandidate, ActionKind, ActionResult, RunnerFamily};

/// Runner for the package family.
///
/// Any non-zero exit status fails the action. Rollback runs the candidate's
/// stored compensating command.
#[derive(Debug, Default, Clone, Copy)]
pub struct PackageRunner;

impl PackageRunner {
    pub fn new() -> Self {
        Self
    }

    /// The candidate's command, or the standard one for its kind.
    pub fn command_for(candidate: &ActionCandidate) -> String {
        if !candidate.command.trim().is_empty() {
            return candidate.command.clone();
        }
        match candidate.kind {
            ActionKind::AptInstall => format!("apt install -y {}", candidate.target),
            _ => "apt update && apt upgrade -y".to_string(),
        }
    }
}

#[async_trait]
impl ActionRunner for PackageRunner {
    fn family(&self) -> RunnerFamily {
        RunnerFamily::Package
    }

    async fn run(
        &self,
        candidate: &ActionCandidate,
        simulate: bool,
    ) -> Result<ActionResult, ExecutionError> {
        if candidate.kind == ActionKind::AptInstall && candidate.targets_system() {
            return Err(ExecutionError::new(candidate.id, "No package specified"));
        }
        let command = Self::command_for(candidate);
        if simulate {
            return Ok(dry_run(candidate, format!("Would run: {}", command)));
        }

        let output = run_shell(&command).await.map_err(|e| {
            ExecutionError::new(candidate.id, format!("Failed to spawn '{}': {}", command, e))
        })?;
        if !output.success() {
            warn!(command = %command, status = ?output.status, "Package command failed");
            return Err(ExecutionError::new(candidate.id, output.failure_message()));
        }
        info!(kind = %candidate.kind, package = %candidate.target, "Package command succeeded");
        Ok(ActionResult::succeeded(candidate.id, output.text()))
    }

    async fn rollback(&self, candidate: &ActionCandidate) -> ActionResult {
        let Some(command) = candidate.rollback_command.as_deref() else {
            return ActionResult::failed(candidate.id, "No rollback command available");
        };
        match run_shell(command).await {
            Ok(output) if output.success() => {
                info!(package = %candidate.target, "Package action rolled back");
                ActionResult::rolled_back(candidate.id, output.text())
            }
            Ok(output) => ActionResult::failed(candidate.id, output.failure_message()),
            Err(e) => ActionResult::failed(
                candidate.id,
                format!("Failed to spawn '{}': {}", command, e),
            ),
        }
    }
}
