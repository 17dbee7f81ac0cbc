//! Process runner: kill, suspend and renice by target name.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::ExecutionError;
use crate::runner::procs::{is_essential, pause_resume_supported, ProcessTable, Signal, SystemProcessTable};
use crate::runner::{dry_run, rollback_unsupported, ActionRunner};
use crate::types::{ActionCandidate, ActionKind, ActionResult, RunnerFamily};

/// Parameter carrying the niceness for RENICE_PROCESS.
pub const NICENESS_PARAM: &str = "niceness";
pub const DEFAULT_NICENESS: i32 = 10;

/// Runner for the process family.
///
/// Targets are resolved to pids at call time by case-insensitive match on
/// the process name or command line. Essential processes are refused before
/// anything else, including in simulate mode.
pub struct ProcessRunner {
    table: Arc<dyn ProcessTable>,
}

impl ProcessRunner {
    pub fn new(table: Arc<dyn ProcessTable>) -> Self {
        Self { table }
    }

    /// Runner backed by the live process table.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemProcessTable::new()))
    }

    /// Whether a suspend can later be resumed on this platform.
    ///
    /// When false, SUSPEND_PROCESS terminates its targets instead.
    pub fn suspend_is_reversible(&self) -> bool {
        pause_resume_supported()
    }

    fn niceness(candidate: &ActionCandidate) -> Result<i32, ExecutionError> {
        match candidate.parameters.get(NICENESS_PARAM) {
            None => Ok(DEFAULT_NICENESS),
            Some(raw) => raw.trim().parse::<i32>().map_err(|_| {
                ExecutionError::new(candidate.id, format!("Invalid niceness value: {}", raw))
            }),
        }
    }

    fn verb(kind: ActionKind) -> &'static str {
        match kind {
            ActionKind::SuspendProcess => "suspend",
            ActionKind::ReniceProcess => "renice",
            _ => "kill",
        }
    }

    fn signal_all(
        &self,
        candidate: &ActionCandidate,
        pids: &[u32],
        signal: Signal,
    ) -> Result<(), ExecutionError> {
        for pid in pids {
            self.table.signal(*pid, signal).map_err(|e| {
                ExecutionError::new(
                    candidate.id,
                    format!("Failed to signal pid {} ({}): {}", pid, candidate.target, e),
                )
            })?;
        }
        Ok(())
    }
}

fn pid_list(pids: &[u32]) -> String {
    pids.iter().map(u32::to_string).collect::<Vec<_>>().join(", ")
}

#[async_trait]
impl ActionRunner for ProcessRunner {
    fn family(&self) -> RunnerFamily {
        RunnerFamily::Process
    }

    async fn run(
        &self,
        candidate: &ActionCandidate,
        simulate: bool,
    ) -> Result<ActionResult, ExecutionError> {
        let target = candidate.target.trim();
        if is_essential(target) {
            warn!(kind = %candidate.kind, process = %target, "Refused action on essential process");
            return Err(ExecutionError::new(
                candidate.id,
                format!("Refusing to touch essential process: {}", target),
            ));
        }
        if target.is_empty() {
            return Err(ExecutionError::new(candidate.id, "No target process specified"));
        }

        let verb = Self::verb(candidate.kind);
        if simulate {
            return Ok(dry_run(candidate, format!("Would {} process: {}", verb, target)));
        }

        let pids = self.table.find_pids(target);
        if pids.is_empty() {
            info!(kind = %candidate.kind, process = %target, "Nothing to do, no matching process");
            return Ok(ActionResult::succeeded(
                candidate.id,
                format!("No matching processes found for: {}", target),
            ));
        }

        let output = match candidate.kind {
            ActionKind::KillProcess => {
                self.signal_all(candidate, &pids, Signal::Terminate)?;
                format!(
                    "Killed {} process(es) matching '{}' (pids: {})",
                    pids.len(),
                    target,
                    pid_list(&pids)
                )
            }
            ActionKind::SuspendProcess => {
                let signal = Signal::for_suspend();
                self.signal_all(candidate, &pids, signal)?;
                if signal == Signal::Stop {
                    format!(
                        "Suspended {} process(es) matching '{}' (pids: {})",
                        pids.len(),
                        target,
                        pid_list(&pids)
                    )
                } else {
                    warn!(process = %target, "No stop signal on this platform; terminated instead of suspending");
                    format!(
                        "Terminated {} process(es) matching '{}' (pids: {}); this platform cannot suspend, so the action is not reversible",
                        pids.len(),
                        target,
                        pid_list(&pids)
                    )
                }
            }
            ActionKind::ReniceProcess => {
                let niceness = Self::niceness(candidate)?;
                for pid in &pids {
                    self.table.renice(*pid, niceness).map_err(|e| {
                        ExecutionError::new(
                            candidate.id,
                            format!("Failed to renice pid {} ({}): {}", pid, target, e),
                        )
                    })?;
                }
                format!(
                    "Reniced {} process(es) matching '{}' to {} (pids: {})",
                    pids.len(),
                    target,
                    niceness,
                    pid_list(&pids)
                )
            }
            other => {
                return Err(ExecutionError::new(
                    candidate.id,
                    format!("Process runner cannot handle {}", other),
                ))
            }
        };

        info!(kind = %candidate.kind, process = %target, count = pids.len(), "Process action executed");
        Ok(ActionResult::succeeded(candidate.id, output))
    }

    async fn rollback(&self, candidate: &ActionCandidate) -> ActionResult {
        if candidate.kind != ActionKind::SuspendProcess {
            return rollback_unsupported(candidate);
        }
        let Some(signal) = Signal::for_resume() else {
            return ActionResult::failed(
                candidate.id,
                "Cannot resume: suspend terminated the process on this platform",
            );
        };

        // Pids may differ from suspend time; resume whatever matches now.
        let pids = self.table.find_pids(&candidate.target);
        let mut resumed = 0;
        for pid in &pids {
            match self.table.signal(*pid, signal) {
                Ok(()) => resumed += 1,
                Err(e) => warn!(pid = pid, error = %e, "Failed to resume process"),
            }
        }
        info!(process = %candidate.target, resumed = resumed, "Suspend rolled back");
        ActionResult::rolled_back(
            candidate.id,
            format!("Resumed {} process(es) matching '{}'", resumed, candidate.target),
        )
    }
}
