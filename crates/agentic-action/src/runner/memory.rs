//! Memory runner: drop page caches and terminate memory hogs.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::ExecutionError;
use crate::runner::procs::{is_essential, ProcessInfo, ProcessTable, Signal, SystemProcessTable};
use crate::runner::shell::run_shell;
use crate::runner::{dry_run, ActionRunner};
use crate::types::{ActionCandidate, ActionKind, ActionResult, RunnerFamily};

/// Resident size above which a process counts as a memory hog.
pub const MEMORY_HOG_THRESHOLD_MB: u64 = 500;

pub const DROP_CACHES_COMMAND: &str = "sync && echo 3 > /proc/sys/vm/drop_caches";

/// Runner for the memory family. Nothing it does can be rolled back.
pub struct MemoryRunner {
    table: Arc<dyn ProcessTable>,
    drop_caches_command: String,
    threshold_bytes: u64,
}

impl MemoryRunner {
    pub fn new(table: Arc<dyn ProcessTable>) -> Self {
        Self {
            table,
            drop_caches_command: DROP_CACHES_COMMAND.to_string(),
            threshold_bytes: MEMORY_HOG_THRESHOLD_MB * 1024 * 1024,
        }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemProcessTable::new()))
    }

    /// Replace the cache-drop command, e.g. with a harmless one in tests.
    pub fn with_drop_caches_command(mut self, command: impl Into<String>) -> Self {
        self.drop_caches_command = command.into();
        self
    }

    /// Processes a KILL_BY_MEMORY candidate would terminate.
    ///
    /// The system-wide target selects every non-essential process above the
    /// threshold; anything else matches by name or command line.
    pub fn working_set(&self, candidate: &ActionCandidate) -> Vec<ProcessInfo> {
        let processes = self.table.list();
        if candidate.targets_system() {
            processes
                .into_iter()
                .filter(|p| p.rss_bytes > self.threshold_bytes && !is_essential(&p.name))
                .collect()
        } else {
            processes
                .into_iter()
                .filter(|p| p.matches(&candidate.target) && !is_essential(&p.name))
                .collect()
        }
    }

    async fn drop_caches(
        &self,
        candidate: &ActionCandidate,
        simulate: bool,
    ) -> Result<ActionResult, ExecutionError> {
        if simulate {
            return Ok(dry_run(candidate, "Would drop filesystem caches"));
        }
        let output = run_shell(&self.drop_caches_command).await.map_err(|e| {
            ExecutionError::new(candidate.id, format!("Failed to drop caches: {}", e))
        })?;
        if !output.success() {
            return Err(ExecutionError::new(
                candidate.id,
                format!("Failed to drop caches: {}", output.failure_message()),
            ));
        }
        info!("Filesystem caches dropped");
        Ok(ActionResult::succeeded(candidate.id, "Filesystem caches dropped"))
    }

    fn kill_by_memory(
        &self,
        candidate: &ActionCandidate,
        simulate: bool,
    ) -> Result<ActionResult, ExecutionError> {
        if !candidate.targets_system() && is_essential(&candidate.target) {
            return Err(ExecutionError::new(
                candidate.id,
                format!("Refusing to touch essential process: {}", candidate.target.trim()),
            ));
        }
        let hogs = self.working_set(candidate);
        if hogs.is_empty() {
            let msg = if candidate.targets_system() {
                format!("No processes above {} MB", MEMORY_HOG_THRESHOLD_MB)
            } else {
                format!("No matching processes found for: {}", candidate.target)
            };
            return Ok(if simulate {
                dry_run(candidate, msg)
            } else {
                ActionResult::succeeded(candidate.id, msg)
            });
        }

        let listing = hogs
            .iter()
            .map(|p| format!("{} (pid {}, {:.0} MB)", p.name, p.pid, p.rss_mb()))
            .collect::<Vec<_>>()
            .join(", ");
        if simulate {
            return Ok(dry_run(candidate, format!("Would terminate: {}", listing)));
        }

        for hog in &hogs {
            // Earlier terminations stand even if a later one fails.
            self.table.signal(hog.pid, Signal::Terminate).map_err(|e| {
                warn!(pid = hog.pid, process = %hog.name, error = %e, "Termination failed");
                ExecutionError::new(
                    candidate.id,
                    format!("Failed to terminate {} (pid {}): {}", hog.name, hog.pid, e),
                )
            })?;
        }
        info!(count = hogs.len(), "Memory hogs terminated");
        Ok(ActionResult::succeeded(
            candidate.id,
            format!("Terminated: {}", listing),
        ))
    }
}

#[async_trait]
impl ActionRunner for MemoryRunner {
    fn family(&self) -> RunnerFamily {
        RunnerFamily::Memory
    }

    async fn run(
        &self,
        candidate: &ActionCandidate,
        simulate: bool,
    ) -> Result<ActionResult, ExecutionError> {
        match candidate.kind {
            ActionKind::DropCaches => self.drop_caches(candidate, simulate).await,
            ActionKind::KillByMemory => self.kill_by_memory(candidate, simulate),
            other => Err(ExecutionError::new(
                candidate.id,
                format!("Memory runner cannot handle {}", other),
            )),
        }
    }

    async fn rollback(&self, candidate: &ActionCandidate) -> ActionResult {
        ActionResult::failed(candidate.id, "Cannot rollback memory cleanup actions")
    }
}
