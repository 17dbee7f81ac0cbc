//! Runner trait and the four runner families.
//!
//! A runner executes the actions of one [`RunnerFamily`] and knows how to
//! compensate them, or refuses to. Dispatch from action kind to runner
//! lives in [`crate::executor`].

pub mod memory;
pub mod package;
pub mod process;
pub mod procs;
pub mod service;
pub mod shell;

use async_trait::async_trait;

use crate::error::ExecutionError;
use crate::types::{ActionCandidate, ActionResult, RunnerFamily};

pub use memory::MemoryRunner;
pub use package::PackageRunner;
pub use process::ProcessRunner;
pub use procs::{MockProcessTable, ProcessTable, SystemProcessTable};
pub use service::ServiceRunner;

/// Prefix marking output of a simulated run.
pub const DRY_RUN_PREFIX: &str = "[DRY RUN] ";

/// Executes and compensates the actions of one family.
#[async_trait]
pub trait ActionRunner: Send + Sync {
    /// The family this runner serves.
    fn family(&self) -> RunnerFamily;

    /// Perform the action, or only describe it when `simulate` is set.
    ///
    /// A simulated run never mutates the system and its output starts with
    /// [`DRY_RUN_PREFIX`].
    async fn run(
        &self,
        candidate: &ActionCandidate,
        simulate: bool,
    ) -> Result<ActionResult, ExecutionError>;

    /// Attempt the compensating operation.
    ///
    /// Never fails: unsupported or failed compensation comes back as a
    /// result with `rolled_back == false` and an error message.
    async fn rollback(&self, candidate: &ActionCandidate) -> ActionResult;
}

/// Standard failure for kinds without compensation.
pub(crate) fn rollback_unsupported(candidate: &ActionCandidate) -> ActionResult {
    ActionResult::failed(
        candidate.id,
        format!("Rollback not supported for {}", candidate.kind),
    )
}

pub(crate) fn dry_run(candidate: &ActionCandidate, message: impl AsRef<str>) -> ActionResult {
    ActionResult::succeeded(candidate.id, format!("{}{}", DRY_RUN_PREFIX, message.as_ref()))
}
