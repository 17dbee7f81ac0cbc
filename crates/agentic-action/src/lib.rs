//! Policy-gated action engine for Agentic.
//!
//! Turns classified intents into action plans, gates every candidate
//! through the safety policy, executes approved actions through per-family
//! runners and compensates them on request.

pub mod error;
pub mod executor;
pub mod pipeline;
pub mod policy;
pub mod runner;
pub mod strategy;
pub mod types;

pub use error::{ExecutionError, PipelineError};
pub use executor::ActionExecutor;
pub use pipeline::{ConfirmCallback, Pipeline, PipelineOutcome};
pub use policy::{Permission, PermissionTable, SafetyGate};
pub use runner::ActionRunner;
pub use strategy::{DecisionEngine, IntentStrategy};
pub use types::{
    ActionCandidate, ActionKind, ActionPlan, ActionResult, PolicyDecision, RunnerFamily,
    SYSTEM_TARGET,
};
