//! Error types for the action engine.

use agentic_core::error::ParseError;
use uuid::Uuid;

/// A runner could not perform, or refused to perform, an action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExecutionError {
    /// The offending candidate.
    pub action_id: Uuid,
    pub message: String,
}

impl ExecutionError {
    pub fn new(action_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            action_id,
            message: message.into(),
        }
    }
}

/// Terminal failures of one pipeline invocation.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Intent classification failed: {0}")]
    Classification(#[from] ParseError),
    #[error("Policy denied: {reason}")]
    PolicyDenied {
        reason: String,
        /// At least one candidate was blocked for CRITICAL risk without force.
        critical_blocked: bool,
    },
    #[error("User cancelled execution")]
    Cancelled,
    #[error("Execution failed: {0}")]
    Execution(#[from] ExecutionError),
}

impl PipelineError {
    /// Whether re-running with the force override could change the outcome.
    pub fn suggests_force(&self) -> bool {
        matches!(
            self,
            PipelineError::PolicyDenied {
                critical_blocked: true,
                ..
            }
        )
    }
}
