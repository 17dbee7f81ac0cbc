//! Builds the pipeline and its collaborators from configuration.

use std::sync::Arc;

use agentic_action::{ActionExecutor, DecisionEngine, Pipeline, SafetyGate};
use agentic_core::config::ClassifierBackend;
use agentic_core::{AgenticConfig, AgenticError, AuditLog, IntentClassifier};
use agentic_intent::{LlmClassifier, PatternClassifier};
use agentic_storage::{AuditStore, Database};

use crate::confirm;

/// Per-invocation switches from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunFlags {
    pub dry_run: bool,
    pub force: bool,
}

pub fn classifier(config: &AgenticConfig) -> Result<Arc<dyn IntentClassifier>, AgenticError> {
    let classifier: Arc<dyn IntentClassifier> = match config.classifier.backend {
        ClassifierBackend::Patterns => Arc::new(
            PatternClassifier::new(config.classifier.min_confidence)
                .map_err(|e| AgenticError::Config(format!("classifier patterns: {}", e)))?,
        ),
        ClassifierBackend::Llm => Arc::new(LlmClassifier::from_config(&config.classifier)?),
    };
    tracing::info!(backend = ?config.classifier.backend, "Intent classifier ready");
    Ok(classifier)
}

pub fn audit_store(config: &AgenticConfig) -> Result<Arc<AuditStore>, AgenticError> {
    let db_path = config.database_path();
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "Audit database opened");
    Ok(Arc::new(AuditStore::new(Arc::new(db))))
}

/// Executor with every runner family registered, or a config error naming
/// the missing ones.
pub fn executor() -> Result<ActionExecutor, AgenticError> {
    let executor = ActionExecutor::system();
    executor.validate().map_err(AgenticError::Config)?;
    Ok(executor)
}

pub fn gate(config: &AgenticConfig, force: bool) -> Result<SafetyGate, AgenticError> {
    let gate = SafetyGate::new(config.policy.max_risk_level, force);
    gate.permissions().validate().map_err(AgenticError::Config)?;
    Ok(gate)
}

pub fn pipeline(
    config: &AgenticConfig,
    classifier: Arc<dyn IntentClassifier>,
    audit: Arc<dyn AuditLog>,
    flags: RunFlags,
) -> Result<Pipeline, AgenticError> {
    let simulate = flags.dry_run || config.execution.dry_run;
    let mut pipeline = Pipeline::new(
        classifier,
        DecisionEngine::new(),
        gate(config, flags.force)?,
        executor()?,
        audit,
    )
    .simulate(simulate)
    .context_limit(config.history.context_limit);

    if config.policy.require_confirmation {
        pipeline = pipeline.with_confirm(confirm::terminal_confirm());
    }

    tracing::debug!(
        simulate,
        force = flags.force,
        max_risk = %config.policy.max_risk_level,
        confirm = config.policy.require_confirmation,
        "Pipeline assembled"
    );
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentic_core::{InMemoryAuditLog, RiskLevel};

    #[test]
    fn test_flags_or_config_enable_simulation() {
        let mut config = AgenticConfig::default();
        let audit: Arc<dyn AuditLog> = Arc::new(InMemoryAuditLog::new());

        let p = pipeline(
            &config,
            classifier(&config).unwrap(),
            Arc::clone(&audit),
            RunFlags::default(),
        )
        .unwrap();
        assert!(!p.is_simulating());

        let flags = RunFlags {
            dry_run: true,
            force: false,
        };
        let p = pipeline(&config, classifier(&config).unwrap(), Arc::clone(&audit), flags).unwrap();
        assert!(p.is_simulating());

        config.execution.dry_run = true;
        let p = pipeline(&config, classifier(&config).unwrap(), audit, RunFlags::default()).unwrap();
        assert!(p.is_simulating());
    }

    #[test]
    fn test_gate_follows_config_and_force() {
        let mut config = AgenticConfig::default();
        config.policy.max_risk_level = RiskLevel::Low;
        let gate = gate(&config, true).unwrap();
        assert_eq!(gate.max_risk(), RiskLevel::Low);
        assert!(gate.force());
    }

    #[test]
    fn test_executor_is_complete() {
        let executor = executor().unwrap();
        assert!(executor.missing_families().is_empty());
    }

    #[test]
    fn test_llm_backend_without_key_is_config_error() {
        let mut config = AgenticConfig::default();
        config.classifier.backend = ClassifierBackend::Llm;
        config.classifier.api_key_env = "AGENTIC_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        let err = classifier(&config).err().unwrap();
        assert!(matches!(err, AgenticError::Config(_)));
    }

    #[test]
    fn test_audit_store_created_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AgenticConfig::default();
        config.general.data_dir = dir.path().join("agentic").to_string_lossy().to_string();
        audit_store(&config).unwrap();
        assert!(config.database_path().exists());
    }
}
