//! UPDATE: install named packages, or upgrade the whole system.

use agentic_core::intent::{IntentType, ParsedIntent};

use crate::strategy::{plain_entity_values, IntentStrategy};
use crate::types::{ActionCandidate, ActionKind, SYSTEM_TARGET};

#[derive(Debug, Default, Clone, Copy)]
pub struct UpdateStrategy;

impl IntentStrategy for UpdateStrategy {
    fn intent_type(&self) -> IntentType {
        IntentType::Update
    }

    fn generate(&self, intent: &ParsedIntent) -> Vec<ActionCandidate> {
        let Some(packages) = plain_entity_values(intent, "package") else {
            // No compensation: there is no generic way to downgrade.
            return vec![ActionCandidate::new(
                ActionKind::AptUpgrade,
                "Upgrade all system packages",
                SYSTEM_TARGET,
            )
            .with_command("apt update && apt upgrade -y")];
        };
        packages
            .into_iter()
            .map(|pkg| {
                ActionCandidate::new(
                    ActionKind::AptInstall,
                    format!("Install package: {}", pkg),
                    pkg,
                )
                .with_command(format!("apt install -y {}", pkg))
                .with_rollback(format!("apt remove -y {}", pkg))
            })
            .collect()
    }
}
