//! CLEAN_MEMORY: drop caches, then terminate memory hogs.

use agentic_core::intent::{IntentType, ParsedIntent};

use crate::runner::memory::{DROP_CACHES_COMMAND, MEMORY_HOG_THRESHOLD_MB};
use crate::strategy::{plain_entity_values, IntentStrategy};
use crate::types::{ActionCandidate, ActionKind, SYSTEM_TARGET};

#[derive(Debug, Default, Clone, Copy)]
pub struct CleanMemoryStrategy;

impl IntentStrategy for CleanMemoryStrategy {
    fn intent_type(&self) -> IntentType {
        IntentType::CleanMemory
    }

    fn generate(&self, intent: &ParsedIntent) -> Vec<ActionCandidate> {
        // Caches go first so later steps see the reclaimed memory.
        let mut actions = vec![ActionCandidate::new(
            ActionKind::DropCaches,
            "Drop filesystem caches",
            "caches",
        )
        .with_command(DROP_CACHES_COMMAND)];

        let Some(targets) = plain_entity_values(intent, "process") else {
            actions.push(ActionCandidate::new(
                ActionKind::KillByMemory,
                format!(
                    "Kill top memory-consuming processes (>{}MB)",
                    MEMORY_HOG_THRESHOLD_MB
                ),
                SYSTEM_TARGET,
            ));
            return actions;
        };
        actions.extend(targets.into_iter().map(|target| {
            ActionCandidate::new(
                ActionKind::KillByMemory,
                format!("Kill memory-hogging process: {}", target),
                target,
            )
        }));
        actions
    }
}
