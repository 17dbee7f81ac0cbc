//! FOCUS: suspend distracting applications.

use agentic_core::intent::{IntentType, ParsedIntent};

use crate::strategy::{plain_entity_values, IntentStrategy};
use crate::types::{ActionCandidate, ActionKind};

/// Applications suspended when the request names none.
pub const DEFAULT_DISTRACTIONS: [&str; 8] = [
    "firefox", "chrome", "chromium", "slack", "discord", "spotify", "telegram", "signal",
];

pub struct FocusStrategy {
    distractions: Vec<String>,
}

impl Default for FocusStrategy {
    fn default() -> Self {
        Self::with_distractions(DEFAULT_DISTRACTIONS)
    }
}

impl FocusStrategy {
    pub fn with_distractions<I, S>(distractions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            distractions: distractions.into_iter().map(Into::into).collect(),
        }
    }

    fn suspend(target: &str) -> ActionCandidate {
        ActionCandidate::new(
            ActionKind::SuspendProcess,
            format!("Suspend process: {}", target),
            target,
        )
        .with_command(format!("kill -STOP $(pgrep -f {})", target))
        .with_rollback(format!("kill -CONT $(pgrep -f {})", target))
    }
}

impl IntentStrategy for FocusStrategy {
    fn intent_type(&self) -> IntentType {
        IntentType::Focus
    }

    fn generate(&self, intent: &ParsedIntent) -> Vec<ActionCandidate> {
        match plain_entity_values(intent, "process") {
            None => self.distractions.iter().map(|t| Self::suspend(t)).collect(),
            Some(named) => named.into_iter().map(Self::suspend).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_no_process_entities() {
        let intent = ParsedIntent::new("I need to focus", IntentType::Focus, 0.9);
        let actions = FocusStrategy::default().generate(&intent);
        assert_eq!(actions.len(), DEFAULT_DISTRACTIONS.len());
        for (action, name) in actions.iter().zip(DEFAULT_DISTRACTIONS) {
            assert_eq!(action.kind, ActionKind::SuspendProcess);
            assert_eq!(action.target, name);
            let rollback = action.rollback_command.as_deref().unwrap();
            assert!(!rollback.is_empty());
            assert!(rollback.contains(name));
        }
    }

    #[test]
    fn test_named_processes_replace_defaults() {
        let intent = ParsedIntent::new("pause steam", IntentType::Focus, 0.9)
            .with_entity("process", "steam")
            .with_entity("package", "vim");
        let actions = FocusStrategy::default().generate(&intent);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].target, "steam");
        assert_eq!(actions[0].command, "kill -STOP $(pgrep -f steam)");
        assert_eq!(
            actions[0].rollback_command.as_deref(),
            Some("kill -CONT $(pgrep -f steam)")
        );
    }

    #[test]
    fn test_rejected_names_do_not_fall_back_to_defaults() {
        let intent = ParsedIntent::new("pause it", IntentType::Focus, 0.9)
            .with_entity("process", "x`reboot`");
        assert!(FocusStrategy::default().generate(&intent).is_empty());
    }

    #[test]
    fn test_custom_distractions() {
        let intent = ParsedIntent::new("focus", IntentType::Focus, 0.9);
        let actions = FocusStrategy::with_distractions(["steam"]).generate(&intent);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].description, "Suspend process: steam");
    }
}
