//! Interactive confirmation for MEDIUM+ actions.

use dialoguer::{theme::ColorfulTheme, Confirm};

use agentic_action::{ActionCandidate, ConfirmCallback, PolicyDecision};

/// Confirmation callback backed by a terminal yes/no prompt defaulting to no.
///
/// A prompt that cannot be shown (no TTY, read error) counts as a refusal.
pub fn terminal_confirm() -> ConfirmCallback {
    Box::new(|candidates: &[ActionCandidate], decisions: &[PolicyDecision]| {
        eprintln!("{}", summary(candidates, decisions));
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt_text(candidates.len()))
            .default(false)
            .interact()
            .unwrap_or(false)
    })
}

fn prompt_text(count: usize) -> String {
    if count == 1 {
        "Proceed with this action?".to_string()
    } else {
        format!("Proceed with these {} actions?", count)
    }
}

/// One line per approved candidate with its risk and sudo requirement.
pub fn summary(candidates: &[ActionCandidate], decisions: &[PolicyDecision]) -> String {
    let mut lines = vec!["The following actions need confirmation:".to_string()];
    for candidate in candidates {
        let decision = decisions.iter().find(|d| d.action_id == candidate.id);
        let risk = decision
            .map(|d| d.risk_level.to_string())
            .unwrap_or_else(|| "?".to_string());
        let sudo = if decision.is_some_and(|d| d.requires_sudo) {
            " [sudo]"
        } else {
            ""
        };
        lines.push(format!("  - [{}]{} {}", risk, sudo, candidate.description));
    }
    lines.join("\n")
}
