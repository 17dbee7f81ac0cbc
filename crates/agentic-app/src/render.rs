//! Plain-text rendering of pipeline outcomes and audit history.

use agentic_action::{ActionResult, PipelineOutcome, PolicyDecision};
use agentic_core::ParsedIntent;
use agentic_storage::HistoryEntry;

pub fn intent(intent: &ParsedIntent, verbose: bool) -> String {
    let mut out = format!(
        "Intent: {} (confidence: {:.2})",
        intent.intent_type, intent.confidence
    );
    if verbose {
        for entity in &intent.entities {
            out.push_str(&format!("\n  {}: {}", entity.name, entity.value));
        }
        if !intent.reasoning.is_empty() {
            out.push_str(&format!("\n  Reasoning: {}", intent.reasoning));
        }
    }
    out
}

fn decision_tag(decision: Option<&PolicyDecision>) -> String {
    match decision {
        Some(d) if d.approved => format!("[{}] approved", d.risk_level),
        Some(d) => format!("[{}] denied", d.risk_level),
        None => "[?] not evaluated".to_string(),
    }
}

/// The plan with each action's gate verdict; denial reasons only when verbose.
pub fn plan(outcome: &PipelineOutcome, verbose: bool) -> String {
    if outcome.plan.is_empty() {
        return format!("No actions planned. {}", outcome.plan.reasoning);
    }
    let mut lines = vec![format!("Plan: {}", outcome.plan.reasoning)];
    for (i, candidate) in outcome.plan.actions.iter().enumerate() {
        let decision = outcome.decision_for(candidate);
        lines.push(format!(
            "  {}. {} {}",
            i + 1,
            decision_tag(decision),
            candidate.description
        ));
        if let Some(d) = decision {
            if verbose || !d.approved {
                lines.push(format!("     {}", d.reason));
            }
        }
        if verbose {
            lines.push(format!("     id: {}", candidate.id));
        }
    }
    lines.join("\n")
}

pub fn result(result: &ActionResult) -> String {
    let status = match (result.success, result.rolled_back) {
        (true, true) => "ROLLED BACK",
        (true, false) => "OK",
        (false, _) => "FAILED",
    };
    let detail = if result.success {
        result.output.as_deref().unwrap_or("")
    } else {
        result.error.as_deref().unwrap_or("")
    };
    format!("[{}] {} {}", status, result.action_id, detail)
        .trim_end()
        .to_string()
}

pub fn results(results: &[ActionResult]) -> String {
    if results.is_empty() {
        return "Nothing was executed.".to_string();
    }
    results.iter().map(result).collect::<Vec<_>>().join("\n")
}

pub fn history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "No history yet.".to_string();
    }
    let mut lines = Vec::new();
    for entry in entries {
        let request = &entry.request;
        lines.push(format!(
            "{}  [{}] {} (confidence: {:.2})",
            request.created_at, request.intent_type, request.raw_query, request.confidence
        ));
        for action in &entry.actions {
            lines.push(format!(
                "    {}  {} [{}] {}",
                action.id, action.action_kind, action.risk_level, action.description
            ));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentic_action::{ActionCandidate, ActionKind, ActionPlan, SafetyGate};
    use agentic_core::audit::RequestRecord;
    use agentic_core::{IntentType, RiskLevel};

    fn outcome(gate: &SafetyGate) -> PipelineOutcome {
        let intent = ParsedIntent::new("install vim", IntentType::Update, 0.9)
            .with_entity("package", "vim")
            .with_reasoning("matched install pattern");
        let install = ActionCandidate::new(ActionKind::AptInstall, "Install package: vim", "vim");
        let plan = ActionPlan::new(intent.id, vec![install], "Generated 1 action(s) for UPDATE");
        let decisions = gate.evaluate_plan(&plan);
        PipelineOutcome {
            intent,
            plan,
            decisions,
            results: Vec::new(),
        }
    }

    #[test]
    fn test_intent_verbose_shows_entities_and_reasoning() {
        let out = outcome(&SafetyGate::new(RiskLevel::High, false));
        let terse = intent(&out.intent, false);
        assert_eq!(terse, "Intent: UPDATE (confidence: 0.90)");

        let verbose = intent(&out.intent, true);
        assert!(verbose.contains("package: vim"));
        assert!(verbose.contains("Reasoning: matched install pattern"));
    }

    #[test]
    fn test_plan_marks_approved_and_denied() {
        let approved = plan(&outcome(&SafetyGate::new(RiskLevel::High, false)), false);
        assert!(approved.contains("1. [MEDIUM] approved Install package: vim"));

        let denied = plan(&outcome(&SafetyGate::new(RiskLevel::Low, false)), false);
        assert!(denied.contains("[MEDIUM] denied"));
        assert_eq!(denied.lines().count(), 3);
    }

    #[test]
    fn test_empty_plan_shows_reasoning() {
        let intent = ParsedIntent::new("hello", IntentType::Unknown, 0.0);
        let out = PipelineOutcome {
            plan: ActionPlan::empty(intent.id, "Intent is UNKNOWN, no actions generated."),
            intent,
            decisions: Vec::new(),
            results: Vec::new(),
        };
        assert_eq!(
            plan(&out, true),
            "No actions planned. Intent is UNKNOWN, no actions generated."
        );
    }

    #[test]
    fn test_result_status_labels() {
        let id = uuid::Uuid::new_v4();
        assert!(result(&ActionResult::succeeded(id, "done")).starts_with("[OK]"));
        assert!(result(&ActionResult::failed(id, "boom")).ends_with("boom"));
        assert!(result(&ActionResult::rolled_back(id, "undone")).starts_with("[ROLLED BACK]"));
        assert_eq!(results(&[]), "Nothing was executed.");
    }

    #[test]
    fn test_history_lists_actions_under_request() {
        let intent = ParsedIntent::new("install vim", IntentType::Update, 0.9);
        let candidate = ActionCandidate::new(ActionKind::AptInstall, "Install package: vim", "vim");
        let entry = HistoryEntry {
            request: RequestRecord::from_intent(&intent),
            actions: vec![candidate.to_record(intent.id, RiskLevel::Medium)],
        };
        let text = history(&[entry]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[UPDATE] install vim"));
        assert!(lines[1].contains("APT_INSTALL [MEDIUM] Install package: vim"));
        assert_eq!(history(&[]), "No history yet.");
    }
}
