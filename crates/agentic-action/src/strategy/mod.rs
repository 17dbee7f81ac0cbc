//! Candidate generation per intent category and the decision engine.

pub mod clean_memory;
pub mod focus;
pub mod update;

use std::collections::HashMap;

use agentic_core::intent::{IntentType, ParsedIntent};
use tracing::{debug, warn};

use crate::types::{ActionCandidate, ActionPlan};

pub use clean_memory::CleanMemoryStrategy;
pub use focus::FocusStrategy;
pub use update::UpdateStrategy;

/// Maps one intent category to a list of action proposals.
pub trait IntentStrategy: Send + Sync {
    /// The category this strategy serves.
    fn intent_type(&self) -> IntentType;

    fn generate(&self, intent: &ParsedIntent) -> Vec<ActionCandidate>;
}

/// Whether an entity value is a plain package or process name: an ASCII
/// letter or digit followed by letters, digits and `+-._`.
///
/// Values end up inside shell commands, so anything else is rejected.
pub fn is_plain_name(value: &str) -> bool {
    let mut chars = value.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || "+-._".contains(c))
}

/// Values of the entities called `name`, minus any that are not plain names.
///
/// Returns `None` when the intent carries no such entity at all, so callers
/// can tell "nothing named" from "everything named was rejected".
pub(crate) fn plain_entity_values<'a>(
    intent: &'a ParsedIntent,
    name: &str,
) -> Option<Vec<&'a str>> {
    let values = intent.entity_values(name);
    if values.is_empty() {
        return None;
    }
    Some(
        values
            .into_iter()
            .filter(|value| {
                let ok = is_plain_name(value);
                if !ok {
                    warn!(entity = name, value = %value, "Dropped entity that is not a plain name");
                }
                ok
            })
            .collect(),
    )
}

/// Turns classified intents into action plans.
pub struct DecisionEngine {
    strategies: HashMap<IntentType, Box<dyn IntentStrategy>>,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionEngine {
    /// Engine with the focus, update and clean-memory strategies.
    pub fn new() -> Self {
        Self::empty()
            .with_strategy(Box::new(FocusStrategy::default()))
            .with_strategy(Box::new(UpdateStrategy))
            .with_strategy(Box::new(CleanMemoryStrategy))
    }

    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: Box<dyn IntentStrategy>) -> Self {
        self.register(strategy);
        self
    }

    /// Register a strategy, replacing any previous one for its category.
    pub fn register(&mut self, strategy: Box<dyn IntentStrategy>) {
        self.strategies.insert(strategy.intent_type(), strategy);
    }

    pub fn has_strategy(&self, intent_type: IntentType) -> bool {
        self.strategies.contains_key(&intent_type)
    }

    pub fn decide(&self, intent: &ParsedIntent) -> ActionPlan {
        if intent.is_unknown() {
            return ActionPlan::empty(intent.id, "Intent is UNKNOWN, no actions generated.");
        }
        let Some(strategy) = self.strategies.get(&intent.intent_type) else {
            return ActionPlan::empty(
                intent.id,
                format!("No strategy registered for {}.", intent.intent_type),
            );
        };
        let actions = strategy.generate(intent);
        debug!(intent = %intent.intent_type, count = actions.len(), "Plan generated");
        let reasoning = format!(
            "Generated {} action(s) for {}.",
            actions.len(),
            intent.intent_type
        );
        ActionPlan::new(intent.id, actions, reasoning)
    }
}
