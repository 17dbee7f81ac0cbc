//! Classified intents and the classifier seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::ParseError;
use crate::types::Timestamp;

/// Intent categories a query can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentType {
    Focus,
    Update,
    CleanMemory,
    Unknown,
}

impl IntentType {
    pub const ALL: [IntentType; 4] = [
        IntentType::Focus,
        IntentType::Update,
        IntentType::CleanMemory,
        IntentType::Unknown,
    ];
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentType::Focus => write!(f, "FOCUS"),
            IntentType::Update => write!(f, "UPDATE"),
            IntentType::CleanMemory => write!(f, "CLEAN_MEMORY"),
            IntentType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl std::str::FromStr for IntentType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FOCUS" => Ok(IntentType::Focus),
            "UPDATE" => Ok(IntentType::Update),
            "CLEAN_MEMORY" => Ok(IntentType::CleanMemory),
            "UNKNOWN" => Ok(IntentType::Unknown),
            _ => Err(format!("Unknown intent type: {}", s)),
        }
    }
}

/// A named value pulled out of the query, e.g. `process=firefox`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub source: String,
}

impl Entity {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            source: value.clone(),
            value,
        }
    }
}

/// Output of the classifier for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub id: Uuid,
    pub raw_query: String,
    pub intent_type: IntentType,
    pub confidence: f32,
    pub entities: Vec<Entity>,
    pub reasoning: String,
    pub created_at: Timestamp,
}

impl ParsedIntent {
    pub fn new(raw_query: impl Into<String>, intent_type: IntentType, confidence: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            raw_query: raw_query.into(),
            intent_type,
            confidence: confidence.clamp(0.0, 1.0),
            entities: Vec::new(),
            reasoning: String::new(),
            created_at: Timestamp::now(),
        }
    }

    pub fn with_entity(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entities.push(Entity::new(name, value));
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Values of every entity with the given name, in extraction order.
    pub fn entity_values(&self, name: &str) -> Vec<&str> {
        self.entities
            .iter()
            .filter(|e| e.name == name)
            .map(|e| e.value.as_str())
            .collect()
    }

    pub fn is_unknown(&self) -> bool {
        self.intent_type == IntentType::Unknown
    }
}

/// Turns a free-text query plus history context into a classified intent.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, query: &str, context: &str) -> Result<ParsedIntent, ParseError>;
}
