//! Prompt text and response schema for the LLM classifier.

use serde_json::{json, Value};

pub const SYSTEM_PROMPT: &str = r#"You are a Linux system management assistant. Your job is to classify user requests
into one of these intent types:
- FOCUS: The user wants to reduce distractions (kill/suspend browsers, media players, chat apps, etc.)
- UPDATE: The user wants to update or install system packages.
- CLEAN_MEMORY: The user wants to free up RAM, clear caches, or kill memory-hogging processes.
- UNKNOWN: The request does not match any known intent.

Respond ONLY with valid JSON matching the provided schema. Extract any relevant entities
(process names, package names, service names) from the query.
Provide a confidence score between 0.0 and 1.0 indicating how sure you are of the classification.
If confidence is below 0.5, use UNKNOWN.
"#;

pub const NO_CONTEXT: &str = "No previous context.";

pub fn user_prompt(context: &str, query: &str) -> String {
    let context = if context.trim().is_empty() {
        NO_CONTEXT
    } else {
        context
    };
    format!(
        "{}\n\nUser request: {}\n\nClassify this request and extract entities.\n",
        context, query
    )
}

/// Strict JSON schema for the `response_format` of a chat completion.
pub fn intent_schema() -> Value {
    json!({
        "name": "parsed_intent",
        "strict": true,
        "schema": {
            "type": "object",
            "properties": {
                "intent_type": {
                    "type": "string",
                    "enum": ["FOCUS", "UPDATE", "CLEAN_MEMORY", "UNKNOWN"],
                    "description": "The classified intent type."
                },
                "confidence": {
                    "type": "number",
                    "description": "Confidence score between 0.0 and 1.0."
                },
                "entities": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {
                                "type": "string",
                                "description": "Entity label (e.g., 'process', 'package', 'service')."
                            },
                            "value": { "type": "string", "description": "The extracted value." },
                            "source": {
                                "type": "string",
                                "description": "The substring from the query."
                            }
                        },
                        "required": ["name", "value", "source"],
                        "additionalProperties": false
                    },
                    "description": "Extracted entities from the query."
                },
                "reasoning": {
                    "type": "string",
                    "description": "Brief explanation of why this intent was chosen."
                }
            },
            "required": ["intent_type", "confidence", "entities", "reasoning"],
            "additionalProperties": false
        }
    })
}
