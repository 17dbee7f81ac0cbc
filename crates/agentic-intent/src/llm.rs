//! LLM-backed classifier over an OpenAI-compatible chat completions API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use agentic_core::config::ClassifierConfig;
use agentic_core::error::{AgenticError, ParseError};
use agentic_core::intent::{Entity, IntentClassifier, IntentType, ParsedIntent};

use crate::prompt::{intent_schema, user_prompt, SYSTEM_PROMPT};

pub struct LlmClassifier {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    min_confidence: f32,
}

impl LlmClassifier {
    pub fn new(api_key: String, api_url: String, model: String, min_confidence: f32) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_url,
            model,
            min_confidence,
        }
    }

    /// Build from config, reading the key from the configured variable.
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, AgenticError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| AgenticError::Config(format!("{} not set", config.api_key_env)))?;
        Ok(Self::new(
            api_key,
            config.api_url.clone(),
            config.model.clone(),
            config.min_confidence,
        ))
    }

    async fn complete(&self, user: &str) -> Result<String, ParseError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: 0.0,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: intent_schema(),
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ParseError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ParseError::Transport(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| ParseError::Malformed(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ParseError::MissingContent)
    }
}

#[async_trait]
impl IntentClassifier for LlmClassifier {
    async fn classify(&self, query: &str, context: &str) -> Result<ParsedIntent, ParseError> {
        if query.trim().is_empty() {
            return Err(ParseError::EmptyQuery);
        }
        debug!(model = %self.model, "Requesting classification");
        let content = self.complete(&user_prompt(context, query)).await.map_err(|e| {
            warn!(error = %e, "LLM classification failed");
            e
        })?;
        parse_response(query, &content, self.min_confidence)
    }
}

#[derive(Deserialize)]
struct RawIntent {
    intent_type: String,
    confidence: f32,
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default)]
    reasoning: String,
}

/// Decode the model's JSON answer into a [`ParsedIntent`].
///
/// Answers below `min_confidence` are downgraded to UNKNOWN.
pub fn parse_response(
    query: &str,
    content: &str,
    min_confidence: f32,
) -> Result<ParsedIntent, ParseError> {
    let raw: RawIntent = serde_json::from_str(content)
        .map_err(|e| ParseError::Malformed(format!("invalid JSON: {}", e)))?;
    let mut intent_type: IntentType = raw
        .intent_type
        .parse()
        .map_err(ParseError::Malformed)?;
    if raw.confidence < min_confidence {
        intent_type = IntentType::Unknown;
    }
    let mut intent = ParsedIntent::new(query, intent_type, raw.confidence)
        .with_reasoning(raw.reasoning);
    intent.entities = raw.entities;
    Ok(intent)
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<Message<'a>>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
