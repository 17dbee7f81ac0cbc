use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AgenticError, Result};
use crate::types::RiskLevel;

/// Top-level configuration for the Agentic application.
///
/// Loaded from `~/.agentic/config.toml` by default. Each section corresponds
/// to one concern of the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgenticConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl AgenticConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AgenticConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AgenticError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Apply `AGENTIC_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Recognised keys: `AGENTIC_DRY_RUN`, `AGENTIC_MAX_RISK_LEVEL`,
    /// `AGENTIC_REQUIRE_CONFIRMATION`, `AGENTIC_LOG_LEVEL`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("AGENTIC_DRY_RUN") {
            self.execution.dry_run = parse_bool("AGENTIC_DRY_RUN", &value)?;
        }
        if let Some(value) = lookup("AGENTIC_MAX_RISK_LEVEL") {
            self.policy.max_risk_level = value
                .parse()
                .map_err(|e: String| AgenticError::Config(format!("AGENTIC_MAX_RISK_LEVEL: {}", e)))?;
        }
        if let Some(value) = lookup("AGENTIC_REQUIRE_CONFIRMATION") {
            self.policy.require_confirmation = parse_bool("AGENTIC_REQUIRE_CONFIRMATION", &value)?;
        }
        if let Some(value) = lookup("AGENTIC_LOG_LEVEL") {
            self.general.log_level = value.to_ascii_lowercase();
        }
        Ok(())
    }

    /// Path of the audit database inside the data directory.
    pub fn database_path(&self) -> PathBuf {
        resolve_home(&self.general.data_dir).join("history.db")
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AgenticError::Config(format!(
            "{}: expected a boolean, got '{}'",
            key, other
        ))),
    }
}

/// Expand a leading `~/` against the user's home directory.
pub fn resolve_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the audit database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.agentic".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Safety gate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Highest risk level the gate will approve.
    pub max_risk_level: RiskLevel,
    /// Wire the interactive confirmation prompt for MEDIUM+ actions.
    pub require_confirmation: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_risk_level: RiskLevel::High,
            require_confirmation: true,
        }
    }
}

/// Execution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Report intended effects without touching the system.
    pub dry_run: bool,
}

/// Which classifier implementation turns queries into intents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierBackend {
    /// Offline regex patterns.
    #[default]
    Patterns,
    /// OpenAI-compatible chat completions endpoint.
    Llm,
}

/// Intent classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,
    /// Chat completions endpoint for the `llm` backend.
    pub api_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Classifications below this confidence become UNKNOWN.
    pub min_confidence: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::Patterns,
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "AGENTIC_OPENAI_API_KEY".to_string(),
            min_confidence: 0.5,
        }
    }
}

/// Audit history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Recent requests handed to the classifier as context.
    pub context_limit: usize,
    /// Default row count for `agentic history`.
    pub history_limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            context_limit: 5,
            history_limit: 20,
        }
    }
}
