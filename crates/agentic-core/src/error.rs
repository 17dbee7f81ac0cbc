use thiserror::Error;

/// Top-level error type for the Agentic system.
///
/// Subsystem crates define their own error types for their domain failures
/// and fall back to this one for configuration, storage and I/O problems.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgenticError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for AgenticError {
    fn from(err: toml::de::Error) -> Self {
        AgenticError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AgenticError {
    fn from(err: toml::ser::Error) -> Self {
        AgenticError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AgenticError {
    fn from(err: serde_json::Error) -> Self {
        AgenticError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Agentic operations.
pub type Result<T> = std::result::Result<T, AgenticError>;

/// Failure to turn a free-text query into a classified intent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty query")]
    EmptyQuery,

    #[error("Classifier transport error: {0}")]
    Transport(String),

    #[error("Malformed classifier response: {0}")]
    Malformed(String),

    #[error("Classifier returned empty content")]
    MissingContent,
}
