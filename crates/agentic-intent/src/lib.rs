//! Intent classifiers for Agentic.
//!
//! [`PatternClassifier`] works offline from regular expressions;
//! [`LlmClassifier`] asks an OpenAI-compatible chat endpoint for structured
//! JSON. Both implement [`agentic_core::IntentClassifier`].

pub mod llm;
pub mod patterns;
pub mod prompt;

pub use llm::LlmClassifier;
pub use patterns::PatternClassifier;
