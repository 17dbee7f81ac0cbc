pub mod audit;
pub mod config;
pub mod error;
pub mod intent;
pub mod types;

pub use audit::{
    format_context, ActionRecord, AuditLog, ExecutionRecord, InMemoryAuditLog, PolicyRecord,
    RequestRecord,
};
pub use config::AgenticConfig;
pub use error::{AgenticError, ParseError, Result};
pub use intent::{Entity, IntentClassifier, IntentType, ParsedIntent};
pub use types::{RiskLevel, Timestamp};
