//! Agentic storage crate: SQLite audit trail.
//!
//! Provides a WAL-mode SQLite database with versioned migrations and the
//! [`AuditStore`], which implements [`agentic_core::AuditLog`] and serves the
//! history and rollback lookups of the CLI.

pub mod audit;
pub mod db;
pub mod migrations;

pub use audit::{AuditStore, HistoryEntry};
pub use db::Database;
