//! CLI argument definitions for the Agentic application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Agentic: natural-language system management with a safety gate.
#[derive(Parser, Debug)]
#[command(name = "agentic", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Classify a request, gate the resulting actions and execute them.
    Ask {
        /// The request, e.g. "help me focus" or "install vim".
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Report what would happen without touching the system.
        #[arg(long = "dry-run")]
        dry_run: bool,

        /// Allow CRITICAL actions through the safety gate.
        #[arg(long = "force")]
        force: bool,

        /// Show classifier reasoning and every policy decision.
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },

    /// Show recent requests and the actions approved for them.
    History {
        /// Number of requests to show.
        #[arg(short = 'n', long = "limit")]
        limit: Option<usize>,
    },

    /// Reverse a previously executed action.
    Rollback {
        /// Action id as printed by `ask` or `history`.
        action_id: String,
    },

    /// Print the effective configuration.
    Config,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > AGENTIC_CONFIG env var > platform default (~/.agentic/config.toml).
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("AGENTIC_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".agentic").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".agentic").join("config.toml");
    }
    PathBuf::from("config.toml")
}
