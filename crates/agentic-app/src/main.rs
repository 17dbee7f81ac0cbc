//! Agentic application binary - composition root.
//!
//! 1. Parse the command line and load configuration from TOML
//! 2. Initialize tracing (RUST_LOG, else the configured log level)
//! 3. Open the SQLite audit store
//! 4. Dispatch: `ask` runs the pipeline, `history` and `rollback` work
//!    against the audit store, `config` prints the effective settings

mod cli;
mod confirm;
mod render;
mod wiring;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use uuid::Uuid;

use agentic_action::{ActionCandidate, PipelineError};
use agentic_core::{AgenticConfig, AgenticError, AuditLog};

use cli::{CliArgs, Command};
use wiring::RunFlags;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let (config, load_error) = match AgenticConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (AgenticConfig::default(), Some(e)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match load_error {
        Some(e) if config_file.exists() => {
            tracing::warn!(path = %config_file.display(), error = %e, "Failed to load config, using defaults")
        }
        Some(_) => tracing::debug!(path = %config_file.display(), "No config file, using defaults"),
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
    }

    match run(args.command, config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, mut config: AgenticConfig) -> Result<ExitCode, AgenticError> {
    config.apply_env_overrides()?;

    match command {
        Command::Ask {
            query,
            dry_run,
            force,
            verbose,
        } => {
            let query = query.join(" ");
            ask(&config, &query, RunFlags { dry_run, force }, verbose).await
        }
        Command::History { limit } => {
            let store = wiring::audit_store(&config)?;
            let entries = store.history(limit.unwrap_or(config.history.history_limit))?;
            println!("{}", render::history(&entries));
            Ok(ExitCode::SUCCESS)
        }
        Command::Rollback { action_id } => rollback(&config, &action_id).await,
        Command::Config => {
            let text = toml::to_string_pretty(&config)?;
            print!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn ask(
    config: &AgenticConfig,
    query: &str,
    flags: RunFlags,
    verbose: bool,
) -> Result<ExitCode, AgenticError> {
    let classifier = wiring::classifier(config)?;
    let store = wiring::audit_store(config)?;
    let audit: Arc<dyn AuditLog> = store;
    let pipeline = wiring::pipeline(config, classifier, audit, flags)?;

    tracing::info!(query, simulate = pipeline.is_simulating(), "Handling request");

    match pipeline.run(query).await {
        Ok(outcome) => {
            println!("{}", render::intent(&outcome.intent, verbose));
            println!("{}", render::plan(&outcome, verbose));
            if !outcome.plan.is_empty() {
                println!("{}", render::results(&outcome.results));
                if pipeline.is_simulating() {
                    println!("Dry run: nothing was changed.");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            report_failure(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn report_failure(err: &PipelineError) {
    tracing::warn!(error = %err, "Request did not complete");
    match err {
        PipelineError::Classification(e) => {
            eprintln!("Could not understand the request: {}", e);
        }
        PipelineError::PolicyDenied { reason, .. } => {
            eprintln!("Blocked by policy: {}", reason);
            if err.suggests_force() {
                eprintln!("Re-run with --force to allow CRITICAL actions.");
            }
        }
        PipelineError::Cancelled => {
            eprintln!("Cancelled. No actions were executed.");
        }
        PipelineError::Execution(e) => {
            eprintln!("Action {} failed: {}", e.action_id, e.message);
            eprintln!("Actions before it were kept; see `agentic history`.");
        }
    }
}

async fn rollback(config: &AgenticConfig, action_id: &str) -> Result<ExitCode, AgenticError> {
    let id = match Uuid::parse_str(action_id.trim()) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Invalid action id '{}': {}", action_id, e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let store = wiring::audit_store(config)?;
    let Some(record) = store.get_action(id)? else {
        eprintln!("Action {} not found.", id);
        return Ok(ExitCode::FAILURE);
    };
    let candidate = ActionCandidate::from_record(&record).map_err(AgenticError::Serialization)?;

    let executor = wiring::executor()?;
    let result = executor.rollback(&candidate).await;
    if let Err(e) = store.record_execution(&result.to_record()).await {
        tracing::warn!(error = %e, action_id = %id, "Failed to record rollback");
    }

    println!("{}", render::result(&result));
    Ok(if result.rolled_back {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
