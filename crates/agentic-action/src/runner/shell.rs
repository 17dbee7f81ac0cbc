//! Shell command execution shared by the package, memory and service runners.

use std::io;

use tokio::process::Command;
use tracing::debug;

/// Captured result of one shell invocation.
#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stdout, or stderr when stdout is empty.
    pub fn text(&self) -> String {
        let out = self.stdout.trim();
        if out.is_empty() {
            self.stderr.trim().to_string()
        } else {
            out.to_string()
        }
    }

    /// Diagnostic for a non-zero exit.
    pub fn failure_message(&self) -> String {
        let detail = self.stderr.trim();
        let detail = if detail.is_empty() { self.stdout.trim() } else { detail };
        match self.status {
            Some(code) if detail.is_empty() => format!("Command exited with status {}", code),
            Some(code) => format!("Command exited with status {}: {}", code, detail),
            None if detail.is_empty() => "Command terminated by signal".to_string(),
            None => format!("Command terminated by signal: {}", detail),
        }
    }
}

/// Run `command` through `sh -c` and wait for it. No timeout is applied.
pub async fn run_shell(command: &str) -> io::Result<ShellOutput> {
    debug!(command = %command, "Spawning shell command");
    let output = Command::new("sh").arg("-c").arg(command).output().await?;
    Ok(ShellOutput {
        status: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
