//! Shell command execution.

use super::SidecarError;
use crate::config::SidecarConfig;
use serde::Serialize;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Result of a command that ran to completion (any exit code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code; -1 when the process was killed by a signal.
    pub code: i32,
    /// The command line actually run, after platform translation.
    pub cmd_executed: String,
}

impl CommandOutput {
    /// What goes into the command transcript: stdout, or stderr if stdout is empty.
    pub fn transcript_text(&self) -> &str {
        if self.stdout.is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}

/// Runs commands under the sidecar policy.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    safe_mode: bool,
    deny_list: Vec<String>,
    timeout: Duration,
    windows: bool,
}

impl CommandRunner {
    pub fn new(config: &SidecarConfig) -> Self {
        Self {
            safe_mode: config.safe_mode,
            deny_list: config.deny_list.iter().map(|p| p.to_lowercase()).collect(),
            timeout: Duration::from_secs(config.command_timeout_seconds),
            windows: cfg!(windows),
        }
    }

    /// Override platform detection (used for `ls` translation).
    pub fn with_windows(mut self, windows: bool) -> Self {
        self.windows = windows;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether `command` contains a deny-listed substring (case-insensitive).
    pub fn is_denied(&self, command: &str) -> bool {
        let lower = command.to_lowercase();
        self.deny_list.iter().any(|pattern| lower.contains(pattern))
    }

    /// Validate and translate a command without running it.
    pub fn prepare(&self, command: &str) -> Result<String, SidecarError> {
        if command.trim().is_empty() {
            return Err(SidecarError::EmptyCommand);
        }

        if self.safe_mode && self.is_denied(command) {
            tracing::warn!(command, "Potentially dangerous command blocked");
            return Err(SidecarError::Forbidden {
                command: command.to_string(),
            });
        }

        Ok(self.translate(command))
    }

    /// `ls` has no native equivalent in cmd.exe; map it to `dir`.
    fn translate(&self, command: &str) -> String {
        if !self.windows {
            return command.to_string();
        }
        if command.trim() == "ls" {
            "dir".to_string()
        } else if let Some(rest) = command.strip_prefix("ls ") {
            format!("dir {}", rest)
        } else {
            command.to_string()
        }
    }

    fn shell_command(&self, command: &str) -> Command {
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Run `command` in `cwd` through the platform shell.
    ///
    /// The child is killed if the timeout elapses first.
    pub async fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, SidecarError> {
        let prepared = self.prepare(command)?;

        if !cwd.is_dir() {
            return Err(SidecarError::NotFound(format!(
                "Command not found: working directory {} does not exist",
                cwd.display()
            )));
        }

        tracing::info!(command = %prepared, cwd = %cwd.display(), "Executing command");

        let mut cmd = self.shell_command(&prepared);
        cmd.current_dir(cwd);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| map_spawn_error(&prepared, e))?,
            Err(_) => {
                tracing::warn!(command = %prepared, "Command timed out");
                return Err(SidecarError::Timeout {
                    seconds: self.timeout.as_secs(),
                    command: prepared,
                });
            }
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code().unwrap_or(-1),
            cmd_executed: prepared,
        })
    }
}

fn map_spawn_error(command: &str, e: io::Error) -> SidecarError {
    match e.kind() {
        io::ErrorKind::NotFound => SidecarError::NotFound(format!("Command not found: {}", e)),
        io::ErrorKind::PermissionDenied => {
            SidecarError::PermissionDenied(format!("Permission denied: {}", e))
        }
        _ => {
            tracing::error!(command, error = %e, "Command spawn failed");
            SidecarError::Execution(e.to_string())
        }
    }
}
