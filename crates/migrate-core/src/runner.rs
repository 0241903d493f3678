//! External command execution.

use crate::error::{MigrationError, Result};
use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

/// Flags whose following argument must never reach a log line.
const SECRET_FLAGS: [&str; 2] = ["-t", "--token"];

/// A fully-formed invocation of one external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Executable name, resolved through `PATH`.
    pub program: String,

    /// Arguments, passed verbatim.
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Command line with secret values replaced by `***`.
    pub fn redacted(&self) -> String {
        let mut parts = vec![self.program.clone()];
        let mut hide_next = false;
        for arg in &self.args {
            if hide_next {
                parts.push("***".to_string());
                hide_next = false;
                continue;
            }
            hide_next = SECRET_FLAGS.contains(&arg.as_str());
            parts.push(arg.clone());
        }
        parts.join(" ")
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code (0 = success, -1 when killed by a signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the process reported success.
    pub success: bool,
}

impl CommandOutput {
    /// A clean exit with `stdout`.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            success: true,
            ..Default::default()
        }
    }

    /// A non-zero exit with `stderr`.
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stderr: stderr.into(),
            success: false,
            ..Default::default()
        }
    }

    /// Whether this command passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// stderr when present, stdout otherwise, trimmed. Used in failure messages.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Executes external commands. The seam tests replace with
/// [`ScriptedRunner`](crate::fakes::ScriptedRunner).
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion and capture its output.
    ///
    /// A non-zero exit is an `Ok` output; `Err` means the process could not
    /// be started at all.
    async fn run(&self, command: &ToolCommand) -> Result<CommandOutput>;
}

/// Runs commands as child processes. No timeout: a hung tool blocks its caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &ToolCommand) -> Result<CommandOutput> {
        let start = Instant::now();
        debug!(command = %command, "Running command");

        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| MigrationError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| MigrationError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);

        debug!(
            command = %command,
            exit_code,
            duration_ms,
            "Command finished"
        );

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
            success: output.status.success(),
        })
    }
}
