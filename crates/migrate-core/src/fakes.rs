//! In-memory fakes for the command runner and progress sink (testing only)
//!
//! [`ScriptedRunner`] answers each command line with a scripted
//! [`CommandOutput`] and records every invocation, so pipelines can be
//! exercised without kubectl, argocd or rancher installed.
//! [`RecordingProgress`] keeps the lines a run would have shown.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{MigrationError, Result};
use crate::progress::Progress;
use crate::runner::{CommandOutput, CommandRunner, ToolCommand};

/// Scripted runner keyed by the full, unredacted command line
/// (`program arg1 arg2 ...`).
///
/// Unscripted commands succeed with empty output. A command scripted with
/// several outputs returns them in order and then keeps repeating the last.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, VecDeque<CommandOutput>>>,
    missing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `command_line` with `output`.
    pub fn on(self, command_line: &str, output: CommandOutput) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(command_line.to_string(), VecDeque::from([output]));
        self
    }

    /// Queue `output` after whatever `command_line` already answers.
    pub fn then(self, command_line: &str, output: CommandOutput) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(command_line.to_string())
            .or_default()
            .push_back(output);
        self
    }

    /// Pretend `program` is not installed.
    pub fn missing(mut self, program: &str) -> Self {
        self.missing.insert(program.to_string());
        self
    }

    /// Every command line run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of times `command_line` was run.
    pub fn count(&self, command_line: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == command_line)
            .count()
    }

    fn command_line(command: &ToolCommand) -> String {
        std::iter::once(command.program.as_str())
            .chain(command.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &ToolCommand) -> Result<CommandOutput> {
        let line = Self::command_line(command);
        self.calls.lock().unwrap().push(line.clone());

        if self.missing.contains(&command.program) {
            return Err(MigrationError::Spawn {
                program: command.program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            });
        }

        let mut responses = self.responses.lock().unwrap();
        let output = match responses.get_mut(&line) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_default(),
            Some(queue) => queue.front().cloned().unwrap_or_default(),
            None => CommandOutput::success(""),
        };
        Ok(output)
    }
}

/// Progress sink that keeps every line in memory.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    lines: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line emitted so far, in order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Progress for RecordingProgress {
    fn line(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unscripted_command_succeeds() {
        let runner = ScriptedRunner::new();
        let output = runner
            .run(&ToolCommand::new("kubectl", ["get", "namespace", "ns"]))
            .await
            .unwrap();
        assert!(output.passed());
        assert_eq!(runner.calls(), vec!["kubectl get namespace ns".to_string()]);
    }

    #[tokio::test]
    async fn test_queued_outputs_then_repeat_last() {
        let cmd = ToolCommand::new("rancher", ["apps", "ls"]);
        let runner = ScriptedRunner::new()
            .then("rancher apps ls", CommandOutput::failure(1, "boom"))
            .then("rancher apps ls", CommandOutput::success("ok"));

        assert!(!runner.run(&cmd).await.unwrap().passed());
        assert_eq!(runner.run(&cmd).await.unwrap().stdout, "ok");
        assert_eq!(runner.run(&cmd).await.unwrap().stdout, "ok");
        assert_eq!(runner.count("rancher apps ls"), 3);
    }

    #[tokio::test]
    async fn test_missing_program() {
        let runner = ScriptedRunner::new().missing("argocd");
        let err = runner
            .run(&ToolCommand::new("argocd", ["app", "list"]))
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::Spawn { .. }));
    }

    #[test]
    fn test_recording_progress_keeps_order() {
        let progress = RecordingProgress::new();
        progress.line("first");
        progress.line("second");
        assert_eq!(progress.lines(), vec!["first", "second"]);
    }
}
