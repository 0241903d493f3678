//! Step results and per-application outcomes.

use crate::stage::{AppStage, StepKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CHECK_MARK: char = '\u{2713}';
pub const CROSS_MARK: char = '\u{2718}';

/// Result of one step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepResult {
    pub step: StepKind,

    /// Whether the step passed. Skipped steps count as passed.
    pub passed: bool,

    /// Human-readable message, printed after the mark.
    pub message: String,

    pub finished_at: DateTime<Utc>,
}

impl StepResult {
    pub fn pass(step: StepKind, message: impl Into<String>) -> Self {
        Self {
            step,
            passed: true,
            message: message.into(),
            finished_at: Utc::now(),
        }
    }

    pub fn fail(step: StepKind, message: impl Into<String>) -> Self {
        Self {
            step,
            passed: false,
            message: message.into(),
            finished_at: Utc::now(),
        }
    }

    /// The console line for this result.
    pub fn line(&self) -> String {
        let mark = if self.passed { CHECK_MARK } else { CROSS_MARK };
        format!("{} {}", mark, self.message)
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line())
    }
}

/// Everything that happened to one application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppOutcome {
    pub application: String,

    /// Results in execution order. Nothing follows a failed step.
    pub steps: Vec<StepResult>,

    pub stage: AppStage,
}

impl AppOutcome {
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            steps: Vec::new(),
            stage: AppStage::Pending,
        }
    }

    /// Append `result` and advance the stage.
    ///
    /// Returns whether the step passed so callers can stop on failure.
    pub fn record(&mut self, result: StepResult) -> bool {
        let passed = result.passed;
        self.stage = self.stage.advance(result.step, passed);
        self.steps.push(result);
        passed
    }

    /// Record a failure that did not come from a step, such as a crashed task.
    pub fn abort(&mut self, message: impl Into<String>) {
        let step = self.stage.next_step().unwrap_or(StepKind::PostSyncCheck);
        self.record(StepResult::fail(step, message));
        self.stage = AppStage::Failed;
    }

    pub fn succeeded(&self) -> bool {
        self.stage == AppStage::PostSyncChecked
    }

    /// The failed step, if the pipeline failed.
    pub fn failure(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| !s.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.passed).count()
    }
}
