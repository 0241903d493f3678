//! Aggregate result of a migration run and its summary text.

use crate::error::Result;
use crate::outcome::{AppOutcome, StepResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Width of the separator printed before the summary.
const SEPARATOR_WIDTH: usize = 20;

/// Result of a complete run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub run_id: String,

    pub started_at: DateTime<Utc>,

    /// Preflight results. Only present on reports for runs that got past preflight.
    pub preflight: Vec<StepResult>,

    /// One outcome per application, in the order the applications were given.
    pub outcomes: Vec<AppOutcome>,

    pub duration_ms: u64,
}

impl MigrationReport {
    /// Whether every application made it through every step.
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|o| o.succeeded())
    }

    /// Number of applications fully migrated.
    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    /// Number of applications that failed.
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }

    /// One message per failed application. Each message names the
    /// application through its `[<app>-<ns>-<region>]` tag.
    pub fn failures(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| !o.succeeded())
            .map(|o| match o.failure() {
                Some(step) => step.message.clone(),
                None => format!("[{}] pipeline did not finish", o.application),
            })
            .collect()
    }

    /// The summary block printed once every pipeline has finished.
    pub fn summary(&self) -> String {
        let mut lines = vec!["=".repeat(SEPARATOR_WIDTH)];
        let failures = self.failures();
        if failures.is_empty() {
            lines.push("no issues found; migration complete".to_string());
        } else {
            lines.push(format!("found {} issues:", failures.len()));
            lines.extend(failures);
        }
        lines.join("\n")
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
