//! app-migrate core
//!
//! Moves applications off Rancher onto Argo CD, one namespace at a time:
//! - Preflight: kube context, namespace, Argo CD and Rancher sessions, RBAC
//! - Per application, concurrently: Argo CD sync check, Rancher app check,
//!   config map deletion, Rancher app deletion, Argo CD re-check
//! - A summary of every application that did not make it

pub mod config;
pub mod error;
pub mod fakes;
pub mod orchestrator;
pub mod outcome;
pub mod pipeline;
pub mod preflight;
pub mod progress;
pub mod report;
pub mod runner;
pub mod stage;
pub mod telemetry;
pub mod tools;

// Re-export key types
pub use config::{MigrationConfig, Region, SettleDelays};
pub use error::{MigrationError, Result};
pub use orchestrator::run_migration;
pub use outcome::{AppOutcome, StepResult};
pub use progress::Progress;
pub use report::MigrationReport;
pub use runner::{CommandOutput, CommandRunner, ProcessRunner, ToolCommand};
pub use stage::{AppStage, StepKind};
pub use telemetry::init_tracing;
