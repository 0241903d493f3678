//! Run orchestration: preflight, then one task per application.

use crate::config::MigrationConfig;
use crate::error::Result;
use crate::outcome::AppOutcome;
use crate::pipeline::run_application;
use crate::preflight::run_preflight;
use crate::progress::Progress;
use crate::report::MigrationReport;
use crate::runner::CommandRunner;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// Run the whole migration.
///
/// Preflight failures return `Err` before any application is touched.
/// Application failures are reported in the returned [`MigrationReport`];
/// every application pipeline runs to completion regardless of the others.
/// Check-mark lines from preflight and from every pipeline go to `progress`.
pub async fn run_migration(
    runner: Arc<dyn CommandRunner>,
    config: Arc<MigrationConfig>,
    progress: Arc<dyn Progress>,
) -> Result<MigrationReport> {
    let start = Instant::now();
    let started_at = Utc::now();
    let run_id = Uuid::new_v4().to_string();

    info!(
        run_id = %run_id,
        context = %config.context,
        namespace = %config.namespace,
        region = %config.region,
        applications = config.applications.len(),
        force = config.force,
        "Starting migration"
    );

    let preflight = run_preflight(runner.as_ref(), progress.as_ref(), &config).await?;

    let mut tasks: Vec<(String, JoinHandle<AppOutcome>)> =
        Vec::with_capacity(config.applications.len());

    for app in &config.applications {
        let runner = Arc::clone(&runner);
        let config = Arc::clone(&config);
        let progress = Arc::clone(&progress);
        let name = app.clone();
        let span = info_span!("application", run_id = %run_id, application = %app);

        let task = tokio::spawn(
            async move { run_application(runner.as_ref(), progress.as_ref(), &config, &name).await }
                .instrument(span),
        );
        tasks.push((app.clone(), task));
    }

    // Wait for every pipeline; a crashed task only fails its own application
    let mut outcomes = Vec::with_capacity(tasks.len());
    for (app, task) in tasks {
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(application = %app, error = %e, "Application task did not complete");
                let mut outcome = AppOutcome::new(&app);
                outcome.abort(format!(
                    "[{}] pipeline task failed: {}",
                    config.argocd_name(&app),
                    e
                ));
                if let Some(failure) = outcome.failure() {
                    progress.line(&failure.line());
                }
                outcome
            }
        };
        outcomes.push(outcome);
    }

    let report = MigrationReport {
        run_id,
        started_at,
        preflight,
        outcomes,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        run_id = %report.run_id,
        passed = report.passed_count(),
        failed = report.failed_count(),
        duration_ms = report.duration_ms,
        "Migration finished"
    );

    Ok(report)
}
