//! Per-application validation and deletion pipeline.

use crate::config::MigrationConfig;
use crate::outcome::{AppOutcome, StepResult};
use crate::progress::Progress;
use crate::runner::{CommandOutput, CommandRunner, ToolCommand};
use crate::stage::StepKind;
use crate::tools::{argocd, kubectl, rancher};
use tracing::{info, warn};

/// Drive one application through every step until it finishes or fails.
///
/// Never returns an error: a failing step is recorded on the outcome and the
/// remaining steps are skipped. Each result is reported to `progress` before
/// any settle pause that follows it.
pub async fn run_application(
    runner: &dyn CommandRunner,
    progress: &dyn Progress,
    config: &MigrationConfig,
    app: &str,
) -> AppOutcome {
    let mut outcome = AppOutcome::new(app);
    info!(application = app, "Starting application pipeline");

    while let Some(step) = outcome.stage.next_step() {
        let result = match step {
            StepKind::SyncCheck => check_sync(runner, config, app, step, config.force).await,
            StepKind::RancherAppCheck => check_rancher_app(runner, config, app).await,
            StepKind::DeleteConfigMaps => delete_config_maps(runner, progress, config, app).await,
            StepKind::DeleteRancherApp => delete_rancher_app(runner, progress, config, app).await,
            StepKind::PostSyncCheck => check_sync(runner, config, app, step, false).await,
            _ => break,
        };
        progress.line(&result.line());
        if !outcome.record(result) {
            break;
        }
        if let Some(delay) = config.settle.after(step) {
            tokio::time::sleep(delay).await;
        }
    }

    info!(
        application = app,
        stage = ?outcome.stage,
        success = outcome.succeeded(),
        "Application pipeline finished"
    );
    outcome
}

/// Argo CD must list the application as `Synced` and `Healthy`.
pub async fn check_sync(
    runner: &dyn CommandRunner,
    config: &MigrationConfig,
    app: &str,
    step: StepKind,
    force: bool,
) -> StepResult {
    let tag = config.argocd_name(app);
    if force {
        warn!(application = app, "Skipping Argo CD sync check");
        return StepResult::pass(step, format!("[{}] skipped argo cd sync check", tag));
    }

    let output = run(
        runner,
        &argocd::list_app(&config.namespace, app, config.region),
    )
    .await;
    if !output.passed() {
        return StepResult::fail(
            step,
            format!(
                "[{}] cannot list argo cd applications: {}",
                tag,
                output.diagnostic()
            ),
        );
    }
    if !argocd::is_synced_and_healthy(&output.stdout, &tag) {
        return StepResult::fail(step, format!("[{}] not synced in argo cd", tag));
    }
    StepResult::pass(step, format!("[{}] synced in argo cd", tag))
}

/// Rancher must still list the app as `active` or `installing`.
pub async fn check_rancher_app(
    runner: &dyn CommandRunner,
    config: &MigrationConfig,
    app: &str,
) -> StepResult {
    let step = StepKind::RancherAppCheck;
    let tag = config.argocd_name(app);

    let output = run(runner, &rancher::list_apps()).await;
    if !output.passed() {
        return StepResult::fail(
            step,
            format!(
                "[{}] cannot list rancher applications: {}",
                tag,
                output.diagnostic()
            ),
        );
    }
    if !rancher::is_app_present(&output.stdout, app, &config.namespace) {
        return StepResult::fail(step, format!("[{}] cannot find rancher application", tag));
    }
    StepResult::pass(step, format!("[{}] found rancher application", tag))
}

/// Delete config maps labelled `NAME=<app>-<ns>`, falling back to
/// `NAME=<app>` when the first selector removes nothing.
pub async fn delete_config_maps(
    runner: &dyn CommandRunner,
    progress: &dyn Progress,
    config: &MigrationConfig,
    app: &str,
) -> StepResult {
    let step = StepKind::DeleteConfigMaps;
    let tag = config.argocd_name(app);

    let first = kubectl::delete_configmaps(&config.namespace, &config.release_name(app));
    if !kubectl::deleted_something(&run(runner, &first).await) {
        warn!(application = app, "No config maps under namespaced label; retrying with bare name");
        progress.line(&format!("[{}] cannot delete configmaps; trying without namespace", tag));

        let fallback = kubectl::delete_configmaps(&config.namespace, app);
        if !kubectl::deleted_something(&run(runner, &fallback).await) {
            return StepResult::fail(
                step,
                format!("[{}] cannot delete configmaps; giving up", tag),
            );
        }
    }

    StepResult::pass(step, format!("[{}] successfully deleted configmaps", tag))
}

/// Delete the Rancher app `<app>-<ns>`, falling back to `<app>`.
pub async fn delete_rancher_app(
    runner: &dyn CommandRunner,
    progress: &dyn Progress,
    config: &MigrationConfig,
    app: &str,
) -> StepResult {
    let step = StepKind::DeleteRancherApp;
    let tag = config.argocd_name(app);

    let first = run(runner, &rancher::delete_app(&config.release_name(app))).await;
    if !first.passed() {
        warn!(application = app, "Rancher delete by release name failed; retrying with bare name");
        progress.line(&format!(
            "[{}] cannot delete rancher application; trying without namespace",
            tag
        ));

        let fallback = run(runner, &rancher::delete_app(app)).await;
        if !fallback.passed() {
            return StepResult::fail(
                step,
                format!(
                    "[{}] cannot delete rancher application; giving up: {}",
                    tag,
                    fallback.diagnostic()
                ),
            );
        }
    }

    StepResult::pass(step, format!("[{}] successfully deleted rancher application", tag))
}

/// Run `command`, folding a spawn failure into a failed output so every
/// step handles both the same way.
async fn run(runner: &dyn CommandRunner, command: &ToolCommand) -> CommandOutput {
    match runner.run(command).await {
        Ok(output) => output,
        Err(e) => {
            warn!(command = %command, error = %e, "Command could not run");
            CommandOutput::failure(-1, e.to_string())
        }
    }
}
