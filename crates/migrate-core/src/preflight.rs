//! Preflight checks.
//!
//! Run once, in order, before any application is touched. The first failure
//! is returned as [`MigrationError::Preflight`] and ends the run.

use crate::config::MigrationConfig;
use crate::error::{MigrationError, Result};
use crate::outcome::StepResult;
use crate::progress::Progress;
use crate::runner::{CommandOutput, CommandRunner, ToolCommand};
use crate::stage::StepKind;
use crate::tools::{argocd, kubectl, rancher};
use tracing::{info, warn};

/// Run every preflight check, reporting each passed check to `progress`.
pub async fn run_preflight(
    runner: &dyn CommandRunner,
    progress: &dyn Progress,
    config: &MigrationConfig,
) -> Result<Vec<StepResult>> {
    let mut results = Vec::with_capacity(StepKind::PREFLIGHT.len());

    for step in StepKind::PREFLIGHT {
        let result = match step {
            StepKind::SwitchContext => switch_context(runner, config).await?,
            StepKind::Namespace => validate_namespace(runner, config).await?,
            StepKind::ArgoCdAuth => validate_argocd_auth(runner, progress, config).await?,
            StepKind::RancherAuth => validate_rancher_auth(runner, config).await?,
            StepKind::Permissions => validate_permissions(runner, config).await?,
            _ => continue,
        };
        progress.line(&result.line());
        results.push(result);
    }

    info!(checks = results.len(), "Preflight checks passed");
    Ok(results)
}

pub async fn switch_context(
    runner: &dyn CommandRunner,
    config: &MigrationConfig,
) -> Result<StepResult> {
    require(
        runner,
        StepKind::SwitchContext,
        &kubectl::use_context(&config.context),
    )
    .await
    .map_err(|e| {
        preflight(
            StepKind::SwitchContext,
            format!("[{}] cannot switch contexts: {}", config.context, e),
        )
    })?;
    Ok(StepResult::pass(
        StepKind::SwitchContext,
        format!("[{}] switched context", config.context),
    ))
}

pub async fn validate_namespace(
    runner: &dyn CommandRunner,
    config: &MigrationConfig,
) -> Result<StepResult> {
    require(runner, StepKind::Namespace, &kubectl::get_namespace(&config.namespace))
        .await
        .map_err(|e| {
            preflight(
                StepKind::Namespace,
                format!("[{}] cannot access namespace: {}", config.namespace, e),
            )
        })?;
    Ok(StepResult::pass(
        StepKind::Namespace,
        format!("[{}] namespace exists", config.namespace),
    ))
}

/// An existing session is enough; otherwise try the SSO login once.
pub async fn validate_argocd_auth(
    runner: &dyn CommandRunner,
    progress: &dyn Progress,
    config: &MigrationConfig,
) -> Result<StepResult> {
    if require(runner, StepKind::ArgoCdAuth, &argocd::list_apps())
        .await
        .is_ok()
    {
        return Ok(StepResult::pass(StepKind::ArgoCdAuth, "argo cd authenticated"));
    }

    warn!(server = %config.argocd_server, "No Argo CD session; attempting SSO login");
    progress.line("trying to log into argo cd");

    let hint = argocd::login_hint(&config.argocd_server);
    require(runner, StepKind::ArgoCdAuth, &argocd::login(&config.argocd_server))
        .await
        .map_err(|_| {
            preflight(
                StepKind::ArgoCdAuth,
                format!("cannot log into argo cd; please login using `{}`", hint),
            )
        })?;
    tokio::time::sleep(config.settle.argocd_login).await;

    Ok(StepResult::pass(StepKind::ArgoCdAuth, "argo cd authenticated"))
}

pub async fn validate_rancher_auth(
    runner: &dyn CommandRunner,
    config: &MigrationConfig,
) -> Result<StepResult> {
    let login = rancher::login(
        &config.rancher_token,
        &config.rancher_context,
        &config.rancher_url,
    );
    require(runner, StepKind::RancherAuth, &login)
        .await
        .map_err(|e| {
            preflight(
                StepKind::RancherAuth,
                format!("cannot authenticate with rancher: {}", e),
            )
        })?;
    Ok(StepResult::pass(
        StepKind::RancherAuth,
        format!("[{}] authenticated with rancher", config.rancher_context),
    ))
}

pub async fn validate_permissions(
    runner: &dyn CommandRunner,
    config: &MigrationConfig,
) -> Result<StepResult> {
    require(
        runner,
        StepKind::Permissions,
        &kubectl::can_delete_configmaps(&config.namespace),
    )
    .await
    .map_err(|e| {
        preflight(
            StepKind::Permissions,
            format!("[{}] not authorized to delete configmaps: {}", config.namespace, e),
        )
    })?;
    Ok(StepResult::pass(
        StepKind::Permissions,
        format!("[{}] validated namespace permissions", config.namespace),
    ))
}

/// Run `command` and turn a spawn error or non-zero exit into a
/// one-line reason.
async fn require(
    runner: &dyn CommandRunner,
    step: StepKind,
    command: &ToolCommand,
) -> std::result::Result<CommandOutput, String> {
    match runner.run(command).await {
        Ok(output) if output.passed() => Ok(output),
        Ok(output) => {
            warn!(%step, command = %command, exit_code = output.exit_code, "Preflight command failed");
            Err(format!(
                "exit code {}: {}",
                output.exit_code,
                output.diagnostic()
            ))
        }
        Err(e) => {
            warn!(%step, command = %command, error = %e, "Preflight command could not run");
            Err(e.to_string())
        }
    }
}

fn preflight(check: StepKind, message: String) -> MigrationError {
    MigrationError::Preflight { check, message }
}
