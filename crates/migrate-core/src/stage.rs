//! Step definitions and the per-application state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every step the migration can run, preflight checks included.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// kubectl config use-context
    SwitchContext,

    /// kubectl get namespace
    Namespace,

    /// argocd app list, falling back to argocd login
    ArgoCdAuth,

    /// rancher login
    RancherAuth,

    /// kubectl auth can-i delete configmaps
    Permissions,

    /// argocd app list -l ... before anything is deleted
    SyncCheck,

    /// rancher apps ls
    RancherAppCheck,

    /// kubectl delete configmaps -l NAME=...
    DeleteConfigMaps,

    /// rancher app delete
    DeleteRancherApp,

    /// argocd app list -l ... after deletion
    PostSyncCheck,
}

impl StepKind {
    /// Preflight checks in the order they must run.
    pub const PREFLIGHT: [StepKind; 5] = [
        StepKind::SwitchContext,
        StepKind::Namespace,
        StepKind::ArgoCdAuth,
        StepKind::RancherAuth,
        StepKind::Permissions,
    ];

    /// Per-application steps in the order they must run.
    pub const PIPELINE: [StepKind; 5] = [
        StepKind::SyncCheck,
        StepKind::RancherAppCheck,
        StepKind::DeleteConfigMaps,
        StepKind::DeleteRancherApp,
        StepKind::PostSyncCheck,
    ];

    /// Get the step name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::SwitchContext => "switch_context",
            StepKind::Namespace => "namespace",
            StepKind::ArgoCdAuth => "argocd_auth",
            StepKind::RancherAuth => "rancher_auth",
            StepKind::Permissions => "permissions",
            StepKind::SyncCheck => "sync_check",
            StepKind::RancherAppCheck => "rancher_app_check",
            StepKind::DeleteConfigMaps => "delete_configmaps",
            StepKind::DeleteRancherApp => "delete_rancher_app",
            StepKind::PostSyncCheck => "post_sync_check",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where an application's pipeline currently stands.
///
/// `Pending → SyncChecked → RancherChecked → ConfigMapsDeleted →
/// RancherAppDeleted → PostSyncChecked`, with `Failed` reachable from any
/// non-terminal stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppStage {
    #[default]
    Pending,
    SyncChecked,
    RancherChecked,
    ConfigMapsDeleted,
    RancherAppDeleted,
    PostSyncChecked,
    Failed,
}

impl AppStage {
    /// The step that moves a pipeline out of this stage, if any.
    pub fn next_step(&self) -> Option<StepKind> {
        match self {
            AppStage::Pending => Some(StepKind::SyncCheck),
            AppStage::SyncChecked => Some(StepKind::RancherAppCheck),
            AppStage::RancherChecked => Some(StepKind::DeleteConfigMaps),
            AppStage::ConfigMapsDeleted => Some(StepKind::DeleteRancherApp),
            AppStage::RancherAppDeleted => Some(StepKind::PostSyncCheck),
            AppStage::PostSyncChecked | AppStage::Failed => None,
        }
    }

    /// Apply the result of `step`. Terminal stages and out-of-order steps
    /// leave the stage untouched.
    pub fn advance(self, step: StepKind, passed: bool) -> AppStage {
        if self.next_step() != Some(step) {
            return self;
        }
        if !passed {
            return AppStage::Failed;
        }
        match step {
            StepKind::SyncCheck => AppStage::SyncChecked,
            StepKind::RancherAppCheck => AppStage::RancherChecked,
            StepKind::DeleteConfigMaps => AppStage::ConfigMapsDeleted,
            StepKind::DeleteRancherApp => AppStage::RancherAppDeleted,
            StepKind::PostSyncCheck => AppStage::PostSyncChecked,
            _ => self,
        }
    }
}
