//! Run configuration.
//!
//! Built once from command-line input and shared read-only by every
//! pipeline task for the lifetime of the run.

use crate::error::{MigrationError, Result};
use crate::stage::StepKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Argo CD host used for the SSO login fallback.
pub const DEFAULT_ARGOCD_SERVER: &str = "argocd.external.glops.io";

/// Rancher API endpoint used for `rancher login`.
pub const DEFAULT_RANCHER_URL: &str = "https://ops-rancher.greenlight.me/v3";

/// Deployment region.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    E1,
    E2,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::E1 => "e1",
            Region::E2 => "e2",
        }
    }
}

impl FromStr for Region {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "e1" => Ok(Region::E1),
            "e2" => Ok(Region::E2),
            other => Err(MigrationError::InvalidRegion(other.to_string())),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed pauses after steps whose effects other systems must observe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettleDelays {
    /// After config maps are deleted.
    pub config_maps: Duration,

    /// After the Rancher app is deleted.
    pub rancher_app: Duration,

    /// After the Argo CD SSO login fallback.
    pub argocd_login: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            config_maps: Duration::from_secs(2),
            rancher_app: Duration::from_secs(5),
            argocd_login: Duration::from_secs(3),
        }
    }
}

impl SettleDelays {
    /// No pauses at all. Used by tests.
    pub fn none() -> Self {
        Self {
            config_maps: Duration::ZERO,
            rancher_app: Duration::ZERO,
            argocd_login: Duration::ZERO,
        }
    }

    /// Pause owed after `step` succeeds, if any.
    pub fn after(&self, step: StepKind) -> Option<Duration> {
        match step {
            StepKind::DeleteConfigMaps => Some(self.config_maps),
            StepKind::DeleteRancherApp => Some(self.rancher_app),
            _ => None,
        }
    }
}

/// Everything a run needs to know. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Kubernetes context to switch to.
    pub context: String,

    /// Namespace the applications live in.
    pub namespace: String,

    /// Applications to migrate, in the order given.
    pub applications: Vec<String>,

    pub region: Region,

    /// Token for `rancher login`. Never serialized.
    #[serde(skip_serializing, default)]
    pub rancher_token: String,

    /// Rancher project context, e.g. `c-abcde:p-fghij`.
    pub rancher_context: String,

    /// Skip the initial Argo CD sync check.
    pub force: bool,

    pub argocd_server: String,

    pub rancher_url: String,

    pub settle: SettleDelays,
}

impl MigrationConfig {
    /// Create a validated configuration with default servers and delays.
    pub fn new(
        context: impl Into<String>,
        namespace: impl Into<String>,
        applications: Vec<String>,
        region: Region,
        rancher_token: impl Into<String>,
        rancher_context: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            context: context.into(),
            namespace: namespace.into(),
            applications,
            region,
            rancher_token: rancher_token.into(),
            rancher_context: rancher_context.into(),
            force: false,
            argocd_server: DEFAULT_ARGOCD_SERVER.to_string(),
            rancher_url: DEFAULT_RANCHER_URL.to_string(),
            settle: SettleDelays::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_argocd_server(mut self, server: impl Into<String>) -> Self {
        self.argocd_server = server.into();
        self
    }

    pub fn with_rancher_url(mut self, url: impl Into<String>) -> Self {
        self.rancher_url = url.into();
        self
    }

    pub fn with_settle(mut self, settle: SettleDelays) -> Self {
        self.settle = settle;
        self
    }

    /// Check required values are present and application names are usable.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("context", &self.context),
            ("namespace", &self.namespace),
            ("rancher token", &self.rancher_token),
            ("rancher context", &self.rancher_context),
            ("argocd server", &self.argocd_server),
            ("rancher url", &self.rancher_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(MigrationError::InvalidConfig(format!("{} is required", name)));
            }
        }

        if self.applications.is_empty() {
            return Err(MigrationError::InvalidConfig(
                "at least one application is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for app in &self.applications {
            if app.trim().is_empty() {
                return Err(MigrationError::InvalidConfig(
                    "application names must not be empty".to_string(),
                ));
            }
            if !seen.insert(app.as_str()) {
                return Err(MigrationError::InvalidConfig(format!(
                    "application {} given more than once",
                    app
                )));
            }
        }

        Ok(())
    }

    /// `<app>-<namespace>`: the Rancher app and config map label name.
    pub fn release_name(&self, app: &str) -> String {
        format!("{}-{}", app, self.namespace)
    }

    /// `<app>-<namespace>-<region>`: the Argo CD application suffix.
    pub fn argocd_name(&self, app: &str) -> String {
        format!("{}-{}-{}", app, self.namespace, self.region)
    }
}
