//! argocd invocations and `argocd app list` parsing.
//!
//! A healthy row looks like:
//!
//! ```text
//! krona-reconciliation-qainternal-e1  qainternal  krona-qainternal  Synced  Healthy  Auto-Prune  <none>  https://...  2.4.0-rc.1
//! ```

use super::{any_line_matches, NAME_START};
use crate::config::Region;
use crate::runner::ToolCommand;

const ARGOCD: &str = "argocd";

/// Unfiltered list; succeeds only with a valid session.
pub fn list_apps() -> ToolCommand {
    ToolCommand::new(ARGOCD, ["app", "list"])
}

/// Interactive SSO login against `server`.
pub fn login(server: &str) -> ToolCommand {
    ToolCommand::new(ARGOCD, ["login", server, "--sso", "--grpc-web-root-path", "/"])
}

/// The login command shown to the operator when the automatic login fails.
pub fn login_hint(server: &str) -> String {
    login(server).redacted()
}

/// Applications labelled with this namespace, application and region.
pub fn list_app(namespace: &str, application: &str, region: Region) -> ToolCommand {
    ToolCommand::new(
        ARGOCD,
        [
            "app".to_string(),
            "list".to_string(),
            "-l".to_string(),
            format!(
                "namespace={},application={},region={}",
                namespace, application, region
            ),
        ],
    )
}

/// Whether `listing` has a row for `argocd_name` (`<app>-<ns>-<region>`,
/// optionally prefixed) that is `Synced` and then `Healthy`.
pub fn is_synced_and_healthy(listing: &str, argocd_name: &str) -> bool {
    let pattern = format!(
        r"{}{}\s.*\bSynced\b.*\bHealthy\b",
        NAME_START,
        regex::escape(argocd_name)
    );
    any_line_matches(listing, &pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "NAME                              CLUSTER     NAMESPACE   PROJECT  STATUS     HEALTH       SYNCPOLICY\n";

    #[test]
    fn test_list_app_label_selector() {
        let cmd = list_app("payments", "ledger", Region::E2);
        assert_eq!(
            cmd.args,
            vec!["app", "list", "-l", "namespace=payments,application=ledger,region=e2"]
        );
    }

    #[test]
    fn test_login_hint() {
        assert_eq!(
            login_hint("argocd.example.io"),
            "argocd login argocd.example.io --sso --grpc-web-root-path /"
        );
    }

    #[test]
    fn test_synced_and_healthy_passes() {
        let listing = "myapp-ns-e1 in-cluster ns default Synced Healthy Auto-Prune\n";
        assert!(is_synced_and_healthy(listing, "myapp-ns-e1"));
    }

    #[test]
    fn test_prefixed_name_passes() {
        let listing = format!(
            "{}krona-reconciliation-qainternal-e1 qainternal krona-qainternal Synced Healthy Auto-Prune <none> https://greenlight.jfrog.io/artifactory/gl-helm 2.4.0-rc.1\n",
            HEADER
        );
        assert!(is_synced_and_healthy(&listing, "reconciliation-qainternal-e1"));
    }

    #[test]
    fn test_synced_without_healthy_fails() {
        let listing = "myapp-ns-e1 in-cluster ns default Synced Progressing Auto-Prune\n";
        assert!(!is_synced_and_healthy(listing, "myapp-ns-e1"));
    }

    #[test]
    fn test_healthy_on_another_row_does_not_count() {
        let listing = "myapp-ns-e1 in-cluster ns default Synced Degraded\n\
                       other-ns-e1 in-cluster ns default Synced Healthy\n";
        assert!(!is_synced_and_healthy(listing, "myapp-ns-e1"));
    }

    #[test]
    fn test_out_of_sync_fails() {
        let listing = "myapp-ns-e1 in-cluster ns default OutOfSync Healthy\n";
        assert!(!is_synced_and_healthy(listing, "myapp-ns-e1"));
    }

    #[test]
    fn test_other_region_does_not_match() {
        let listing = "myapp-ns-e2 in-cluster ns default Synced Healthy\n";
        assert!(!is_synced_and_healthy(listing, "myapp-ns-e1"));
        let listing = "myapp-ns-e10 in-cluster ns default Synced Healthy\n";
        assert!(!is_synced_and_healthy(listing, "myapp-ns-e1"));
    }

    #[test]
    fn test_name_is_matched_literally() {
        let listing = "myappXns-e1 in-cluster ns default Synced Healthy\n";
        assert!(!is_synced_and_healthy(listing, "myapp.ns-e1"));
    }

    #[test]
    fn test_empty_listing_fails() {
        assert!(!is_synced_and_healthy(HEADER, "myapp-ns-e1"));
        assert!(!is_synced_and_healthy("", "myapp-ns-e1"));
    }
}
