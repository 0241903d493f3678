//! kubectl invocations.

use crate::runner::{CommandOutput, ToolCommand};

const KUBECTL: &str = "kubectl";

/// Marker kubectl prints when a selector matched nothing.
const NO_RESOURCES: &str = "No resources found";

pub fn use_context(context: &str) -> ToolCommand {
    ToolCommand::new(KUBECTL, ["config", "use-context", context])
}

pub fn get_namespace(namespace: &str) -> ToolCommand {
    ToolCommand::new(KUBECTL, ["get", "namespace", namespace])
}

pub fn can_delete_configmaps(namespace: &str) -> ToolCommand {
    ToolCommand::new(
        KUBECTL,
        ["auth", "can-i", "delete", "configmaps", "--namespace", namespace],
    )
}

/// Delete every config map in `namespace` labelled `NAME=<name>`.
pub fn delete_configmaps(namespace: &str, name: &str) -> ToolCommand {
    ToolCommand::new(
        KUBECTL,
        [
            "delete".to_string(),
            "configmaps".to_string(),
            "-n".to_string(),
            namespace.to_string(),
            "-l".to_string(),
            format!("NAME={}", name),
        ],
    )
}

/// Whether kubectl reported that the selector matched nothing. Older
/// releases print the marker on stdout, newer ones on stderr.
pub fn reports_no_resources(text: &str) -> bool {
    text.lines().any(|line| line.trim_start().starts_with(NO_RESOURCES))
}

/// A delete only counts when it exited cleanly and actually removed something.
pub fn deleted_something(output: &CommandOutput) -> bool {
    output.passed()
        && !reports_no_resources(&output.stdout)
        && !reports_no_resources(&output.stderr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_configmaps_args() {
        let cmd = delete_configmaps("payments", "ledger-payments");
        assert_eq!(cmd.program, "kubectl");
        assert_eq!(
            cmd.args,
            vec!["delete", "configmaps", "-n", "payments", "-l", "NAME=ledger-payments"]
        );
    }

    #[test]
    fn test_preflight_commands() {
        assert_eq!(use_context("prod").args, vec!["config", "use-context", "prod"]);
        assert_eq!(get_namespace("payments").args, vec!["get", "namespace", "payments"]);
        assert!(can_delete_configmaps("payments")
            .args
            .ends_with(&["--namespace".to_string(), "payments".to_string()]));
    }

    #[test]
    fn test_no_resources_marker() {
        assert!(reports_no_resources("No resources found\n"));
        assert!(reports_no_resources("No resources found in payments namespace.\n"));
        assert!(!reports_no_resources(
            "configmap \"ledger-payments.v1\" deleted\n"
        ));
    }

    #[test]
    fn test_deleted_something() {
        let deleted = CommandOutput {
            exit_code: 0,
            success: true,
            stdout: "configmap \"ledger-payments.v1\" deleted\n".to_string(),
            ..Default::default()
        };
        assert!(deleted_something(&deleted));

        let empty_on_stderr = CommandOutput {
            exit_code: 0,
            success: true,
            stderr: "No resources found\n".to_string(),
            ..Default::default()
        };
        assert!(!deleted_something(&empty_on_stderr));

        let failed = CommandOutput {
            exit_code: 1,
            stderr: "error: forbidden".to_string(),
            ..Default::default()
        };
        assert!(!deleted_something(&failed));
    }
}
