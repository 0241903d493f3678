//! rancher invocations and `rancher apps ls` parsing.

use super::{any_line_matches, NAME_START};
use crate::runner::ToolCommand;

const RANCHER: &str = "rancher";

pub fn login(token: &str, context: &str, url: &str) -> ToolCommand {
    ToolCommand::new(RANCHER, ["login", "-t", token, "--context", context, url])
}

pub fn list_apps() -> ToolCommand {
    ToolCommand::new(RANCHER, ["apps", "ls"])
}

pub fn delete_app(name: &str) -> ToolCommand {
    ToolCommand::new(RANCHER, ["app", "delete", name])
}

/// Whether `listing` has a row naming `<application>-<namespace>` or bare
/// `<application>` whose state is `active` or `installing`.
///
/// Older releases were installed without the namespace suffix, hence both.
pub fn is_app_present(listing: &str, application: &str, namespace: &str) -> bool {
    let pattern = format!(
        r"{}{}(?:-{})?\s.*\b(?:active|installing)\b",
        NAME_START,
        regex::escape(application),
        regex::escape(namespace)
    );
    any_line_matches(listing, &pattern)
}
