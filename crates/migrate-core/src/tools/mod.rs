//! Invocations of the external CLIs and the matchers for their text output.
//!
//! Builders here are pure: they turn configuration values into a
//! [`ToolCommand`](crate::runner::ToolCommand). Matchers are pure as well and
//! take captured output, so both can be tested without the tools installed.

pub mod argocd;
pub mod kubectl;
pub mod rancher;

use regex::Regex;

/// Start-of-name boundary: line start or any character that cannot be part
/// of a resource name segment (`-`, `/`, `:`, whitespace...).
pub(crate) const NAME_START: &str = r"(?:^|[^A-Za-z0-9_])";

/// Whether any single line of `output` matches `pattern`.
///
/// Every dynamic piece of `pattern` is escaped by the callers, so a compile
/// failure can only come from a bug in a fixed pattern; it is treated as no
/// match.
pub(crate) fn any_line_matches(output: &str, pattern: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => output.lines().any(|line| re.is_match(line)),
        Err(err) => {
            tracing::error!(pattern, error = %err, "Invalid output pattern");
            false
        }
    }
}
