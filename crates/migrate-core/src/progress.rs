//! Operator-facing progress lines.
//!
//! The library never prints. Every check-mark line, and every note about a
//! fallback being tried, goes through a [`Progress`] chosen by the caller,
//! so the binary decides which stream carries it.

/// Receiver for progress lines, shared by every application task.
pub trait Progress: Send + Sync {
    /// Emit one complete line, without a trailing newline.
    fn line(&self, line: &str);
}
