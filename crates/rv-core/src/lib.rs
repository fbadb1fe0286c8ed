//! Shared primitives used across Revela crates.

use core::fmt;

/// Result alias used across the workspace.
pub type PreviewResult<T> = Result<T, PreviewError>;

/// Error carried between crates: a dotted machine-readable code plus a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewError {
    pub code: &'static str,
    pub message: String,
}

impl PreviewError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// True when the code belongs to the given dotted namespace (`"js"`, `"relay.upstream"`).
    pub fn is_in(&self, namespace: &str) -> bool {
        self.code == namespace
            || self
                .code
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl fmt::Display for PreviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PreviewError {}

#[cfg(test)]
mod tests {
    use super::PreviewError;

    #[test]
    fn display_includes_code_and_message() {
        let error = PreviewError::new("js.eval_failed", "boom");
        assert_eq!(error.to_string(), "js.eval_failed: boom");
    }

    #[test]
    fn namespace_matching_respects_segment_boundaries() {
        let error = PreviewError::new("relay.upstream.status", "404");
        assert!(error.is_in("relay"));
        assert!(error.is_in("relay.upstream"));
        assert!(!error.is_in("relay.up"));
        assert!(!error.is_in("storage"));
    }
}
