//! Per-session helper marker.

use core::fmt;
use rand::Rng;
use rand::distr::Alphanumeric;

const TOKEN_LEN: usize = 16;
const ATTRIBUTE_PREFIX: &str = "data-preview-helper-";

/// Property under which a browsing context exposes a node's marker to
/// scripts. Contexts must make it read-only and keep it out of the attribute
/// list.
pub const MARKER_PROPERTY: &str = "__pvMarker";

/// Random token tagging the nodes a session injects.
///
/// The marker lives on nodes structurally; only a context that consumes plain
/// markup sees it, as the `data-preview-helper-<token>` attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HelperMarker {
    token: String,
}

impl HelperMarker {
    pub fn generate() -> Self {
        let token: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(|byte| char::from(byte).to_ascii_lowercase())
            .collect();
        Self { token }
    }

    /// Marker with a caller-chosen token, lowercased to stay a valid attribute suffix.
    pub fn from_token(token: &str) -> Self {
        Self {
            token: token
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .map(|c| c.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn attribute_name(&self) -> String {
        format!("{ATTRIBUTE_PREFIX}{}", self.token)
    }
}

impl fmt::Display for HelperMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::HelperMarker;

    #[test]
    fn generated_tokens_are_lowercase_alphanumeric_and_distinct() {
        let first = HelperMarker::generate();
        let second = HelperMarker::generate();
        assert_eq!(first.token().len(), 16);
        assert!(
            first
                .token()
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
        assert_ne!(first, second);
    }

    #[test]
    fn attribute_name_embeds_the_token() {
        let marker = HelperMarker::from_token("AbC-123");
        assert_eq!(marker.token(), "abc123");
        assert_eq!(marker.attribute_name(), "data-preview-helper-abc123");
    }
}
