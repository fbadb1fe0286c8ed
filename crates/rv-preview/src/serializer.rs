//! Turns the live document of a session back into standalone markup.

use crate::marker::HelperMarker;
use crate::recorder::MutationRecorder;
use crate::recorder::ReintegrationPolicy;
use rv_dom::Document;
use tracing::debug;

const DOCTYPE_PREFIX: &str = "<!DOCTYPE html>\n";

/// Result of reaching into a browsing context. Cross-origin or torn-down
/// contexts report why they are unreadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextAccess<T> {
    Available(T),
    Inaccessible(String),
}

impl<T> ContextAccess<T> {
    pub fn inaccessible(reason: impl Into<String>) -> Self {
        Self::Inaccessible(reason.into())
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Self::Available(value) => Some(value),
            Self::Inaccessible(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ContextAccess<U> {
        match self {
            Self::Available(value) => ContextAccess::Available(f(value)),
            Self::Inaccessible(reason) => ContextAccess::Inaccessible(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Serializer;

impl Serializer {
    /// Serializes the root element of `access` with every marked helper
    /// removed and eligible recorded scripts restored before `</body>`.
    ///
    /// Never fails: an unreadable context yields an empty string.
    pub fn serialize(
        &self,
        access: ContextAccess<Document>,
        marker: &HelperMarker,
        recorder: &mut MutationRecorder,
        policy: ReintegrationPolicy,
    ) -> String {
        let mut document = match access {
            ContextAccess::Available(document) => document,
            ContextAccess::Inaccessible(reason) => {
                debug!(%reason, "browsing context unreadable, serializing nothing");
                return String::new();
            }
        };

        let stripped = document.strip_marked(marker.token());
        let scripts = recorder.take_reintegrable(policy);
        debug!(stripped, reintegrated = scripts.len(), "serializing live document");

        let combined = scripts.join("\n");
        let body = document.body();
        if let (Some(body), false) = (body, scripts.is_empty()) {
            let raw = document.create_raw(format!("{combined}\n"));
            document.append_child(body, raw);
        }

        let mut markup = match document.document_element() {
            Some(root) => document.outer_html(root),
            None => document.to_html(),
        };
        if body.is_none() && !scripts.is_empty() {
            markup.push('\n');
            markup.push_str(&combined);
        }
        ensure_doctype(&markup)
    }
}

/// Prepends `<!DOCTYPE html>` unless the markup already opens with a
/// doctype (after leading whitespace, any case). Empty input stays empty.
pub fn ensure_doctype(markup: &str) -> String {
    if markup.is_empty() {
        return String::new();
    }
    let has_doctype = markup
        .trim_start()
        .get(..9)
        .is_some_and(|head| head.eq_ignore_ascii_case("<!doctype"));
    if has_doctype {
        markup.to_owned()
    } else {
        format!("{DOCTYPE_PREFIX}{markup}")
    }
}

#[cfg(test)]
mod tests {
    use super::ContextAccess;
    use super::Serializer;
    use super::ensure_doctype;
    use crate::document::AugmentedDocument;
    use crate::marker::HelperMarker;
    use crate::recorder::MutationRecorder;
    use crate::recorder::RecordedScript;
    use crate::recorder::ReintegrationPolicy;
    use crate::view::ViewConfiguration;
    use rv_dom::Document;

    fn augmented(source: &str) -> AugmentedDocument {
        AugmentedDocument::build(
            source,
            &ViewConfiguration::default(),
            &HelperMarker::from_token("tok"),
        )
    }

    #[test]
    fn doctype_is_added_once() {
        assert_eq!(ensure_doctype(""), "");
        assert_eq!(ensure_doctype("<html></html>"), "<!DOCTYPE html>\n<html></html>");
        assert_eq!(ensure_doctype("  <!doctype HTML><p>"), "  <!doctype HTML><p>");
        let once = ensure_doctype("<p>x</p>");
        assert_eq!(ensure_doctype(&once), once);
    }

    #[test]
    fn helpers_are_stripped_and_nothing_else_changes() {
        let doc = augmented("<p>Hi</p>");
        let mut recorder = MutationRecorder::new();
        let html = Serializer.serialize(
            ContextAccess::Available(doc.document().clone()),
            doc.marker(),
            &mut recorder,
            ReintegrationPolicy::default(),
        );
        assert_eq!(
            html,
            "<!DOCTYPE html>\n<html><head><meta charset=\"UTF-8\"><meta name=\"viewport\" \
             content=\"width=device-width, initial-scale=1.0\"></head><body><p>Hi</p></body></html>"
        );
    }

    #[test]
    fn recorded_scripts_return_before_body_close() {
        let doc = augmented("<div id=\"out\"></div>");
        let mut recorder = MutationRecorder::new();
        recorder.extend([
            RecordedScript::page("<script>one()</script>"),
            RecordedScript::page("<script>two()</script>"),
            RecordedScript::page("<script>three()</script>"),
            RecordedScript::page("<script>four()</script>"),
        ]);
        let html = Serializer.serialize(
            ContextAccess::Available(doc.document().clone()),
            doc.marker(),
            &mut recorder,
            ReintegrationPolicy::default(),
        );
        assert!(html.ends_with(
            "<div id=\"out\"></div><script>three()</script>\n<script>four()</script>\n</body></html>"
        ));
        assert!(recorder.is_empty());
    }

    #[test]
    fn documents_without_body_get_scripts_appended() {
        let mut document = Document::new();
        let html = document.create_element("html");
        document.append_child(Document::ROOT, html);
        let mut recorder = MutationRecorder::new();
        recorder.extend([
            RecordedScript::page("<script>a</script>"),
            RecordedScript::page("<script>b</script>"),
            RecordedScript::page("<script>c</script>"),
        ]);
        let output = Serializer.serialize(
            ContextAccess::Available(document),
            &HelperMarker::from_token("tok"),
            &mut recorder,
            ReintegrationPolicy::default(),
        );
        assert_eq!(output, "<!DOCTYPE html>\n<html></html>\n<script>c</script>");
    }

    #[test]
    fn inaccessible_contexts_serialize_to_nothing() {
        let mut recorder = MutationRecorder::new();
        recorder.record(RecordedScript::page("<script>a</script>"));
        let output = Serializer.serialize(
            ContextAccess::inaccessible("cross-origin"),
            &HelperMarker::from_token("tok"),
            &mut recorder,
            ReintegrationPolicy::default(),
        );
        assert_eq!(output, "");
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn page_elements_with_forged_marker_attributes_survive() {
        let doc = augmented("<script data-preview-helper-tok=\"true\">keep()</script>");
        let mut recorder = MutationRecorder::new();
        let html = Serializer.serialize(
            ContextAccess::Available(doc.document().clone()),
            doc.marker(),
            &mut recorder,
            ReintegrationPolicy::default(),
        );
        assert!(html.contains("keep()</script>"));
    }
}
