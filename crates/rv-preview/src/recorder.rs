//! Records script elements removed from the live document so that the
//! serializer can put them back.

use crate::marker::HelperMarker;
use crate::marker::MARKER_PROPERTY;
use serde::Deserialize;
use serde::Serialize;

/// Global array the recorder script pushes into. Contexts drain it.
pub const RECORDER_BUFFER_GLOBAL: &str = "__pv_removed_scripts";

/// Outer markup of a removed script, captured at removal time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedScript {
    pub markup: String,
    /// True when the removed element carried the session marker.
    #[serde(default)]
    pub injected: bool,
}

impl RecordedScript {
    pub fn page(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            injected: false,
        }
    }

    pub fn injected(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            injected: true,
        }
    }
}

/// Which recorded scripts are eligible for reintegration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReintegrationPolicy {
    /// Drop the first `n` recorded entries. While the buffer holds `n` or
    /// fewer entries nothing is reintegrated and the buffer is kept.
    DiscardLeading(usize),
    /// Reintegrate every entry that was not injected by the session.
    SkipInjected,
}

impl Default for ReintegrationPolicy {
    fn default() -> Self {
        Self::DiscardLeading(2)
    }
}

/// Ordered buffer of removed scripts for one render session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationRecorder {
    entries: Vec<RecordedScript>,
}

impl MutationRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, script: RecordedScript) {
        self.entries.push(script);
    }

    pub fn extend(&mut self, scripts: impl IntoIterator<Item = RecordedScript>) {
        self.entries.extend(scripts);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RecordedScript] {
        &self.entries
    }

    /// Markup to reintegrate, in removal order.
    ///
    /// The buffer is cleared only when something is returned; otherwise it is
    /// left for a later serialization to pick up.
    pub fn take_reintegrable(&mut self, policy: ReintegrationPolicy) -> Vec<String> {
        let candidates: &[RecordedScript] = match policy {
            ReintegrationPolicy::DiscardLeading(count) => {
                if self.entries.len() <= count {
                    return Vec::new();
                }
                &self.entries[count..]
            }
            ReintegrationPolicy::SkipInjected => &self.entries,
        };

        let selected: Vec<String> = candidates
            .iter()
            .filter(|script| !script.injected && !script.markup.is_empty())
            .map(|script| script.markup.clone())
            .collect();
        if selected.iter().all(|markup| markup.trim().is_empty()) {
            return Vec::new();
        }

        self.entries.clear();
        selected
    }
}

/// Source of the helper script that observes script removals.
///
/// It must run before any page script. Entries carry the element's outer
/// markup and whether the element bore `marker`.
pub fn recorder_script(marker: &HelperMarker) -> String {
    format!(
        r#"(function () {{
  var token = "{token}";
  var buffer = window.{RECORDER_BUFFER_GLOBAL} = [];
  try {{
    var observer = new MutationObserver(function (records) {{
      for (var i = 0; i < records.length; i++) {{
        var removed = records[i].removedNodes || [];
        for (var j = 0; j < removed.length; j++) {{
          var node = removed[j];
          if (node && node.nodeType === 1 && node.tagName === "SCRIPT") {{
            buffer.push({{
              markup: node.outerHTML,
              injected: node.{MARKER_PROPERTY} === token
            }});
          }}
        }}
      }}
    }});
    observer.observe(document, {{ childList: true, subtree: true }});
  }} catch (_error) {{}}
}})();
"#,
        token = marker.token(),
    )
}

#[cfg(test)]
mod tests {
    use super::MutationRecorder;
    use super::RecordedScript;
    use super::ReintegrationPolicy;
    use super::recorder_script;
    use crate::marker::HelperMarker;

    fn recorder_with(markups: &[&str]) -> MutationRecorder {
        let mut recorder = MutationRecorder::new();
        recorder.extend(markups.iter().map(|markup| RecordedScript::page(*markup)));
        recorder
    }

    #[test]
    fn leading_entries_are_discarded() {
        let mut recorder = recorder_with(&["<script>a</script>", "<script>b</script>", "<script>c</script>"]);
        let taken = recorder.take_reintegrable(ReintegrationPolicy::default());
        assert_eq!(taken, vec!["<script>c</script>".to_owned()]);
        assert!(recorder.is_empty());
    }

    #[test]
    fn short_buffers_are_kept_for_later() {
        let mut recorder = recorder_with(&["<script>a</script>", "<script>b</script>"]);
        assert!(recorder.take_reintegrable(ReintegrationPolicy::default()).is_empty());
        assert_eq!(recorder.len(), 2);

        recorder.record(RecordedScript::page("<script>c</script>"));
        assert_eq!(
            recorder.take_reintegrable(ReintegrationPolicy::default()),
            vec!["<script>c</script>".to_owned()]
        );
    }

    #[test]
    fn blank_selections_leave_the_buffer_untouched() {
        let mut recorder = recorder_with(&["<script>a</script>", "<script>b</script>", "  ", ""]);
        assert!(recorder.take_reintegrable(ReintegrationPolicy::default()).is_empty());
        assert_eq!(recorder.len(), 4);
    }

    #[test]
    fn skip_injected_uses_the_tag_instead_of_position() {
        let mut recorder = MutationRecorder::new();
        recorder.record(RecordedScript::page("<script>first()</script>"));
        recorder.record(RecordedScript::injected("<script>helper()</script>"));
        recorder.record(RecordedScript::page("<script>second()</script>"));
        assert_eq!(
            recorder.take_reintegrable(ReintegrationPolicy::SkipInjected),
            vec![
                "<script>first()</script>".to_owned(),
                "<script>second()</script>".to_owned()
            ]
        );
    }

    #[test]
    fn injected_entries_never_return_even_past_the_discarded_prefix() {
        let mut recorder = recorder_with(&["<script>a</script>", "<script>b</script>"]);
        recorder.record(RecordedScript::injected("<script>helper()</script>"));
        recorder.record(RecordedScript::page("<script>d</script>"));
        assert_eq!(
            recorder.take_reintegrable(ReintegrationPolicy::DiscardLeading(2)),
            vec!["<script>d</script>".to_owned()]
        );
    }

    #[test]
    fn entries_deserialize_without_the_injected_flag() {
        let parsed: Vec<RecordedScript> =
            serde_json::from_str(r#"[{"markup":"<script>x</script>"},{"markup":"","injected":true}]"#)
                .unwrap_or_default();
        assert_eq!(
            parsed,
            vec![
                RecordedScript::page("<script>x</script>"),
                RecordedScript::injected("")
            ]
        );
    }

    #[test]
    fn recorder_script_embeds_the_session_token() {
        let marker = HelperMarker::from_token("abc123");
        let source = recorder_script(&marker);
        assert!(source.contains(r#"var token = "abc123";"#));
        assert!(source.contains("window.__pv_removed_scripts = []"));
        assert!(source.contains("node.__pvMarker === token"));
    }
}
