//! Builds the augmented document a session loads into its browsing context.

use crate::marker::HelperMarker;
use crate::recorder::recorder_script;
use crate::view::ViewConfiguration;
use rv_dom::Document;
use rv_dom::NodeId;
use rv_dom::NodeSnapshot;
use rv_dom::SerializeOptions;
use rv_guard::CapabilityGuard;
use rv_guard::GuardPolicy;
use rv_html::HtmlParser;

/// Style reset injected so the previewed page fills its frame.
pub const RESET_STYLE: &str = "
    html, body {
      margin: 0;
      padding: 0;
      width: 100%;
      min-height: 100%;
      overflow-x: auto;
      overflow-y: auto;
    }
  ";

/// The preview document: helper head plus the untrusted source in the body.
///
/// Every injected helper element carries the session marker. Head order is
/// charset, viewport, reset style, mutation recorder, then the guard
/// scripts, so the recorder sees every page mutation and the guards are in
/// place before the first page script.
#[derive(Debug, Clone)]
pub struct AugmentedDocument {
    document: Document,
    marker: HelperMarker,
    view: ViewConfiguration,
    source: String,
}

impl AugmentedDocument {
    pub fn build(source: &str, view: &ViewConfiguration, marker: &HelperMarker) -> Self {
        let mut document = Document::new();
        let doctype = document.create_doctype("html");
        document.append_child(Document::ROOT, doctype);
        let html = document.create_element("html");
        document.append_child(Document::ROOT, html);

        let head = document.create_element("head");
        document.append_child(html, head);
        let charset =
            document.create_element_with("meta", vec![("charset".to_owned(), "UTF-8".to_owned())]);
        document.append_child(head, charset);
        let viewport = document.create_element_with(
            "meta",
            vec![
                ("name".to_owned(), "viewport".to_owned()),
                ("content".to_owned(), view.viewport_meta()),
            ],
        );
        document.append_child(head, viewport);

        append_helper(&mut document, head, "style", RESET_STYLE, marker);
        append_helper(&mut document, head, "script", &recorder_script(marker), marker);
        let guard = CapabilityGuard::new(GuardPolicy {
            block_network: view.block_network,
        });
        for script in guard.scripts() {
            append_helper(&mut document, head, "script", &script.source, marker);
        }

        let body = document.create_element("body");
        document.append_child(html, body);
        HtmlParser.parse_fragment_into(&mut document, body, source);

        Self {
            document,
            marker: marker.clone(),
            view: *view,
            source: source.to_owned(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        self.document.snapshot()
    }

    /// Markup for contexts that only consume strings. Helper elements carry
    /// the marker as an attribute.
    pub fn markup(&self) -> String {
        self.document.to_html_with(&SerializeOptions {
            marker_attribute: Some(self.marker.attribute_name()),
        })
    }

    pub fn marker(&self) -> &HelperMarker {
        &self.marker
    }

    pub fn view(&self) -> &ViewConfiguration {
        &self.view
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn helper_count(&self) -> usize {
        self.document.marked_elements(self.marker.token()).len()
    }
}

fn append_helper(
    document: &mut Document,
    parent: NodeId,
    name: &str,
    text: &str,
    marker: &HelperMarker,
) {
    let element = document.create_element(name);
    let content = document.create_text(text);
    document.append_child(element, content);
    document.set_marker(element, marker.token());
    document.append_child(parent, element);
}

#[cfg(test)]
mod tests {
    use super::AugmentedDocument;
    use crate::marker::HelperMarker;
    use crate::view::ViewConfiguration;
    use crate::view::ViewMode;

    fn names(doc: &AugmentedDocument, parent: usize) -> Vec<String> {
        doc.document()
            .children(parent)
            .iter()
            .filter_map(|id| doc.document().element(*id).map(|element| element.name.clone()))
            .collect()
    }

    #[test]
    fn head_carries_helpers_in_order() {
        let marker = HelperMarker::from_token("tok");
        let doc = AugmentedDocument::build("<p>hi</p>", &ViewConfiguration::default(), &marker);
        let Some(head) = doc.document().head() else {
            panic!("missing head");
        };
        assert_eq!(
            names(&doc, head),
            vec!["meta", "meta", "style", "script", "script", "script"]
        );
        assert_eq!(doc.helper_count(), 4);
    }

    #[test]
    fn allowing_network_drops_the_network_guard() {
        let marker = HelperMarker::from_token("tok");
        let view = ViewConfiguration::default().with_block_network(false);
        let doc = AugmentedDocument::build("<p>hi</p>", &view, &marker);
        assert_eq!(doc.helper_count(), 3);
        assert!(!doc.markup().contains("Network requests are blocked"));
    }

    #[test]
    fn source_lands_in_body_and_viewport_follows_view() {
        let marker = HelperMarker::from_token("tok");
        let view = ViewConfiguration::new(ViewMode::Mobile);
        let doc = AugmentedDocument::build(
            "<!DOCTYPE html><html><head><title>T</title></head><body><p id=\"x\">hi</p></body></html>",
            &view,
            &marker,
        );
        let markup = doc.markup();
        assert!(markup.starts_with("<!DOCTYPE html>"));
        assert!(markup.contains(r#"<meta name="viewport" content="width=375, initial-scale=1.0">"#));
        assert!(markup.contains(r#"<p id="x">hi</p>"#));
        assert_eq!(markup.matches("<!DOCTYPE").count(), 1);
        assert!(markup.contains(r#"<style data-preview-helper-tok="true">"#));
        let Some(body) = doc.document().body() else {
            panic!("missing body");
        };
        assert!(doc.document().inner_html(body).contains("hi</p>"));
    }
}
