//! HTML tokenization and tree construction.

mod tokenizer;
mod tree;

use rv_dom::Document;
use rv_dom::NodeId;
use rv_dom::NodeSnapshot;

/// Parses raw HTML into a DOM document.
#[derive(Debug, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn parse(&self, input: &str) -> Document {
        let mut doc = Document::new();
        tree::TreeBuilder::for_document(&mut doc).run(tokenizer::tokenize(input));
        doc
    }

    /// Parses `input` as the children of `context` (the `innerHTML` setter and
    /// `document.write` path).
    pub fn parse_fragment_into(&self, doc: &mut Document, context: NodeId, input: &str) {
        tree::TreeBuilder::for_fragment(doc, context).run(tokenizer::tokenize(input));
    }

    /// Parses a body-context fragment and returns its top-level nodes.
    pub fn parse_fragment(&self, input: &str) -> Vec<NodeSnapshot> {
        let mut scratch = Document::new();
        let html = scratch.create_element("html");
        let body = scratch.create_element("body");
        scratch.append_child(Document::ROOT, html);
        scratch.append_child(html, body);

        self.parse_fragment_into(&mut scratch, body, input);
        scratch
            .children(body)
            .iter()
            .filter_map(|id| scratch.snapshot_node(*id))
            .collect()
    }
}

/// First `<title>` text with whitespace collapsed.
pub fn document_title(doc: &Document) -> Option<String> {
    let title = doc.find_first_element(Document::ROOT, "title")?;
    let collapsed = collapse_whitespace(&doc.text_content(title));
    (!collapsed.is_empty()).then_some(collapsed)
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decodes character references in `input`.
pub fn decode_entities(input: &str) -> String {
    tokenizer::decode_entities(input)
}

#[cfg(test)]
mod tests {
    use super::HtmlParser;
    use super::document_title;
    use rv_dom::NodeSnapshot;

    #[test]
    fn builds_implied_structure() {
        let doc = HtmlParser.parse("<p>hello</p>");
        assert_eq!(
            doc.to_html(),
            "<html><head></head><body><p>hello</p></body></html>"
        );
    }

    #[test]
    fn keeps_doctype_and_head_elements() {
        let doc = HtmlParser.parse(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>T</title></head><body>x</body></html>",
        );
        assert_eq!(doc.doctype(), Some("html"));
        assert_eq!(
            doc.to_html(),
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>T</title></head><body>x</body></html>"
        );
    }

    #[test]
    fn head_only_elements_before_content_land_in_head() {
        let doc = HtmlParser.parse("<style>p{}</style><script>var a = 1 < 2;</script><p>x</p>");
        let head = doc.head().unwrap_or_default();
        let body = doc.body().unwrap_or_default();
        assert_eq!(doc.children(head).len(), 2);
        assert_eq!(doc.inner_html(body), "<p>x</p>");
        assert_eq!(
            doc.inner_html(head),
            "<style>p{}</style><script>var a = 1 < 2;</script>"
        );
    }

    #[test]
    fn scripts_after_content_stay_in_body_order() {
        let doc = HtmlParser.parse("<p>a</p><script>one()</script><div>b</div><script>two()</script>");
        let body = doc.body().unwrap_or_default();
        assert_eq!(
            doc.inner_html(body),
            "<p>a</p><script>one()</script><div>b</div><script>two()</script>"
        );
    }

    #[test]
    fn repeated_body_tags_merge_attributes() {
        let doc = HtmlParser.parse("<body class=\"a\"><p>x</p><body class=\"b\" id=\"late\">");
        let body = doc.body().unwrap_or_default();
        let element = doc.element(body);
        assert_eq!(element.and_then(|el| el.attr("class")), Some("a"));
        assert_eq!(element.and_then(|el| el.attr("id")), Some("late"));
    }

    #[test]
    fn stray_end_tags_are_ignored() {
        let doc = HtmlParser.parse("<div><span>a</div></span>b</div>");
        let body = doc.body().unwrap_or_default();
        assert_eq!(doc.inner_html(body), "<div><span>a</span></div>b");
    }

    #[test]
    fn implied_end_tags_close_paragraphs_and_list_items() {
        let doc = HtmlParser.parse("<p>one<div>two</div><ul><li>a<li>b</ul>");
        let body = doc.body().unwrap_or_default();
        assert_eq!(
            doc.inner_html(body),
            "<p>one</p><div>two</div><ul><li>a</li><li>b</li></ul>"
        );
    }

    #[test]
    fn void_and_self_closing_elements_do_not_nest() {
        let doc = HtmlParser.parse("<p>a<br>b<img src=\"x.png\"/>c</p>");
        let body = doc.body().unwrap_or_default();
        assert_eq!(doc.inner_html(body), "<p>a<br>b<img src=\"x.png\">c</p>");
    }

    #[test]
    fn fragment_parsing_returns_top_level_nodes() {
        let nodes = HtmlParser.parse_fragment("<b>bold</b> tail<!--c-->");
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[0], NodeSnapshot::Element { name, .. } if name == "b"));
        assert!(matches!(&nodes[1], NodeSnapshot::Text { data } if data == " tail"));
        assert!(matches!(&nodes[2], NodeSnapshot::Comment { data } if data == "c"));
    }

    #[test]
    fn fragment_cannot_pop_its_context() {
        let mut doc = HtmlParser.parse("<div id=\"host\"></div><p>after</p>");
        let body = doc.body().unwrap_or_default();
        let host = doc.first_child_element(body, "div").unwrap_or_default();
        HtmlParser.parse_fragment_into(&mut doc, host, "<i>x</div></body>y");
        assert_eq!(
            doc.inner_html(body),
            "<div id=\"host\"><i>xy</i></div><p>after</p>"
        );
    }

    #[test]
    fn extracts_collapsed_title() {
        let doc = HtmlParser.parse("<title>  Hello \n  world </title><p>x</p>");
        assert_eq!(document_title(&doc).as_deref(), Some("Hello world"));
        assert_eq!(document_title(&HtmlParser.parse("<p>x</p>")), None);
    }
}
