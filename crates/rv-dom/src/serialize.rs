//! HTML serialization of arena nodes.

use crate::Document;
use crate::NodeData;
use crate::NodeId;

/// Serialization knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// When set, marked elements are emitted with `<name>="true"` so that an
    /// external browsing context that only sees markup can still tell them apart.
    pub marker_attribute: Option<String>,
}

impl Document {
    /// Markup of the whole document, doctype included.
    pub fn to_html(&self) -> String {
        self.to_html_with(&SerializeOptions::default())
    }

    pub fn to_html_with(&self, options: &SerializeOptions) -> String {
        let mut out = String::new();
        for (index, child) in self.children(Self::ROOT).iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            self.write_node(*child, options, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &SerializeOptions::default(), &mut out);
        out
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(*child, &SerializeOptions::default(), &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, options: &SerializeOptions, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };

        match &node.data {
            NodeData::Document => {
                for child in node.children() {
                    self.write_node(*child, options, out);
                }
            }
            NodeData::Doctype { name } => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Raw(markup) => out.push_str(markup),
            NodeData::Text(text) => {
                let raw_parent = node
                    .parent()
                    .and_then(|parent| self.element(parent))
                    .is_some_and(|parent| is_raw_text_element(&parent.name));
                if raw_parent {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for (name, value) in &element.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                if let (Some(attribute), Some(_)) = (&options.marker_attribute, &element.marker) {
                    out.push(' ');
                    out.push_str(attribute);
                    out.push_str("=\"true\"");
                }
                out.push('>');

                if is_void_element(&element.name) {
                    return;
                }

                for child in node.children() {
                    self.write_node(*child, options, out);
                }
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
        }
    }
}

pub fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attribute(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Elements whose text children are serialized without escaping.
pub fn is_raw_text_element(name: &str) -> bool {
    matches!(
        name,
        "script" | "style" | "xmp" | "iframe" | "noembed" | "noframes" | "plaintext"
    )
}

#[cfg(test)]
mod tests {
    use super::SerializeOptions;
    use crate::Document;

    fn sample() -> (Document, usize, usize) {
        let mut doc = Document::new();
        let doctype = doc.create_doctype("html");
        let html = doc.create_element("html");
        let body = doc.create_element("body");
        doc.append_child(doc.root(), doctype);
        doc.append_child(doc.root(), html);
        doc.append_child(html, body);
        (doc, html, body)
    }

    #[test]
    fn escapes_text_but_not_script_source() {
        let (mut doc, html, body) = sample();
        let p = doc.create_element("p");
        let text = doc.create_text("a < b & c");
        let script = doc.create_element("script");
        let source = doc.create_text("if (a < b && c) {}");
        doc.append_child(body, p);
        doc.append_child(p, text);
        doc.append_child(body, script);
        doc.append_child(script, source);

        assert_eq!(
            doc.outer_html(html),
            "<html><body><p>a &lt; b &amp; c</p><script>if (a < b && c) {}</script></body></html>"
        );
    }

    #[test]
    fn void_elements_have_no_end_tag() {
        let (mut doc, _, body) = sample();
        let img = doc.create_element_with(
            "img",
            vec![("alt".to_owned(), "say \"hi\"".to_owned())],
        );
        doc.append_child(body, img);
        assert_eq!(doc.inner_html(body), "<img alt=\"say &quot;hi&quot;\">");
    }

    #[test]
    fn document_markup_starts_with_doctype() {
        let (doc, _, _) = sample();
        assert_eq!(doc.to_html(), "<!DOCTYPE html>\n<html><body></body></html>");
    }

    #[test]
    fn marker_attribute_is_opt_in() {
        let (mut doc, _, body) = sample();
        let style = doc.create_element("style");
        doc.append_child(body, style);
        doc.set_marker(style, "tok");

        assert!(!doc.to_html().contains("data-helper"));
        let tagged = doc.to_html_with(&SerializeOptions {
            marker_attribute: Some("data-helper-tok".to_owned()),
        });
        assert!(tagged.contains("<style data-helper-tok=\"true\"></style>"));
    }

    #[test]
    fn raw_nodes_are_emitted_verbatim() {
        let (mut doc, _, body) = sample();
        let raw = doc.create_raw("<script>x()</script>\n");
        doc.append_child(body, raw);
        assert_eq!(doc.inner_html(body), "<script>x()</script>\n");
    }
}
