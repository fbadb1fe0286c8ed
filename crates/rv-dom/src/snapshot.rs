//! Serde-friendly tree form used to move documents across the JS boundary.

use crate::Document;
use crate::Element;
use crate::NodeData;
use crate::NodeId;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "lowercase")]
pub enum NodeSnapshot {
    Doctype {
        name: String,
    },
    Element {
        name: String,
        #[serde(default)]
        attrs: Vec<(String, String)>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        marker: Option<String>,
        #[serde(default)]
        children: Vec<NodeSnapshot>,
    },
    Text {
        data: String,
    },
    Comment {
        data: String,
    },
}

impl Document {
    /// Snapshot of the top-level nodes (doctype and document element).
    pub fn snapshot(&self) -> Vec<NodeSnapshot> {
        self.children(Self::ROOT)
            .iter()
            .filter_map(|id| self.snapshot_node(*id))
            .collect()
    }

    pub fn snapshot_node(&self, id: NodeId) -> Option<NodeSnapshot> {
        let node = self.node(id)?;
        let snapshot = match &node.data {
            NodeData::Document => return None,
            NodeData::Doctype { name } => NodeSnapshot::Doctype { name: name.clone() },
            NodeData::Text(text) => NodeSnapshot::Text { data: text.clone() },
            NodeData::Comment(text) => NodeSnapshot::Comment { data: text.clone() },
            NodeData::Raw(markup) => NodeSnapshot::Text {
                data: markup.clone(),
            },
            NodeData::Element(element) => NodeSnapshot::Element {
                name: element.name.clone(),
                attrs: element.attrs.clone(),
                marker: element.marker.clone(),
                children: node
                    .children()
                    .iter()
                    .filter_map(|child| self.snapshot_node(*child))
                    .collect(),
            },
        };
        Some(snapshot)
    }

    pub fn from_snapshot(nodes: &[NodeSnapshot]) -> Self {
        let mut doc = Self::new();
        for node in nodes {
            doc.import_snapshot(Self::ROOT, node);
        }
        doc
    }

    /// Rebuilds `snapshot` under `parent`, returning the new node id.
    pub fn import_snapshot(&mut self, parent: NodeId, snapshot: &NodeSnapshot) -> NodeId {
        let id = match snapshot {
            NodeSnapshot::Doctype { name } => self.create_doctype(name.clone()),
            NodeSnapshot::Text { data } => self.create_text(data.clone()),
            NodeSnapshot::Comment { data } => self.create_comment(data.clone()),
            NodeSnapshot::Element {
                name,
                attrs,
                marker,
                children,
            } => {
                let mut element = Element::new(name.as_str());
                element.attrs = attrs.clone();
                element.marker = marker.clone();
                let id = self.push_element(element);
                for child in children {
                    self.import_snapshot(id, child);
                }
                id
            }
        };
        self.append_child(parent, id);
        id
    }

    fn push_element(&mut self, element: Element) -> NodeId {
        let id = self.create_element(&element.name);
        if let Some(slot) = self.element_mut(id) {
            *slot = element;
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::NodeSnapshot;
    use crate::Document;

    #[test]
    fn decodes_compact_json_shape() {
        let json = r#"[
            {"t":"doctype","name":"html"},
            {"t":"element","name":"html","children":[
                {"t":"element","name":"body","attrs":[["class","x"]],"children":[
                    {"t":"text","data":"hi"},
                    {"t":"element","name":"script","marker":"tok","children":[]}
                ]}
            ]}
        ]"#;
        let nodes: Vec<NodeSnapshot> = match serde_json::from_str(json) {
            Ok(nodes) => nodes,
            Err(error) => panic!("{error}"),
        };

        let doc = Document::from_snapshot(&nodes);
        assert_eq!(doc.doctype(), Some("html"));
        let body = doc.body();
        assert!(body.is_some());
        let body = body.unwrap_or_default();
        assert_eq!(doc.element(body).and_then(|el| el.attr("class")), Some("x"));
        assert_eq!(doc.marked_elements("tok").len(), 1);
    }

    #[test]
    fn snapshot_preserves_markers_and_order() {
        let mut doc = Document::new();
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let style = doc.create_element("style");
        doc.append_child(doc.root(), html);
        doc.append_child(html, head);
        doc.append_child(head, style);
        doc.set_marker(style, "m1");

        let rebuilt = Document::from_snapshot(&doc.snapshot());
        assert_eq!(rebuilt.to_html(), doc.to_html());
        assert_eq!(rebuilt.marked_elements("m1").len(), 1);
    }
}
