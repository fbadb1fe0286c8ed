//! DOM tree data structures.
//!
//! Nodes live in an append-only arena owned by [`Document`]. Detaching a node
//! only unlinks it from its parent; its id stays valid so that callers holding
//! ids of removed nodes (a mutation recorder, for example) can still serialize
//! them.

mod serialize;
mod snapshot;

pub use serialize::SerializeOptions;
pub use serialize::escape_attribute;
pub use serialize::escape_text;
pub use serialize::is_raw_text_element;
pub use serialize::is_void_element;
pub use snapshot::NodeSnapshot;

/// ID used to address nodes in the DOM arena.
pub type NodeId = usize;

/// Element payload: lowercase tag name, ordered attributes, optional helper marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    /// Structural tag placed on nodes injected by the preview engine. It is
    /// not an attribute, so page markup can never forge it.
    pub marker: Option<String>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attrs: Vec::new(),
            marker: None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_ascii_lowercase(), value)),
        }
    }

    /// Copies attributes that are not present yet (HTML "merge attributes" rule
    /// for repeated `<html>`/`<body>` start tags).
    pub fn merge_missing_attrs(&mut self, attrs: &[(String, String)]) {
        for (name, value) in attrs {
            if self.attr(name).is_none() {
                self.attrs.push((name.clone(), value.clone()));
            }
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Node payload variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Doctype { name: String },
    Element(Element),
    Text(String),
    Comment(String),
    /// Pre-serialized markup emitted verbatim (used to splice recorded scripts back in).
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }
}

/// Arena-backed document. Node `0` is always the document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
        }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[Self::ROOT].children.is_empty()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node::new(data));
        self.nodes.len() - 1
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element(Element::new(name)))
    }

    pub fn create_element_with(&mut self, name: &str, attrs: Vec<(String, String)>) -> NodeId {
        let mut element = Element::new(name);
        element.attrs = attrs;
        self.push(NodeData::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    pub fn create_doctype(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeData::Doctype { name: name.into() })
    }

    pub fn create_raw(&mut self, markup: impl Into<String>) -> NodeId {
        self.push(NodeData::Raw(markup.into()))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id).map(|node| &mut node.data) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id).map(|node| &node.data) {
            Some(NodeData::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Appends to an existing text node; returns false when `id` is not text.
    pub fn push_text(&mut self, id: NodeId, extra: &str) -> bool {
        match self.nodes.get_mut(id).map(|node| &mut node.data) {
            Some(NodeData::Text(text)) => {
                text.push_str(extra);
                true
            }
            _ => false,
        }
    }

    pub fn set_marker(&mut self, id: NodeId, marker: &str) {
        if let Some(element) = self.element_mut(id) {
            element.marker = Some(marker.to_owned());
        }
    }

    /// Appends `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Inserts `child` before `reference` (or at the end when `reference` is
    /// `None` or not a child of `parent`).
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if parent >= self.nodes.len() || child >= self.nodes.len() || parent == child {
            return;
        }
        if self.is_ancestor(child, parent) {
            return;
        }

        self.detach(child);
        let siblings = &mut self.nodes[parent].children;
        let index = reference
            .and_then(|reference| siblings.iter().position(|id| *id == reference))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
        self.nodes[child].parent = Some(parent);
    }

    /// Unlinks a node from its parent. Returns false when it was not attached.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        self.nodes[parent].children.retain(|child| *child != id);
        self.nodes[id].parent = None;
        true
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        while let Some(parent) = self.parent(node) {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }

    /// Preorder list of descendants of `id` (excluding `id` itself).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(Self::ROOT)
            .iter()
            .copied()
            .find(|id| self.element(*id).is_some())
    }

    pub fn doctype(&self) -> Option<&str> {
        self.children(Self::ROOT)
            .iter()
            .find_map(|id| match self.node(*id).map(|node| &node.data) {
                Some(NodeData::Doctype { name }) => Some(name.as_str()),
                _ => None,
            })
    }

    pub fn head(&self) -> Option<NodeId> {
        self.document_element()
            .and_then(|html| self.first_child_element(html, "head"))
    }

    pub fn body(&self) -> Option<NodeId> {
        self.document_element()
            .and_then(|html| self.first_child_element(html, "body"))
    }

    pub fn first_child_element(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|id| self.element(*id).is_some_and(|element| element.is(name)))
    }

    pub fn find_first_element(&self, from: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(from)
            .into_iter()
            .find(|id| self.element(*id).is_some_and(|element| element.is(name)))
    }

    pub fn elements_by_name(&self, from: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(from)
            .into_iter()
            .filter(|id| self.element(*id).is_some_and(|element| element.is(name)))
            .collect()
    }

    /// Attached elements carrying exactly `marker`.
    pub fn marked_elements(&self, marker: &str) -> Vec<NodeId> {
        self.descendants(Self::ROOT)
            .into_iter()
            .filter(|id| {
                self.element(*id)
                    .is_some_and(|element| element.marker.as_deref() == Some(marker))
            })
            .collect()
    }

    /// Detaches every attached element tagged with `marker`; returns how many were removed.
    pub fn strip_marked(&mut self, marker: &str) -> usize {
        let marked = self.marked_elements(marker);
        let mut removed = 0;
        for id in marked {
            if self.detach(id) {
                removed += 1;
            }
        }
        removed
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(NodeData::Text(text)) = self.node(id).map(|node| &node.data) {
            out.push_str(text);
            return out;
        }
        for descendant in self.descendants(id) {
            if let Some(NodeData::Text(text)) = self.node(descendant).map(|node| &node.data) {
                out.push_str(text);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Document;
    use super::NodeData;

    fn skeleton() -> (Document, usize, usize, usize) {
        let mut doc = Document::new();
        let html = doc.create_element("HTML");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(doc.root(), html);
        doc.append_child(html, head);
        doc.append_child(html, body);
        (doc, html, head, body)
    }

    #[test]
    fn locates_structural_elements() {
        let (doc, html, head, body) = skeleton();
        assert_eq!(doc.document_element(), Some(html));
        assert_eq!(doc.head(), Some(head));
        assert_eq!(doc.body(), Some(body));
        assert_eq!(doc.element(html).map(|el| el.name.as_str()), Some("html"));
    }

    #[test]
    fn append_moves_nodes_between_parents() {
        let (mut doc, _, head, body) = skeleton();
        let p = doc.create_element("p");
        doc.append_child(head, p);
        doc.append_child(body, p);
        assert!(doc.children(head).is_empty());
        assert_eq!(doc.children(body), &[p]);
        assert_eq!(doc.parent(p), Some(body));
    }

    #[test]
    fn insert_before_respects_reference_and_rejects_cycles() {
        let (mut doc, html, _, body) = skeleton();
        let first = doc.create_element("p");
        let second = doc.create_element("p");
        doc.append_child(body, second);
        doc.insert_before(body, first, Some(second));
        assert_eq!(doc.children(body), &[first, second]);

        doc.insert_before(body, html, None);
        assert_eq!(doc.parent(html), Some(doc.root()));
    }

    #[test]
    fn strip_marked_only_touches_matching_tokens() {
        let (mut doc, _, head, body) = skeleton();
        let ours = doc.create_element("script");
        let theirs = doc.create_element("script");
        let page = doc.create_element("script");
        doc.append_child(head, ours);
        doc.append_child(head, theirs);
        doc.append_child(body, page);
        doc.set_marker(ours, "abc123");
        doc.set_marker(theirs, "abc1234");

        assert_eq!(doc.strip_marked("abc123"), 1);
        assert_eq!(doc.children(head), &[theirs]);
        assert_eq!(doc.children(body), &[page]);
        assert_eq!(doc.strip_marked("abc123"), 0);
    }

    #[test]
    fn detached_nodes_keep_their_payload() {
        let (mut doc, _, _, body) = skeleton();
        let text = doc.create_text("kept");
        doc.append_child(body, text);
        assert!(doc.detach(text));
        assert!(!doc.detach(text));
        assert!(matches!(
            doc.node(text).map(|node| &node.data),
            Some(NodeData::Text(value)) if value == "kept"
        ));
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let (mut doc, _, _, body) = skeleton();
        let p = doc.create_element("p");
        let a = doc.create_text("hello ");
        let b = doc.create_element("b");
        let c = doc.create_text("world");
        doc.append_child(body, p);
        doc.append_child(p, a);
        doc.append_child(p, b);
        doc.append_child(b, c);
        assert_eq!(doc.text_content(body), "hello world");
    }
}
