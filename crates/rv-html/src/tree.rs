//! Tree construction: a reduced set of HTML insertion modes.
//!
//! Handles the cases preview documents actually hit: implied
//! `<html>`/`<head>`/`<body>`, attribute merging for repeated `<html>` and
//! `<body>` tags, head-only elements before content, void elements, and the
//! common implied end tags. Misnested end tags with no matching open element
//! are ignored instead of unwinding the stack.

use crate::tokenizer::Token;
use rv_dom::Document;
use rv_dom::NodeId;
use rv_dom::is_void_element;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Initial,
    InHead,
    AfterHead,
    InBody,
}

pub(crate) struct TreeBuilder<'d> {
    doc: &'d mut Document,
    mode: Mode,
    stack: Vec<NodeId>,
    /// Lowest stack depth end tags may pop to.
    floor: usize,
    html: Option<NodeId>,
    head: Option<NodeId>,
    body: Option<NodeId>,
}

impl<'d> TreeBuilder<'d> {
    pub(crate) fn for_document(doc: &'d mut Document) -> Self {
        Self {
            doc,
            mode: Mode::Initial,
            stack: Vec::new(),
            floor: 0,
            html: None,
            head: None,
            body: None,
        }
    }

    /// Builder that inserts under `context` as if it were the current `<body>`.
    pub(crate) fn for_fragment(doc: &'d mut Document, context: NodeId) -> Self {
        let html = doc.document_element();
        let head = doc.head();
        let body = doc.body();
        Self {
            doc,
            mode: Mode::InBody,
            stack: vec![context],
            floor: 1,
            html,
            head,
            body,
        }
    }

    pub(crate) fn run(mut self, tokens: Vec<Token>) {
        for token in tokens {
            self.process(token);
        }
    }

    fn process(&mut self, token: Token) {
        match self.mode {
            Mode::Initial | Mode::InHead | Mode::AfterHead => self.process_before_body(token),
            Mode::InBody => self.process_in_body(token),
        }
    }

    fn process_before_body(&mut self, token: Token) {
        match token {
            Token::Doctype(name) => {
                if self.mode == Mode::Initial && self.html.is_none() && self.doc.doctype().is_none() {
                    let doctype = self.doc.create_doctype(name);
                    let root = self.doc.root();
                    self.doc.append_child(root, doctype);
                }
            }
            Token::Comment(text) => {
                let comment = self.doc.create_comment(text);
                let parent = self.current_or_root();
                self.doc.append_child(parent, comment);
            }
            Token::Text(text) if text.trim().is_empty() => {
                if self.mode == Mode::InHead {
                    self.insert_text(text);
                }
            }
            Token::Text(text) if self.mode == Mode::InHead && self.inside_head_child() => {
                self.insert_text(text);
            }
            Token::Start { name, attrs, .. } if name == "html" => {
                self.ensure_html(&attrs);
            }
            Token::Start { name, attrs, .. } if name == "head" => {
                if self.head.is_none() {
                    let html = self.ensure_html(&[]);
                    let head = self.doc.create_element_with("head", attrs);
                    self.doc.append_child(html, head);
                    self.head = Some(head);
                    self.stack = vec![html, head];
                    self.mode = Mode::InHead;
                }
            }
            Token::End { name } if name == "head" => {
                if self.mode == Mode::InHead {
                    let html = self.ensure_html(&[]);
                    self.stack = vec![html];
                    self.mode = Mode::AfterHead;
                }
            }
            Token::Start { name, attrs, .. } if name == "body" => {
                self.ensure_body(&attrs);
                self.mode = Mode::InBody;
            }
            Token::Start {
                name,
                attrs,
                self_closing,
            } if is_head_element(&name) && self.mode != Mode::AfterHead => {
                let head = self.ensure_head();
                if self.stack.last() != Some(&head) && !self.stack.contains(&head) {
                    self.stack.push(head);
                }
                self.insert_element(name, attrs, self_closing);
            }
            Token::End { name } if self.mode == Mode::InHead && self.has_open(&name) => {
                self.pop_until(&name);
            }
            Token::End { .. } => {}
            other => {
                self.ensure_body(&[]);
                self.mode = Mode::InBody;
                self.process_in_body(other);
            }
        }
    }

    fn process_in_body(&mut self, token: Token) {
        match token {
            Token::Doctype(_) => {}
            Token::Comment(text) => {
                let comment = self.doc.create_comment(text);
                let parent = self.current_or_root();
                self.doc.append_child(parent, comment);
            }
            Token::Text(text) => self.insert_text(text),
            Token::Start { name, attrs, .. } if name == "html" => {
                if let Some(element) = self.html.and_then(|html| self.doc.element_mut(html)) {
                    element.merge_missing_attrs(&attrs);
                }
            }
            Token::Start { name, attrs, .. } if name == "body" => {
                if let Some(element) = self.body.and_then(|body| self.doc.element_mut(body)) {
                    element.merge_missing_attrs(&attrs);
                }
            }
            Token::Start { name, .. } if name == "head" => {}
            Token::Start {
                name,
                attrs,
                self_closing,
            } => {
                self.close_implied_for(&name);
                self.insert_element(name, attrs, self_closing);
            }
            Token::End { name } if matches!(name.as_str(), "html" | "body" | "head") => {}
            Token::End { name } => {
                if self.has_open(&name) {
                    self.pop_until(&name);
                }
            }
        }
    }

    fn current_or_root(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(Document::ROOT)
    }

    fn ensure_html(&mut self, attrs: &[(String, String)]) -> NodeId {
        if let Some(html) = self.html {
            if let Some(element) = self.doc.element_mut(html) {
                element.merge_missing_attrs(attrs);
            }
            return html;
        }

        let html = self.doc.create_element_with("html", attrs.to_vec());
        let root = self.doc.root();
        self.doc.append_child(root, html);
        self.html = Some(html);
        self.stack = vec![html];
        html
    }

    fn ensure_head(&mut self) -> NodeId {
        if let Some(head) = self.head {
            return head;
        }

        let html = self.ensure_html(&[]);
        let head = self.doc.create_element("head");
        self.doc.append_child(html, head);
        self.head = Some(head);
        self.stack = vec![html, head];
        self.mode = Mode::InHead;
        head
    }

    fn ensure_body(&mut self, attrs: &[(String, String)]) -> NodeId {
        if let Some(body) = self.body {
            if let Some(element) = self.doc.element_mut(body) {
                element.merge_missing_attrs(attrs);
            }
            return body;
        }

        self.ensure_head();
        let html = self.ensure_html(&[]);
        let body = self.doc.create_element_with("body", attrs.to_vec());
        self.doc.append_child(html, body);
        self.body = Some(body);
        self.stack = vec![html, body];
        self.floor = 2;
        body
    }

    fn insert_text(&mut self, text: String) {
        let parent = self.current_or_root();
        if parent == Document::ROOT {
            return;
        }

        // Coalesce with a preceding text sibling.
        if let Some(last) = self.doc.children(parent).last().copied() {
            if self.doc.push_text(last, &text) {
                return;
            }
        }

        let node = self.doc.create_text(text);
        self.doc.append_child(parent, node);
    }

    fn insert_element(&mut self, name: String, attrs: Vec<(String, String)>, self_closing: bool) {
        let parent = self.current_or_root();
        let element = self.doc.create_element_with(&name, attrs);
        self.doc.append_child(parent, element);
        if !(self_closing || is_void_element(&name)) {
            self.stack.push(element);
        }
    }

    fn current_name(&self) -> Option<&str> {
        self.stack
            .last()
            .and_then(|id| self.doc.element(*id))
            .map(|element| element.name.as_str())
    }

    /// True while a `<title>`, `<style>`, `<script>` (and so on) opened in head is current.
    fn inside_head_child(&self) -> bool {
        self.current_name().is_some_and(|name| name != "head" && name != "html")
    }

    fn has_open(&self, name: &str) -> bool {
        self.stack[self.floor.min(self.stack.len())..]
            .iter()
            .any(|id| self.doc.element(*id).is_some_and(|element| element.is(name)))
    }

    fn pop_until(&mut self, name: &str) {
        while self.stack.len() > self.floor {
            let Some(top) = self.stack.pop() else {
                break;
            };
            if self.doc.element(top).is_some_and(|element| element.is(name)) {
                break;
            }
        }
    }

    fn close_implied_for(&mut self, incoming: &str) {
        if closes_paragraph(incoming) && self.current_name() == Some("p") {
            self.pop_until("p");
        }

        let siblings: &[&str] = match incoming {
            "li" => &["li"],
            "dt" | "dd" => &["dt", "dd"],
            "option" => &["option"],
            "tr" => &["tr", "td", "th"],
            "td" | "th" => &["td", "th"],
            _ => &[],
        };
        let current = self.current_name().map(str::to_owned);
        if let Some(current) = current {
            if siblings.contains(&current.as_str()) {
                self.pop_until(&current);
            }
        }
    }
}

fn is_head_element(name: &str) -> bool {
    matches!(
        name,
        "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script" | "style"
            | "template" | "title"
    )
}

fn closes_paragraph(name: &str) -> bool {
    matches!(
        name,
        "address"
            | "article"
            | "aside"
            | "blockquote"
            | "div"
            | "dl"
            | "fieldset"
            | "footer"
            | "form"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "header"
            | "hr"
            | "main"
            | "nav"
            | "ol"
            | "p"
            | "pre"
            | "section"
            | "table"
            | "ul"
    )
}
