//! Building tree nodes from HTML source.
//!
//! Parsing is error tolerant: stray end tags are ignored, unclosed elements
//! end with the input and void elements never take children.

use composer_syntax::{
    TokenKind, comment_body, decode_text, is_void_element, lex, parse_end_tag, parse_start_tag,
};

use super::{Document, NodeId};

impl Document {
    /// Parse a complete document. `<head>` content goes to the head, the
    /// `<body>` attributes are kept, anything outside both lands in the body.
    pub fn from_html(html: &str) -> Self {
        let mut doc = Self::new();
        let body = doc.body();
        doc.build(body, html, true);
        doc
    }

    /// Replace the children of `parent` with nodes parsed from `html`.
    pub fn set_inner_html(&mut self, parent: NodeId, html: &str) {
        if !self.is_element(parent) {
            return;
        }
        self.remove_children(parent);
        self.build(parent, html, false);
    }

    /// Parse `html` into detached top-level nodes.
    pub fn parse_fragment(&mut self, html: &str) -> Vec<NodeId> {
        let holder = self.create_element("div");
        self.build(holder, html, false);
        let nodes = self.children(holder).to_vec();
        self.remove_children(holder);
        nodes
    }

    fn build(&mut self, base: NodeId, html: &str, whole_document: bool) {
        let mut stack = vec![base];

        for token in lex(html) {
            let top = *stack.last().unwrap_or(&base);
            match token.kind {
                TokenKind::Text => {
                    let text = decode_text(token.text).into_owned();
                    if !text.is_empty() {
                        let node = self.create_text(text);
                        self.attach(top, node, None);
                    }
                }
                TokenKind::Comment => {
                    let node = self.create_comment(comment_body(token.text));
                    self.attach(top, node, None);
                }
                TokenKind::Declaration => {}
                TokenKind::StartTag => {
                    let Some(tag) = parse_start_tag(token.text) else {
                        let node = self.create_text(token.text);
                        self.attach(top, node, None);
                        continue;
                    };
                    if whole_document {
                        match tag.name.as_str() {
                            "html" => {
                                self.copy_attrs(self.root(), &tag.attrs);
                                continue;
                            }
                            "head" => {
                                stack = vec![self.head()];
                                continue;
                            }
                            "body" => {
                                self.copy_attrs(self.body(), &tag.attrs);
                                stack = vec![self.body()];
                                continue;
                            }
                            _ => {}
                        }
                    }
                    let node = self.create_element(&tag.name);
                    self.copy_attrs(node, &tag.attrs);
                    self.attach(top, node, None);
                    if !tag.self_closing && !is_void_element(&tag.name) {
                        stack.push(node);
                    }
                }
                TokenKind::EndTag => {
                    let Some(name) = parse_end_tag(token.text) else {
                        continue;
                    };
                    if whole_document && matches!(name.as_str(), "html" | "body") {
                        continue;
                    }
                    if whole_document && name == "head" {
                        stack = vec![self.body()];
                        continue;
                    }
                    // Close the nearest open element with this name, never the base
                    if let Some(depth) = stack
                        .iter()
                        .skip(1)
                        .rposition(|open| self.is_tag(*open, &name))
                    {
                        stack.truncate(depth + 1);
                    }
                }
            }
        }
    }

    fn copy_attrs(&mut self, node: NodeId, attrs: &[(String, String)]) {
        for (name, value) in attrs {
            self.set_attr(node, name, value);
        }
    }
}
