use composer_syntax::is_void_element;

use super::{Document, NodeData, NodeId};

/// Elements whose text children are written without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl Document {
    /// Serialize the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(*child, &mut out);
        }
        out
    }

    /// Serialize `id` including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        enum Step {
            Open(NodeId),
            Close(NodeId),
        }

        let mut stack = vec![Step::Open(id)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Close(node) => {
                    if let Some(tag) = self.tag_name(node) {
                        out.push_str("</");
                        out.push_str(tag);
                        out.push('>');
                    }
                }
                Step::Open(node) => match self.data(node) {
                    NodeData::Text(text) => {
                        let raw = self
                            .parent(node)
                            .and_then(|p| self.tag_name(p))
                            .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
                        if raw {
                            out.push_str(text);
                        } else {
                            out.push_str(&html_escape::encode_text(text));
                        }
                    }
                    NodeData::Comment(text) => {
                        out.push_str("<!--");
                        out.push_str(text);
                        out.push_str("-->");
                    }
                    NodeData::Element(el) => {
                        out.push('<');
                        out.push_str(&el.tag);
                        for (name, value) in &el.attrs {
                            out.push(' ');
                            out.push_str(name);
                            if !value.is_empty() {
                                out.push_str("=\"");
                                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                                out.push('"');
                            }
                        }
                        out.push('>');
                        if !is_void_element(&el.tag) {
                            stack.push(Step::Close(node));
                            stack.extend(self.children(node).iter().rev().map(|c| Step::Open(*c)));
                        }
                    }
                },
            }
        }
    }
}
