use super::{Document, ElementData, NodeData, NodeId};

/// An owned, detached copy of a subtree.
///
/// Fragments outlive the node ids they were taken from, which is what the
/// undo history needs: replaying an edit rebuilds fresh nodes from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<Fragment>,
    },
    Text(String),
    Comment(String),
}

impl Document {
    pub fn to_fragment(&self, id: NodeId) -> Fragment {
        match self.data(id) {
            NodeData::Text(text) => Fragment::Text(text.clone()),
            NodeData::Comment(text) => Fragment::Comment(text.clone()),
            NodeData::Element(el) => Fragment::Element {
                tag: el.tag.clone(),
                attrs: el.attrs.clone(),
                children: self
                    .children(id)
                    .iter()
                    .map(|c| self.to_fragment(*c))
                    .collect(),
            },
        }
    }

    /// Fragments of every child of `id`.
    pub fn children_to_fragments(&self, id: NodeId) -> Vec<Fragment> {
        self.children(id)
            .iter()
            .map(|c| self.to_fragment(*c))
            .collect()
    }

    /// Build detached nodes for `fragment`.
    pub fn instantiate(&mut self, fragment: &Fragment) -> NodeId {
        match fragment {
            Fragment::Text(text) => self.create_text(text.clone()),
            Fragment::Comment(text) => self.create_comment(text.clone()),
            Fragment::Element {
                tag,
                attrs,
                children,
            } => {
                let node = self.push(NodeData::Element(ElementData {
                    tag: tag.clone(),
                    attrs: attrs.clone(),
                }));
                for child in children {
                    let child_node = self.instantiate(child);
                    self.attach(node, child_node, None);
                }
                node
            }
        }
    }

    /// Replace the children of `id` with nodes built from `fragments`.
    pub fn replace_children_with(&mut self, id: NodeId, fragments: &[Fragment]) {
        self.remove_children(id);
        for fragment in fragments {
            let node = self.instantiate(fragment);
            self.attach(id, node, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fragments_rebuild_equal_markup() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.set_inner_html(body, r#"<div class="p">one<br><b>two</b></div><!--x-->"#);
        let before = doc.inner_html(body);

        let fragments = doc.children_to_fragments(body);
        doc.set_inner_html(body, "changed");
        doc.replace_children_with(body, &fragments);

        assert_eq!(doc.inner_html(body), before);
    }
}
