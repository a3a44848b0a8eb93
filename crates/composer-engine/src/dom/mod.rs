//! In-memory document tree the composer edits.
//!
//! Nodes live in a slot map owned by [`Document`] and are addressed by
//! [`NodeId`]. Removing a node only detaches it, so an id held across an
//! edit stays valid until [`Document::collect_garbage`] reclaims the nodes
//! nothing reaches any more. Reclaimed slots are reused by later nodes.

pub mod classify;
pub mod fragment;
pub mod parse;
pub mod serialize;

use std::cmp::Ordering;
use std::collections::HashSet;

use slotmap::SlotMap;

use crate::error::DomError;

pub use classify::{MarkerKind, NodeClass};
pub use fragment::Fragment;

slotmap::new_key_type! {
    /// Handle to a node in a [`Document`].
    pub struct NodeId;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lower-case tag name
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Allocations since the last collection below which
/// [`Document::maybe_collect_garbage`] does nothing.
const GC_MIN_ALLOCATIONS: usize = 256;

/// A mutable HTML document with a distinguished `<body>`.
#[derive(Debug, Clone)]
pub struct Document {
    slots: SlotMap<NodeId, Slot>,
    allocated_since_collect: usize,
    root: NodeId,
    head: NodeId,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty `<html><head></head><body></body></html>` document.
    pub fn new() -> Self {
        let mut doc = Self {
            slots: SlotMap::with_key(),
            allocated_since_collect: 0,
            root: NodeId::default(),
            head: NodeId::default(),
            body: NodeId::default(),
        };
        let root = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.attach(root, head, None);
        doc.attach(root, body, None);
        doc.root = root;
        doc.head = head;
        doc.body = body;
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    // ---- creation -------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        }))
    }

    /// Create an element with the given attributes already set.
    pub fn create_element_with(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(tag);
        for (name, value) in attrs {
            self.set_attr(id, name, value);
        }
        id
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Comment(text.into()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.allocated_since_collect += 1;
        self.slots.insert(Slot {
            data,
            parent: None,
            children: Vec::new(),
        })
    }

    // ---- slot reclamation -------------------------------------------------

    /// Number of nodes held, connected or not.
    pub fn allocated_nodes(&self) -> usize {
        self.slots.len()
    }

    /// Whether `id` still names a node, i.e. it was not reclaimed.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.slots.contains_key(id)
    }

    /// Reclaim every node that is neither reachable from the root nor part
    /// of the detached tree holding one of `keep`. Returns how many nodes
    /// were freed. Ids of reclaimed nodes stop resolving.
    pub fn collect_garbage(&mut self, keep: &[NodeId]) -> usize {
        let mut stack = vec![self.root];
        for id in keep.iter().filter(|id| self.contains_node(**id)) {
            let top = self.ancestors(*id).last().unwrap_or(*id);
            stack.push(top);
        }
        let mut live = HashSet::with_capacity(self.slots.len());
        while let Some(id) = stack.pop() {
            if live.insert(id) {
                stack.extend(self.slots[id].children.iter().copied());
            }
        }

        let before = self.slots.len();
        self.slots.retain(|id, _| live.contains(&id));
        self.allocated_since_collect = 0;
        let freed = before - self.slots.len();
        if freed > 0 {
            log::trace!("reclaimed {freed} nodes, {} in use", self.slots.len());
        }
        freed
    }

    /// [`Document::collect_garbage`] once the nodes allocated since the
    /// last collection could have doubled the arena.
    pub fn maybe_collect_garbage(&mut self, keep: &[NodeId]) -> usize {
        let threshold = self.slots.len().max(GC_MIN_ALLOCATIONS);
        if self.allocated_since_collect < threshold {
            return 0;
        }
        self.collect_garbage(keep)
    }

    // ---- node data ------------------------------------------------------

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.slots[id].data
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.slots[id].data {
            NodeData::Element(el) => Some(el.tag.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.slots[id].data, NodeData::Element(_))
    }

    /// Whether `id` is an element with tag `tag` (lower-case).
    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id) == Some(tag)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.slots[id].data, NodeData::Text(_))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.slots[id].data {
            NodeData::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Length of a text node in characters, 0 for anything else.
    pub fn text_len(&self, id: NodeId) -> usize {
        self.text(id).map_or(0, |t| t.chars().count())
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<(), DomError> {
        match &mut self.slots[id].data {
            NodeData::Text(existing) => {
                *existing = text.into();
                Ok(())
            }
            _ => Err(DomError::NotText(id)),
        }
    }

    /// Insert `text` at character `offset` of a text node.
    pub fn insert_text(&mut self, id: NodeId, offset: usize, text: &str) -> Result<(), DomError> {
        let current = self.text(id).ok_or(DomError::NotText(id))?;
        let at = byte_offset(current, offset).ok_or(DomError::OffsetOutOfRange {
            node: id,
            offset,
            len: current.chars().count(),
        })?;
        let mut updated = current.to_string();
        updated.insert_str(at, text);
        self.set_text(id, updated)
    }

    /// Delete `count` characters starting at character `offset`.
    pub fn delete_text(&mut self, id: NodeId, offset: usize, count: usize) -> Result<(), DomError> {
        let current = self.text(id).ok_or(DomError::NotText(id))?;
        let len = current.chars().count();
        if offset > len {
            return Err(DomError::OffsetOutOfRange { node: id, offset, len });
        }
        let updated: String = current
            .chars()
            .enumerate()
            .filter(|(i, _)| *i < offset || *i >= offset + count)
            .map(|(_, c)| c)
            .collect();
        self.set_text(id, updated)
    }

    // ---- attributes -----------------------------------------------------

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match &self.slots[id].data {
            NodeData::Element(el) => &el.attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element(el) = &mut self.slots[id].data {
            match el.attrs.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) => *v = value.to_string(),
                None => el.attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeData::Element(el) = &mut self.slots[id].data {
            el.attrs.retain(|(n, _)| n != name);
        }
    }

    /// The `id` attribute.
    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.attr(id, "id")
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if !self.is_element(id) || self.has_class(id, class) {
            return;
        }
        let value = match self.attr(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &value);
    }

    /// Remove `class`, dropping the attribute once it is empty.
    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let Some(existing) = self.attr(id, "class") else {
            return;
        };
        let remaining: Vec<&str> = existing.split_whitespace().filter(|c| *c != class).collect();
        if remaining.is_empty() {
            self.remove_attr(id, "class");
        } else {
            let value = remaining.join(" ");
            self.set_attr(id, "class", &value);
        }
    }

    // ---- navigation -----------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.slots[id].children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index.checked_sub(1).map(|i| self.children(parent)[i])
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether `id` is attached to the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    /// First connected element whose `id` attribute is `element_id`.
    pub fn get_element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .find(|n| self.element_id(*n) == Some(element_id))
    }

    /// Descendants of `root` carrying `class`, in document order.
    pub fn elements_with_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .filter(|n| self.has_class(*n, class))
            .collect()
    }

    /// Descendants of `root` with tag `tag`, in document order.
    pub fn elements_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(root).filter(|n| self.is_tag(*n, tag)).collect()
    }

    /// Child-index path from `ancestor` down to `node`.
    pub fn path_from(&self, ancestor: NodeId, node: NodeId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = node;
        while current != ancestor {
            path.push(self.index_in_parent(current)?);
            current = self.parent(current)?;
        }
        path.reverse();
        Some(path)
    }

    /// Follow a child-index path down from `ancestor`.
    pub fn resolve_path(&self, ancestor: NodeId, path: &[usize]) -> Option<NodeId> {
        path.iter()
            .try_fold(ancestor, |node, index| self.children(node).get(*index).copied())
    }

    /// Document order of two connected nodes.
    pub fn tree_order(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let path_a = self.path_from(self.root, a).unwrap_or_default();
        let path_b = self.path_from(self.root, b).unwrap_or_default();
        path_a.cmp(&path_b)
    }

    // ---- mutation -------------------------------------------------------

    fn attach(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        self.slots[child].parent = Some(parent);
        let children = &mut self.slots[parent].children;
        match index {
            Some(i) if i <= children.len() => children.insert(i, child),
            _ => children.push(child),
        }
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if !self.is_element(parent) {
            return Err(DomError::NotAContainer(parent));
        }
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    /// Detach `id` from its parent. A no-op for detached nodes.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.slots[id].parent.take() {
            self.slots[parent].children.retain(|c| *c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.remove(child);
        self.attach(parent, child, None);
        Ok(())
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let first = self.first_child(parent);
        self.insert_before(parent, child, first)
    }

    /// Insert `child` under `parent` before `reference`, or at the end.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        if let Some(reference) = reference {
            if reference == child {
                return Ok(());
            }
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild { parent, reference });
            }
        }
        self.remove(child);
        let index = match reference {
            Some(reference) => self.index_in_parent(reference),
            None => None,
        };
        self.attach(parent, child, index);
        Ok(())
    }

    /// Insert `child` as the next sibling of `reference`.
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> Result<(), DomError> {
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        if reference == child {
            return Ok(());
        }
        self.check_insert(parent, child)?;
        self.remove(child);
        let index = self.index_in_parent(reference).map(|i| i + 1);
        self.attach(parent, child, index);
        Ok(())
    }

    /// Put `new` where `old` is and detach `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), DomError> {
        let parent = self.parent(old).ok_or(DomError::Detached(old))?;
        self.insert_before(parent, new, Some(old))?;
        self.remove(old);
        Ok(())
    }

    /// Move the children of `id` in front of it and detach `id`.
    pub fn unwrap(&mut self, id: NodeId) -> Result<(), DomError> {
        let parent = self.parent(id).ok_or(DomError::Detached(id))?;
        for child in self.children(id).to_vec() {
            self.insert_before(parent, child, Some(id))?;
        }
        self.remove(id);
        Ok(())
    }

    /// Append every child of `from` to `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) -> Result<(), DomError> {
        for child in self.children(from).to_vec() {
            self.append_child(to, child)?;
        }
        Ok(())
    }

    pub fn remove_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.remove(child);
        }
    }

    /// Detached copy of `id`, with its subtree when `deep`.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> NodeId {
        let copy = self.push(self.slots[id].data.clone());
        if deep {
            let mut stack = vec![(id, copy)];
            while let Some((source, target)) = stack.pop() {
                for child in self.children(source).to_vec() {
                    let child_copy = self.push(self.slots[child].data.clone());
                    self.attach(target, child_copy, None);
                    stack.push((child, child_copy));
                }
            }
        }
        copy
    }

    /// Split a text node at character `offset`. The original keeps the
    /// prefix; the returned node holds the rest and is inserted after it.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let text = self.text(id).ok_or(DomError::NotText(id))?;
        let at = byte_offset(text, offset).ok_or(DomError::OffsetOutOfRange {
            node: id,
            offset,
            len: text.chars().count(),
        })?;
        let (head, tail) = text.split_at(at);
        let (head, tail) = (head.to_string(), tail.to_string());
        self.set_text(id, head)?;
        let rest = self.create_text(tail);
        if self.parent(id).is_some() {
            self.insert_after(id, rest)?;
        }
        Ok(rest)
    }

    /// Split every ancestor of `node` up to and including `top` right after
    /// `node`. Following siblings move into shallow clones inserted after
    /// each ancestor; the clone of `top` is returned. Clones drop `id`.
    pub fn split_after(&mut self, node: NodeId, top: NodeId) -> Result<NodeId, DomError> {
        if !self.contains(top, node) || node == top {
            return Err(DomError::NotAChild {
                parent: top,
                reference: node,
            });
        }
        let mut current = node;
        loop {
            let parent = self.parent(current).ok_or(DomError::Detached(current))?;
            let clone = self.clone_node(parent, false);
            self.remove_attr(clone, "id");
            let index = self.index_in_parent(current).map_or(0, |i| i + 1);
            for sibling in self.children(parent)[index..].to_vec() {
                self.append_child(clone, sibling)?;
            }
            self.insert_after(parent, clone)?;
            if parent == top {
                return Ok(clone);
            }
            current = parent;
        }
    }

    /// Merge adjacent text nodes and drop empty ones under `id`.
    pub fn normalize(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(element) = stack.pop() {
            let mut previous_text: Option<NodeId> = None;
            for child in self.children(element).to_vec() {
                let text = match &self.slots[child].data {
                    NodeData::Text(text) => text.clone(),
                    NodeData::Element(_) => {
                        previous_text = None;
                        stack.push(child);
                        continue;
                    }
                    NodeData::Comment(_) => {
                        previous_text = None;
                        continue;
                    }
                };
                if text.is_empty() {
                    self.remove(child);
                    continue;
                }
                match previous_text {
                    Some(previous) => {
                        if let NodeData::Text(existing) = &mut self.slots[previous].data {
                            existing.push_str(&text);
                        }
                        self.remove(child);
                    }
                    None => previous_text = Some(child),
                }
            }
        }
    }

    /// Concatenated text of every text node under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .filter_map(|n| self.text(n))
            .collect()
    }
}

/// Byte index of character `offset` in `text`, `None` when out of range.
pub(crate) fn byte_offset(text: &str, offset: usize) -> Option<usize> {
    if offset == 0 {
        return Some(0);
    }
    match text.char_indices().nth(offset) {
        Some((i, _)) => Some(i),
        None if text.chars().count() == offset => Some(text.len()),
        None => None,
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}
