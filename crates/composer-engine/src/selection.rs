//! Caret and range state, and the marker nodes that carry it across edits.
//!
//! Tree edits invalidate raw `(node, offset)` positions. Before mutating, the
//! editing layers call [`save_markers`], which parks two empty marker spans
//! at the range boundaries; after mutating, [`restore_markers`] turns them
//! back into a range. Undo history uses a third representation,
//! [`Coordinates`], which survives the subtree being rebuilt from scratch.

use std::cmp::Ordering;

use crate::dom::classify::{
    NodeClass, SELECTION_END_MARKER, SELECTION_START_MARKER, classify,
};
use crate::dom::{Document, NodeId};
use crate::error::DomError;

/// A boundary point: a character offset inside a text node, or a child index
/// inside an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub node: NodeId,
    pub offset: usize,
}

impl Position {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A normalized range, `start` never after `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Build a range from an anchor and a focus in either order.
    pub fn new(doc: &Document, anchor: Position, focus: Position) -> Self {
        if compare_positions(doc, anchor, focus) == Ordering::Greater {
            Self {
                start: focus,
                end: anchor,
            }
        } else {
            Self {
                start: anchor,
                end: focus,
            }
        }
    }

    pub fn collapsed(at: Position) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Caret state as linear offsets into the body's visible content.
///
/// Every visible character counts one, as do `<br>` and the end of every
/// block. Quote decorations, markers, images and comments count nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Coordinates {
    pub start: usize,
    pub end: usize,
}

impl Coordinates {
    pub fn collapsed(at: usize) -> Self {
        Self { start: at, end: at }
    }
}

/// The live selection of the editing host.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    range: Option<Range>,
    blocked: u32,
    notifications: u64,
}

impl Selection {
    pub fn range(&self) -> Option<Range> {
        self.range
    }

    pub fn is_collapsed(&self) -> bool {
        self.range.is_none_or(|r| r.is_collapsed())
    }

    pub fn set_range(&mut self, range: Range) {
        self.range = Some(range);
        self.notify();
    }

    pub fn select(&mut self, doc: &Document, anchor: Position, focus: Position) {
        self.set_range(Range::new(doc, anchor, focus));
    }

    pub fn collapse(&mut self, at: Position) {
        self.set_range(Range::collapsed(at));
    }

    pub fn clear(&mut self) {
        self.range = None;
        self.notify();
    }

    /// Suppress selection-changed notifications until the matching
    /// [`Selection::unblock_notifications`].
    pub fn block_notifications(&mut self) {
        self.blocked += 1;
    }

    pub fn unblock_notifications(&mut self) {
        self.blocked = self.blocked.saturating_sub(1);
    }

    pub fn notifications_blocked(&self) -> bool {
        self.blocked > 0
    }

    /// Number of selection-changed notifications delivered so far.
    pub fn notification_count(&self) -> u64 {
        self.notifications
    }

    fn notify(&mut self) {
        if self.blocked == 0 {
            self.notifications += 1;
        }
    }

    /// Current selection as linear coordinates within the body.
    pub fn coordinates(&self, doc: &Document) -> Option<Coordinates> {
        let range = self.range?;
        let body = doc.body();
        Some(Coordinates {
            start: offset_of(doc, body, range.start),
            end: offset_of(doc, body, range.end),
        })
    }

    /// Resolve linear coordinates back into a live range.
    pub fn set_coordinates(&mut self, doc: &Document, coordinates: Coordinates) {
        let body = doc.body();
        let start = position_at(doc, body, coordinates.start);
        let end = if coordinates.end == coordinates.start {
            start
        } else {
            position_at(doc, body, coordinates.end)
        };
        self.set_range(Range { start, end });
    }
}

/// Order two boundary points in document order.
pub fn compare_positions(doc: &Document, a: Position, b: Position) -> Ordering {
    if a.node == b.node {
        return a.offset.cmp(&b.offset);
    }
    if doc.contains(a.node, b.node) {
        return match child_index_towards(doc, a.node, b.node) {
            Some(index) if index < a.offset => Ordering::Greater,
            _ => Ordering::Less,
        };
    }
    if doc.contains(b.node, a.node) {
        return compare_positions(doc, b, a).reverse();
    }
    doc.tree_order(a.node, b.node)
}

fn child_index_towards(doc: &Document, ancestor: NodeId, node: NodeId) -> Option<usize> {
    let mut current = node;
    loop {
        let parent = doc.parent(current)?;
        if parent == ancestor {
            return doc.index_in_parent(current);
        }
        current = parent;
    }
}

// ---- markers -----------------------------------------------------------

fn create_marker(doc: &mut Document, id: &str) -> NodeId {
    doc.create_element_with("span", &[("id", id)])
}

/// The start and end markers, when both are present.
pub fn markers(doc: &Document) -> Option<(NodeId, NodeId)> {
    Some((
        doc.get_element_by_id(SELECTION_START_MARKER)?,
        doc.get_element_by_id(SELECTION_END_MARKER)?,
    ))
}

pub fn remove_selection_markers(doc: &mut Document) {
    for id in [SELECTION_START_MARKER, SELECTION_END_MARKER] {
        while let Some(marker) = doc.get_element_by_id(id) {
            doc.remove(marker);
        }
    }
}

/// Put a collapsed pair of markers at the start of `element`.
pub fn add_selection_markers_into_element_start(
    doc: &mut Document,
    element: NodeId,
) -> Result<(NodeId, NodeId), DomError> {
    remove_selection_markers(doc);
    let start = create_marker(doc, SELECTION_START_MARKER);
    let end = create_marker(doc, SELECTION_END_MARKER);
    doc.prepend_child(element, end)?;
    doc.prepend_child(element, start)?;
    Ok((start, end))
}

/// Put a collapsed pair of markers at the end of `element`.
pub fn add_selection_markers_into_element_end(
    doc: &mut Document,
    element: NodeId,
) -> Result<(NodeId, NodeId), DomError> {
    remove_selection_markers(doc);
    let start = create_marker(doc, SELECTION_START_MARKER);
    let end = create_marker(doc, SELECTION_END_MARKER);
    // Keep a trailing placeholder <br> last
    let reference = doc
        .last_child(element)
        .filter(|last| classify(doc, *last) == NodeClass::HardBreak);
    doc.insert_before(element, start, reference)?;
    doc.insert_before(element, end, reference)?;
    Ok((start, end))
}

fn insert_at(doc: &mut Document, at: Position, node: NodeId) -> Result<(), DomError> {
    if doc.text(at.node).is_some() {
        let parent = doc.parent(at.node).ok_or(DomError::Detached(at.node))?;
        let len = doc.text_len(at.node);
        if at.offset == 0 {
            doc.insert_before(parent, node, Some(at.node))
        } else if at.offset >= len {
            doc.insert_after(at.node, node)
        } else {
            doc.split_text(at.node, at.offset)?;
            doc.insert_after(at.node, node)
        }
    } else if doc
        .tag_name(at.node)
        .is_some_and(composer_syntax::is_void_element)
    {
        let parent = doc.parent(at.node).ok_or(DomError::Detached(at.node))?;
        doc.insert_before(parent, node, Some(at.node))
    } else {
        let reference = doc.children(at.node).get(at.offset).copied();
        doc.insert_before(at.node, node, reference)
    }
}

fn position_before(doc: &Document, node: NodeId) -> Option<Position> {
    Some(Position::new(doc.parent(node)?, doc.index_in_parent(node)?))
}

/// Park the current range in marker nodes. Existing markers are replaced.
/// Returns `false` when there is no range to save.
pub fn save_markers(doc: &mut Document, selection: &mut Selection) -> bool {
    remove_selection_markers(doc);
    let Some(range) = selection.range() else {
        log::debug!("no selection to save");
        return false;
    };

    selection.block_notifications();
    let start = create_marker(doc, SELECTION_START_MARKER);
    let end = create_marker(doc, SELECTION_END_MARKER);
    let result = if range.is_collapsed() {
        insert_at(doc, range.start, start).and_then(|_| doc.insert_after(start, end))
    } else {
        // End first: it never shifts the start boundary
        insert_at(doc, range.end, end).and_then(|_| insert_at(doc, range.start, start))
    };

    let saved = match result {
        Ok(()) => {
            if let (Some(s), Some(e)) = (position_before(doc, start), position_before(doc, end)) {
                selection.range = Some(Range { start: s, end: e });
            }
            true
        }
        Err(err) => {
            log::warn!("failed to save selection: {err}");
            remove_selection_markers(doc);
            false
        }
    };
    selection.unblock_notifications();
    saved
}

/// Remove `marker` and return the equivalent position, joining the text
/// nodes a save split apart.
fn take_marker(doc: &mut Document, marker: NodeId) -> Option<Position> {
    let parent = doc.parent(marker)?;
    let index = doc.index_in_parent(marker)?;
    doc.remove(marker);

    let children = doc.children(parent);
    let previous = index.checked_sub(1).and_then(|i| children.get(i).copied());
    let next = children.get(index).copied();
    let previous_text = previous.filter(|n| doc.is_text(*n));
    let next_text = next.filter(|n| doc.is_text(*n));

    Some(match (previous_text, next_text) {
        (Some(previous), Some(next)) => {
            let offset = doc.text_len(previous);
            let tail = doc.text(next).unwrap_or_default().to_string();
            let joined = format!("{}{}", doc.text(previous).unwrap_or_default(), tail);
            if doc.set_text(previous, joined).is_ok() {
                doc.remove(next);
            }
            Position::new(previous, offset)
        }
        (Some(previous), None) => Position::new(previous, doc.text_len(previous)),
        (None, Some(next)) => Position::new(next, 0),
        (None, None) => Position::new(parent, index),
    })
}

/// Caret position used when the markers went missing.
pub fn default_caret(doc: &Document) -> Position {
    let body = doc.body();
    match doc.first_child(body) {
        Some(first) => Position::new(first, 0),
        None => Position::new(body, 0),
    }
}

/// Turn the markers back into the live range and remove them. Returns
/// `false` when a marker was missing and the caret fell back to the start
/// of the body's first child.
pub fn restore_markers(doc: &mut Document, selection: &mut Selection) -> bool {
    selection.block_notifications();
    let restored = match markers(doc) {
        Some((start, end)) => {
            let collapsed = doc.next_sibling(start) == Some(end);
            if collapsed {
                doc.remove(end);
                take_marker(doc, start).map(Range::collapsed)
            } else {
                let start = take_marker(doc, start);
                let end = take_marker(doc, end);
                match (start, end) {
                    (Some(start), Some(end)) => Some(Range { start, end }),
                    _ => None,
                }
            }
        }
        None => None,
    };
    selection.unblock_notifications();

    match restored {
        Some(range) => {
            selection.set_range(range);
            true
        }
        None => {
            log::debug!("selection markers missing, moving caret to document start");
            remove_selection_markers(doc);
            selection.collapse(default_caret(doc));
            false
        }
    }
}

// ---- linear coordinates --------------------------------------------------

fn is_hidden(doc: &Document, node: NodeId) -> bool {
    matches!(
        classify(doc, node),
        NodeClass::QuoteDecoration
            | NodeClass::SelectionMarker(_)
            | NodeClass::Skipped
            | NodeClass::Comment
            | NodeClass::Image
    )
}

enum Walk {
    Enter(NodeId),
    Leave(NodeId),
}

fn walk(doc: &Document, root: NodeId) -> Vec<Walk> {
    let mut events = Vec::new();
    let mut stack: Vec<Walk> = doc.children(root).iter().rev().map(|c| Walk::Enter(*c)).collect();
    while let Some(step) = stack.pop() {
        if let Walk::Enter(node) = step {
            events.push(Walk::Enter(node));
            stack.push(Walk::Leave(node));
            if doc.is_element(node) && !is_hidden(doc, node) {
                stack.extend(doc.children(node).iter().rev().map(|c| Walk::Enter(*c)));
            }
        } else {
            events.push(step);
        }
    }
    events
}

/// Move a position that sits inside hidden content to just after it.
fn lift_out_of_hidden(doc: &Document, root: NodeId, at: Position) -> Position {
    let outermost = std::iter::once(at.node)
        .chain(doc.ancestors(at.node))
        .take_while(|n| *n != root)
        .filter(|n| is_hidden(doc, *n))
        .last();
    match outermost.and_then(|h| position_before(doc, h)) {
        Some(before) => Position::new(before.node, before.offset + 1),
        None => at,
    }
}

/// Linear offset of `at` within `root`.
pub fn offset_of(doc: &Document, root: NodeId, at: Position) -> usize {
    let at = lift_out_of_hidden(doc, root, at);
    let at_text = doc.is_text(at.node);
    let mut count = 0usize;

    for event in walk(doc, root) {
        match event {
            Walk::Enter(node) => {
                if !at_text
                    && doc.parent(node) == Some(at.node)
                    && doc.index_in_parent(node) == Some(at.offset)
                {
                    return count;
                }
                if node == at.node && at_text {
                    return count + at.offset.min(doc.text_len(node));
                }
                if is_hidden(doc, node) {
                    continue;
                }
                match classify(doc, node) {
                    NodeClass::Text => count += doc.text_len(node),
                    class if class.is_break() => count += 1,
                    _ => {}
                }
            }
            Walk::Leave(node) => {
                if node == at.node {
                    return count;
                }
                if classify(doc, node).is_block() {
                    count += 1;
                }
            }
        }
    }
    count
}

/// Position at linear `offset` within `root`, clamped to the end.
pub fn position_at(doc: &Document, root: NodeId, offset: usize) -> Position {
    let mut count = 0usize;

    for event in walk(doc, root) {
        match event {
            Walk::Enter(node) => {
                if is_hidden(doc, node) {
                    continue;
                }
                match classify(doc, node) {
                    NodeClass::Text => {
                        let len = doc.text_len(node);
                        if offset <= count + len {
                            return Position::new(node, offset - count);
                        }
                        count += len;
                    }
                    class if class.is_break() => {
                        if offset == count
                            && let Some(before) = position_before(doc, node)
                        {
                            return before;
                        }
                        count += 1;
                    }
                    class if class.is_block() && doc.children(node).is_empty() => {
                        if offset == count {
                            return Position::new(node, 0);
                        }
                    }
                    _ => {}
                }
            }
            Walk::Leave(node) => {
                if classify(doc, node).is_block() && !is_hidden(doc, node) {
                    if offset == count {
                        return Position::new(node, doc.children(node).len());
                    }
                    count += 1;
                }
            }
        }
    }
    Position::new(root, doc.children(root).len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paragraph_doc(html: &str) -> Document {
        let mut doc = Document::new();
        let body = doc.body();
        doc.set_inner_html(body, html);
        doc
    }

    fn first_text(doc: &Document) -> NodeId {
        doc.descendants(doc.body())
            .find(|n| doc.is_text(*n))
            .unwrap()
    }

    #[test]
    fn range_new_normalizes_order() {
        let doc = paragraph_doc("<div>hello</div>");
        let t = first_text(&doc);

        let range = Range::new(&doc, Position::new(t, 4), Position::new(t, 1));

        assert_eq!(range.start.offset, 1);
        assert_eq!(range.end.offset, 4);
    }

    #[test]
    fn compare_element_and_text_positions() {
        let doc = paragraph_doc("<div>ab</div><div>cd</div>");
        let body = doc.body();
        let t = first_text(&doc);

        assert_eq!(
            compare_positions(&doc, Position::new(body, 0), Position::new(t, 1)),
            Ordering::Less
        );
        assert_eq!(
            compare_positions(&doc, Position::new(body, 1), Position::new(t, 1)),
            Ordering::Greater
        );
    }

    #[test]
    fn save_splits_text_and_restore_joins_it() {
        // Given a caret in the middle of a word
        let mut doc = paragraph_doc("<div>hello world</div>");
        let t = first_text(&doc);
        let mut selection = Selection::default();
        selection.collapse(Position::new(t, 3));

        // When saving
        assert!(save_markers(&mut doc, &mut selection));

        // Then the text is split around the markers
        assert_eq!(
            doc.inner_html(doc.body()),
            "<div>hel<span id=\"-x-evo-selection-start-marker\"></span><span id=\"-x-evo-selection-end-marker\"></span>lo world</div>"
        );

        // And restoring gives back the same text node and offset
        assert!(restore_markers(&mut doc, &mut selection));
        assert_eq!(doc.inner_html(doc.body()), "<div>hello world</div>");
        assert_eq!(selection.range(), Some(Range::collapsed(Position::new(t, 3))));
    }

    #[test]
    fn save_restore_round_trips_a_range() {
        let mut doc = paragraph_doc("<div>hello world</div>");
        let t = first_text(&doc);
        let mut selection = Selection::default();
        selection.select(&doc, Position::new(t, 2), Position::new(t, 8));

        save_markers(&mut doc, &mut selection);
        restore_markers(&mut doc, &mut selection);

        assert_eq!(doc.inner_html(doc.body()), "<div>hello world</div>");
        let range = selection.range().unwrap();
        assert_eq!(range.start, Position::new(t, 2));
        assert_eq!(range.end, Position::new(t, 8));
    }

    #[test]
    fn save_is_idempotent() {
        let mut doc = paragraph_doc("<div>abc</div>");
        let t = first_text(&doc);
        let mut selection = Selection::default();
        selection.collapse(Position::new(t, 1));

        save_markers(&mut doc, &mut selection);
        save_markers(&mut doc, &mut selection);

        assert_eq!(doc.elements_by_tag(doc.body(), "span").len(), 2);
    }

    #[test]
    fn missing_marker_falls_back_to_first_child() {
        let mut doc = paragraph_doc("<div>first</div><div>second</div>");
        let mut selection = Selection::default();

        let restored = restore_markers(&mut doc, &mut selection);

        assert!(!restored);
        let first = doc.first_child(doc.body()).unwrap();
        assert_eq!(selection.range(), Some(Range::collapsed(Position::new(first, 0))));
    }

    #[test]
    fn notifications_are_suppressed_while_markers_move() {
        let mut doc = paragraph_doc("<div>abc</div>");
        let t = first_text(&doc);
        let mut selection = Selection::default();
        selection.collapse(Position::new(t, 1));
        let before = selection.notification_count();

        save_markers(&mut doc, &mut selection);
        restore_markers(&mut doc, &mut selection);

        // Only the final restore is announced
        assert_eq!(selection.notification_count(), before + 1);
        assert!(!selection.notifications_blocked());
    }

    #[test]
    fn coordinates_skip_quote_decorations() {
        let doc = paragraph_doc(
            r#"<div>ab</div><blockquote type="cite"><div><span class="-x-evo-quoted"><span class="-x-evo-quote-character">&gt; </span></span>cd</div></blockquote>"#,
        );
        let texts: Vec<_> = doc.descendants(doc.body()).filter(|n| doc.is_text(*n)).collect();
        let cd = *texts.last().unwrap();

        // "ab" + end of first div
        assert_eq!(offset_of(&doc, doc.body(), Position::new(cd, 1)), 4);
        assert_eq!(position_at(&doc, doc.body(), 4), Position::new(cd, 1));
    }

    #[test]
    fn coordinates_round_trip_through_rebuilt_tree() {
        let html = "<div>one<br>two</div><div><br></div><div>three</div>";
        let doc = paragraph_doc(html);
        let rebuilt = paragraph_doc(html);

        for offset in 0..14 {
            let at = position_at(&doc, doc.body(), offset);
            let same = position_at(&rebuilt, rebuilt.body(), offset);
            assert_eq!(offset_of(&doc, doc.body(), at), offset);
            assert_eq!(offset_of(&rebuilt, rebuilt.body(), same), offset);
        }
    }

    #[test]
    fn empty_paragraph_resolves_before_placeholder_br() {
        let doc = paragraph_doc("<div>ab</div><div><br></div>");
        let second = doc.children(doc.body())[1];

        assert_eq!(position_at(&doc, doc.body(), 3), Position::new(second, 0));
    }
}
