//! Undo and redo history.
//!
//! Every edit is recorded as a [`HistoryEvent`] holding a snapshot of the
//! edited subtree before and after, plus the caret on both sides as
//! [`Coordinates`]. The subtree is addressed by a child-index path from the
//! body so the event stays valid after the nodes it saw were replaced.
//!
//! An [`HistoryKind::And`] event glues its two neighbours together: undo and
//! redo treat the three as one step.

use crate::dom::{Document, Fragment, NodeId};
use crate::selection::{Coordinates, Selection};

pub const DEFAULT_HISTORY_LIMIT: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Input,
    Delete,
    Paste,
    InsertHtml,
    Wrap,
    /// A quoted block moved one citation level up
    Unquote,
    Smiley,
    MagicLink,
    /// A citation split by return
    Citation,
    /// Joins the previous and the next event
    And,
}

/// Which subtree an event snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Body,
    Node(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEvent {
    pub kind: HistoryKind,
    pub before: Coordinates,
    pub after: Coordinates,
    /// Child-index path from the body to the snapshotted subtree
    pub scope: Vec<usize>,
    pub content_before: Vec<Fragment>,
    pub content_after: Vec<Fragment>,
    pub sequence: u64,
}

impl HistoryEvent {
    fn and() -> Self {
        Self {
            kind: HistoryKind::And,
            before: Coordinates::default(),
            after: Coordinates::default(),
            scope: Vec::new(),
            content_before: Vec::new(),
            content_after: Vec::new(),
            sequence: 0,
        }
    }
}

/// An event between [`UndoRedoManager::begin_event`] and
/// [`UndoRedoManager::finish_event`].
#[derive(Debug, Clone)]
struct Recording {
    kind: HistoryKind,
    before: Coordinates,
    scope: Vec<usize>,
    content_before: Vec<Fragment>,
}

#[derive(Debug, Clone)]
pub struct UndoRedoManager {
    events: Vec<HistoryEvent>,
    /// Number of events currently applied
    position: usize,
    limit: usize,
    next_sequence: u64,
    recording: Option<Recording>,
    in_progress: bool,
}

impl Default for UndoRedoManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl UndoRedoManager {
    pub fn new(limit: usize) -> Self {
        Self {
            events: Vec::new(),
            position: 0,
            limit: limit.max(1),
            next_sequence: 1,
            recording: None,
            in_progress: false,
        }
    }

    /// Whether an undo or redo is being applied right now. Edits made while
    /// it is are not recorded.
    pub fn is_operation_in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub fn events(&self) -> &[HistoryEvent] {
        &self.events
    }

    /// The most recently applied event.
    pub fn current_event(&self) -> Option<&HistoryEvent> {
        self.position.checked_sub(1).and_then(|i| self.events.get(i))
    }

    /// Sequence number the open event will be recorded under, or that of
    /// the current event when none is open.
    pub fn upcoming_sequence(&self) -> Option<u64> {
        if self.recording.is_some() {
            Some(self.next_sequence)
        } else {
            self.current_event().map(|e| e.sequence)
        }
    }

    pub fn can_undo(&self) -> bool {
        self.position > 0
    }

    pub fn can_redo(&self) -> bool {
        self.position < self.events.len()
    }

    /// Append `event`, dropping the redo tail and the oldest events beyond
    /// the limit.
    pub fn insert_history_event(&mut self, mut event: HistoryEvent) {
        if self.in_progress {
            return;
        }
        self.events.truncate(self.position);
        event.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(event);

        while self.events.len() > self.limit {
            self.events.remove(0);
            // A leading And has nothing left to join
            while self.events.first().is_some_and(|e| e.kind == HistoryKind::And) {
                self.events.remove(0);
            }
        }
        self.position = self.events.len();
    }

    /// Join the next recorded event to the current one.
    pub fn insert_and(&mut self) {
        if self.current_event().is_some_and(|e| e.kind != HistoryKind::And) {
            self.insert_history_event(HistoryEvent::and());
        }
    }

    /// Start recording an edit of `scope`. An event still open is finished
    /// first.
    pub fn begin_event(
        &mut self,
        doc: &Document,
        selection: &Selection,
        kind: HistoryKind,
        scope: Scope,
    ) {
        if self.in_progress {
            return;
        }
        if self.recording.is_some() {
            self.finish_event(doc, selection);
        }
        let body = doc.body();
        let path = match scope {
            Scope::Body => Vec::new(),
            Scope::Node(node) => doc.path_from(body, node).unwrap_or_default(),
        };
        let root = doc.resolve_path(body, &path).unwrap_or(body);
        self.recording = Some(Recording {
            kind,
            before: selection.coordinates(doc).unwrap_or_default(),
            content_before: doc.children_to_fragments(root),
            scope: path,
        });
    }

    /// Close the open event. Edits that changed nothing are dropped.
    pub fn finish_event(&mut self, doc: &Document, selection: &Selection) {
        let Some(recording) = self.recording.take() else {
            return;
        };
        let Some(root) = doc.resolve_path(doc.body(), &recording.scope) else {
            log::warn!(
                "history scope {:?} vanished during {:?}, event dropped",
                recording.scope,
                recording.kind
            );
            return;
        };
        let content_after = doc.children_to_fragments(root);
        let after = selection.coordinates(doc).unwrap_or(recording.before);
        if content_after == recording.content_before && after == recording.before {
            return;
        }
        self.insert_history_event(HistoryEvent {
            kind: recording.kind,
            before: recording.before,
            after,
            scope: recording.scope,
            content_before: recording.content_before,
            content_after,
            sequence: 0,
        });
    }

    /// Revert the last applied step. Returns `false` when there is nothing
    /// to undo.
    pub fn undo(&mut self, doc: &mut Document, selection: &mut Selection) -> bool {
        if self.recording.is_some() {
            self.finish_event(doc, selection);
        }
        if !self.can_undo() {
            return false;
        }
        self.in_progress = true;
        self.position -= 1;
        self.revert(self.position, doc, selection);
        while self.position >= 2 && self.events[self.position - 1].kind == HistoryKind::And {
            self.position -= 2;
            self.revert(self.position, doc, selection);
        }
        self.in_progress = false;
        true
    }

    /// Re-apply the next undone step. Returns `false` when there is nothing
    /// to redo.
    pub fn redo(&mut self, doc: &mut Document, selection: &mut Selection) -> bool {
        if self.recording.is_some() {
            self.finish_event(doc, selection);
        }
        if !self.can_redo() {
            return false;
        }
        self.in_progress = true;
        self.reapply(self.position, doc, selection);
        self.position += 1;
        while self.position + 1 < self.events.len()
            && self.events[self.position].kind == HistoryKind::And
        {
            self.reapply(self.position + 1, doc, selection);
            self.position += 2;
        }
        self.in_progress = false;
        true
    }

    fn revert(&self, index: usize, doc: &mut Document, selection: &mut Selection) {
        let event = &self.events[index];
        apply_snapshot(doc, &event.scope, &event.content_before, event.kind);
        selection.set_coordinates(doc, event.before);
    }

    fn reapply(&self, index: usize, doc: &mut Document, selection: &mut Selection) {
        let event = &self.events[index];
        apply_snapshot(doc, &event.scope, &event.content_after, event.kind);
        selection.set_coordinates(doc, event.after);
    }

    /// Forget every event.
    pub fn clean_history(&mut self) {
        self.events.clear();
        self.position = 0;
        self.recording = None;
    }
}

fn apply_snapshot(doc: &mut Document, scope: &[usize], content: &[Fragment], kind: HistoryKind) {
    match doc.resolve_path(doc.body(), scope) {
        Some(root) => doc.replace_children_with(root, content),
        None => log::warn!("cannot find the subtree of a {kind:?} event, restoring caret only"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Position;
    use crate::tests::{body_html, document_from_body};
    use pretty_assertions::assert_eq;

    fn edit(
        manager: &mut UndoRedoManager,
        doc: &mut Document,
        selection: &mut Selection,
        kind: HistoryKind,
        text: &str,
    ) {
        manager.begin_event(doc, selection, kind, Scope::Body);
        let div = doc.children(doc.body())[0];
        let t = doc.children(div)[0];
        let len = doc.text_len(t);
        doc.insert_text(t, len, text).unwrap();
        selection.collapse(Position::new(t, len + text.chars().count()));
        manager.finish_event(doc, selection);
    }

    fn setup() -> (UndoRedoManager, Document, Selection) {
        let doc = document_from_body("<div>a</div>");
        let mut selection = Selection::default();
        let t = doc.children(doc.children(doc.body())[0])[0];
        selection.collapse(Position::new(t, 1));
        (UndoRedoManager::default(), doc, selection)
    }

    #[test]
    fn undo_then_redo_restores_both_states() {
        // Given three recorded edits
        let (mut manager, mut doc, mut selection) = setup();
        for text in ["b", "c", "d"] {
            edit(&mut manager, &mut doc, &mut selection, HistoryKind::Input, text);
        }
        assert_eq!(body_html(&doc), "<div>abcd</div>");

        // When undoing all of them
        for _ in 0..3 {
            assert!(manager.undo(&mut doc, &mut selection));
        }

        // Then the original tree and caret are back
        assert_eq!(body_html(&doc), "<div>a</div>");
        assert_eq!(selection.coordinates(&doc), Some(Coordinates::collapsed(1)));
        assert!(!manager.undo(&mut doc, &mut selection));

        // And redoing all of them reproduces the edited tree
        for _ in 0..3 {
            assert!(manager.redo(&mut doc, &mut selection));
        }
        assert_eq!(body_html(&doc), "<div>abcd</div>");
        assert_eq!(selection.coordinates(&doc), Some(Coordinates::collapsed(4)));
    }

    #[test]
    fn new_event_discards_redo_tail() {
        let (mut manager, mut doc, mut selection) = setup();
        edit(&mut manager, &mut doc, &mut selection, HistoryKind::Input, "b");
        edit(&mut manager, &mut doc, &mut selection, HistoryKind::Input, "c");
        manager.undo(&mut doc, &mut selection);

        edit(&mut manager, &mut doc, &mut selection, HistoryKind::Input, "x");

        assert!(!manager.can_redo());
        assert_eq!(manager.events().len(), 2);
        assert_eq!(body_html(&doc), "<div>abx</div>");
    }

    #[test]
    fn and_events_undo_as_one_step() {
        let (mut manager, mut doc, mut selection) = setup();
        edit(&mut manager, &mut doc, &mut selection, HistoryKind::Input, "b");
        manager.insert_and();
        edit(&mut manager, &mut doc, &mut selection, HistoryKind::Smiley, "c");

        assert!(manager.undo(&mut doc, &mut selection));
        assert_eq!(body_html(&doc), "<div>a</div>");

        assert!(manager.redo(&mut doc, &mut selection));
        assert_eq!(body_html(&doc), "<div>abc</div>");
        assert!(!manager.can_redo());
    }

    #[test]
    fn upcoming_sequence_names_the_event_being_recorded() {
        let (mut manager, mut doc, mut selection) = setup();
        assert_eq!(manager.upcoming_sequence(), None);

        manager.begin_event(&doc, &selection, HistoryKind::Input, Scope::Body);
        let upcoming = manager.upcoming_sequence();
        let t = doc.children(doc.children(doc.body())[0])[0];
        doc.insert_text(t, 1, "b").unwrap();
        selection.collapse(Position::new(t, 2));
        manager.finish_event(&doc, &selection);

        assert_eq!(upcoming, manager.current_event().map(|e| e.sequence));
        assert_eq!(manager.upcoming_sequence(), upcoming);
    }

    #[test]
    fn unchanged_events_are_dropped() {
        let (mut manager, doc, selection) = setup();

        manager.begin_event(&doc, &selection, HistoryKind::Input, Scope::Body);
        manager.finish_event(&doc, &selection);

        assert!(manager.events().is_empty());
    }

    #[test]
    fn limit_drops_oldest_events() {
        let (_, mut doc, mut selection) = setup();
        let mut manager = UndoRedoManager::new(2);
        for text in ["b", "c", "d"] {
            edit(&mut manager, &mut doc, &mut selection, HistoryKind::Input, text);
        }

        assert_eq!(manager.events().len(), 2);
        assert_eq!(manager.events()[0].sequence, 2);
        manager.undo(&mut doc, &mut selection);
        manager.undo(&mut doc, &mut selection);
        assert_eq!(body_html(&doc), "<div>ab</div>");
    }

    #[test]
    fn node_scope_snapshots_only_that_subtree() {
        let mut doc = document_from_body("<div>a</div><div>b</div>");
        let mut selection = Selection::default();
        let mut manager = UndoRedoManager::default();
        let second = doc.children(doc.body())[1];
        let t = doc.children(second)[0];
        selection.collapse(Position::new(t, 1));

        manager.begin_event(&doc, &selection, HistoryKind::Input, Scope::Node(second));
        doc.insert_text(t, 1, "!").unwrap();
        manager.finish_event(&doc, &selection);

        let event = manager.current_event().unwrap();
        assert_eq!(event.scope, vec![1]);
        assert_eq!(event.content_before, vec![Fragment::Text("b".to_string())]);
        manager.undo(&mut doc, &mut selection);
        assert_eq!(body_html(&doc), "<div>a</div><div>b</div>");
    }

    #[test]
    fn clean_history_forgets_everything() {
        let (mut manager, mut doc, mut selection) = setup();
        edit(&mut manager, &mut doc, &mut selection, HistoryKind::Input, "b");

        manager.clean_history();

        assert!(!manager.can_undo());
        assert_eq!(manager.current_event(), None);
    }
}
