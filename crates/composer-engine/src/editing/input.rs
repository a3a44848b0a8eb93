//! Keystroke-level edits.
//!
//! Each public handler records one history event. The automatic follow-ups
//! of an edit (magic links, smileys, re-wrapping in plain-text mode) join
//! that event, so one undo reverts the keystroke together with them.

use std::cmp::Ordering;

use crate::citation::{
    change_quoted_block_to_normal, has_visible_content, insert_new_line_into_citation,
};
use crate::dom::classify::{NodeClass, classify, is_citation, parent_block};
use crate::dom::{Document, NodeId};
use crate::editing::ComposerSession;
use crate::error::DomError;
use crate::magic::check_magic_links;
use crate::selection::{Position, default_caret, markers, restore_markers, save_markers};
use crate::smiley::check_magic_smileys;
use crate::undo::{HistoryKind, Scope};
use crate::wrap::{create_paragraph, rewrap_quoted_paragraph, wrap_paragraphs_in_document};

const ZWSP: char = '\u{200b}';

fn caret(session: &ComposerSession) -> Option<Position> {
    session.selection.range().map(|r| r.start)
}

fn position_before(doc: &Document, node: NodeId) -> Option<Position> {
    Some(Position::new(doc.parent(node)?, doc.index_in_parent(node)?))
}

/// The child of the body holding `node`.
fn top_level_child(doc: &Document, node: NodeId) -> Option<NodeId> {
    let body = doc.body();
    std::iter::once(node)
        .chain(doc.ancestors(node))
        .find(|n| doc.parent(*n) == Some(body))
}

/// Smallest subtree an edit at a collapsed caret can touch.
fn history_scope(session: &ComposerSession) -> Scope {
    let doc = &session.doc;
    match session.selection.range() {
        Some(range) if range.is_collapsed() => top_level_child(doc, range.start.node)
            .filter(|n| doc.is_element(*n))
            .map_or(Scope::Body, Scope::Node),
        _ => Scope::Body,
    }
}

fn ensure_caret(session: &mut ComposerSession) {
    if session.selection.range().is_none() {
        let caret = default_caret(&session.doc);
        session.selection.collapse(caret);
    }
}

/// Give an empty block a `<br>` so it keeps its line.
fn ensure_placeholder(doc: &mut Document, block: NodeId) {
    let has_break = doc
        .descendants(block)
        .any(|n| classify(doc, n) == NodeClass::HardBreak);
    if !has_visible_content(doc, block) && !has_break {
        let br = doc.create_element("br");
        if let Err(err) = doc.append_child(block, br) {
            log::warn!("failed to add placeholder break: {err}");
        }
    }
}

/// Drop the `<br>` that only held an empty block open once the block has
/// content.
fn remove_placeholder_break(doc: &mut Document, block: NodeId) {
    let Some(last) = doc.last_child(block) else {
        return;
    };
    if classify(doc, last) != NodeClass::HardBreak {
        return;
    }
    let after_content = doc
        .previous_sibling(last)
        .is_some_and(|p| !classify(doc, p).is_break());
    if after_content && has_visible_content(doc, block) {
        doc.remove(last);
    }
}

fn insert_at_caret(session: &mut ComposerSession, text: &str) -> Result<(), DomError> {
    let Some(at) = caret(session) else {
        return Ok(());
    };
    let count = text.chars().count();
    let doc = &mut session.doc;

    if doc.is_text(at.node) {
        doc.insert_text(at.node, at.offset, text)?;
        session
            .selection
            .collapse(Position::new(at.node, at.offset + count));
        return Ok(());
    }

    let body = doc.body();
    let (container, index) = if at.node == body {
        // Text never sits directly in the body
        let paragraph = create_paragraph(doc, &session.settings, 0);
        let reference = doc.children(body).get(at.offset).copied();
        doc.insert_before(body, paragraph, reference)?;
        (paragraph, 0)
    } else {
        (at.node, at.offset)
    };

    let children = doc.children(container);
    let before = index
        .checked_sub(1)
        .and_then(|i| children.get(i))
        .copied()
        .filter(|n| doc.is_text(*n));
    let reference = children.get(index).copied();
    let after = reference.filter(|n| doc.is_text(*n));

    let caret = if let Some(before) = before {
        let len = doc.text_len(before);
        doc.insert_text(before, len, text)?;
        Position::new(before, len + count)
    } else if let Some(after) = after {
        doc.insert_text(after, 0, text)?;
        Position::new(after, count)
    } else {
        let node = doc.create_text(text);
        doc.insert_before(container, node, reference)?;
        Position::new(node, count)
    };
    remove_placeholder_break(doc, container);
    session.selection.collapse(caret);
    Ok(())
}

/// Re-wrap the paragraph holding the caret, keeping the caret in place.
fn rewrap_caret_paragraph(session: &mut ComposerSession) {
    let Some(at) = caret(session) else {
        return;
    };
    let Some(paragraph) = parent_block(&session.doc, at.node)
        .filter(|b| classify(&session.doc, *b) == NodeClass::Paragraph)
    else {
        return;
    };
    let wrap_length = session.settings.word_wrap_length;
    save_markers(&mut session.doc, &mut session.selection);
    rewrap_quoted_paragraph(&mut session.doc, paragraph, wrap_length);
    restore_markers(&mut session.doc, &mut session.selection);
}

fn after_input(session: &mut ComposerSession, text: &str) {
    if session.flags.composition_in_progress {
        return;
    }
    if text.ends_with(char::is_whitespace) {
        check_magic_links(session, true);
    } else {
        check_magic_links(session, false);
        check_magic_smileys(session);
    }
    if !session.settings.html_mode {
        rewrap_caret_paragraph(session);
    }
}

/// Type `text` at the caret, replacing the selection. Text containing line
/// breaks is pasted instead.
pub fn insert_text(session: &mut ComposerSession, text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    if text.contains('\n') {
        return paste(session, text);
    }
    ensure_caret(session);
    let scope = history_scope(session);
    session.flags.space_pressed = text.ends_with(' ');
    session.with_history(HistoryKind::Input, scope, |s| {
        if !s.selection.is_collapsed() {
            delete_selection(s);
        }
        if let Err(err) = insert_at_caret(s, text) {
            log::warn!("failed to insert text: {err}");
            return;
        }
        after_input(s, text);
    });
    session.flags.space_pressed = false;
    true
}

/// An input method started composing text.
pub fn start_composition(session: &mut ComposerSession) -> bool {
    session.flags.composition_in_progress = true;
    true
}

/// The input method committed its text: run the follow-ups typing skipped
/// while it was composing.
pub fn end_composition(session: &mut ComposerSession) -> bool {
    if !session.flags.composition_in_progress {
        return false;
    }
    session.flags.composition_in_progress = false;
    ensure_caret(session);
    let scope = history_scope(session);
    session.with_history(HistoryKind::Input, scope, |s| after_input(s, ""));
    true
}

// ---- deleting -------------------------------------------------------------

/// Nodes strictly between the markers, outermost only.
fn nodes_between(doc: &Document, start: NodeId, end: NodeId) -> Vec<NodeId> {
    let inside: Vec<NodeId> = doc
        .descendants(doc.body())
        .filter(|n| {
            doc.tree_order(start, *n) == Ordering::Less
                && doc.tree_order(*n, end) == Ordering::Less
                && !doc.contains(*n, start)
                && !doc.contains(*n, end)
        })
        .collect();
    inside
        .iter()
        .copied()
        .filter(|n| doc.parent(*n).is_none_or(|p| !inside.contains(&p)))
        .collect()
}

/// Move the content of `from` to the end of `into` and drop `from`, along
/// with any ancestors it leaves empty.
fn merge_blocks(doc: &mut Document, into: NodeId, from: NodeId) -> Result<(), DomError> {
    if has_visible_content(doc, from) {
        if let Some(last) = doc.last_child(into)
            && classify(doc, last) == NodeClass::HardBreak
        {
            doc.remove(last);
        }
        doc.move_children(from, into)?;
    }
    let body = doc.body();
    let mut parent = doc.parent(from);
    doc.remove(from);
    while let Some(p) = parent {
        if p == body || !doc.children(p).is_empty() || doc.contains(p, into) {
            break;
        }
        parent = doc.parent(p);
        doc.remove(p);
    }
    Ok(())
}

/// Remove the selected content and collapse the caret where it started.
/// Blocks the selection spanned are merged.
fn delete_selection(session: &mut ComposerSession) {
    if !save_markers(&mut session.doc, &mut session.selection) {
        return;
    }
    let doc = &mut session.doc;
    let Some((start, end)) = markers(doc) else {
        return;
    };
    for node in nodes_between(doc, start, end) {
        doc.remove(node);
    }

    let start_block = parent_block(doc, start);
    let end_block = parent_block(doc, end);
    if let Err(err) = doc.insert_after(start, end) {
        log::warn!("failed to collapse selection: {err}");
    }
    if let (Some(into), Some(from)) = (start_block, end_block)
        && into != from
        && !doc.contains(from, into)
        && !doc.contains(into, from)
        && let Err(err) = merge_blocks(doc, into, from)
    {
        log::warn!("failed to merge blocks: {err}");
    }
    if let Some(block) = start_block {
        ensure_placeholder(doc, block);
    }
    restore_markers(&mut session.doc, &mut session.selection);
}

/// Last node of `node`'s inline subtree.
fn descend_last(doc: &Document, mut node: NodeId) -> NodeId {
    while matches!(
        classify(doc, node),
        NodeClass::InlineFormatting | NodeClass::Anchor
    ) {
        match doc.last_child(node) {
            Some(last) => node = last,
            None => break,
        }
    }
    node
}

/// The node before `node` inside `block`, in reverse document order.
fn step_back(doc: &Document, mut node: NodeId, block: NodeId) -> Option<NodeId> {
    loop {
        if let Some(previous) = doc.previous_sibling(node) {
            return Some(descend_last(doc, previous));
        }
        let parent = doc.parent(node)?;
        if parent == block {
            return None;
        }
        node = parent;
    }
}

fn node_before(doc: &Document, at: Position, block: NodeId) -> Option<NodeId> {
    if doc.is_text(at.node) {
        return step_back(doc, at.node, block);
    }
    match at.offset.checked_sub(1) {
        Some(i) => doc.children(at.node).get(i).map(|n| descend_last(doc, *n)),
        None if at.node == block => None,
        None => step_back(doc, at.node, block),
    }
}

enum Backspace {
    Deleted(Position),
    Continue(NodeId),
    BlockStart,
    Stop,
}

fn delete_node_before(doc: &mut Document, node: NodeId, block: NodeId) -> Backspace {
    match classify(doc, node) {
        NodeClass::Text => {
            let content = doc.text(node).unwrap_or_default();
            let len = content.chars().count();
            let Some(last) = content.chars().last() else {
                return step_back(doc, node, block).map_or(Backspace::BlockStart, Backspace::Continue);
            };
            if let Err(err) = doc.delete_text(node, len - 1, 1) {
                log::warn!("failed to delete character: {err}");
                return Backspace::Stop;
            }
            let caret = if len == 1 {
                let before = position_before(doc, node);
                doc.remove(node);
                before
            } else {
                Some(Position::new(node, len - 1))
            };
            match caret {
                // A smiley's trailing zero-width space goes together with it
                Some(caret) if last == ZWSP => match node_before(doc, caret, block) {
                    Some(previous) if classify(doc, previous) == NodeClass::Smiley => {
                        Backspace::Continue(previous)
                    }
                    _ => Backspace::Deleted(caret),
                },
                Some(caret) => Backspace::Deleted(caret),
                None => Backspace::Stop,
            }
        }
        NodeClass::HardBreak | NodeClass::Smiley | NodeClass::Image => {
            match position_before(doc, node) {
                Some(caret) => {
                    doc.remove(node);
                    Backspace::Deleted(caret)
                }
                None => Backspace::Stop,
            }
        }
        NodeClass::WrapBreak
        | NodeClass::QuoteDecoration
        | NodeClass::SelectionMarker(_)
        | NodeClass::Comment
        | NodeClass::InlineFormatting
        | NodeClass::Anchor => {
            step_back(doc, node, block).map_or(Backspace::BlockStart, Backspace::Continue)
        }
        _ => Backspace::Stop,
    }
}

/// Join `block` to the end of the block before it.
fn merge_with_previous_block(session: &mut ComposerSession, block: NodeId) -> bool {
    let doc = &mut session.doc;
    let Some(previous) = doc.previous_sibling(block) else {
        return false;
    };
    if !matches!(
        classify(doc, previous),
        NodeClass::Paragraph | NodeClass::Block
    ) {
        return false;
    }
    if let Some(last) = doc.last_child(previous)
        && classify(doc, last) == NodeClass::HardBreak
        && has_visible_content(doc, previous)
    {
        doc.remove(last);
    }
    let caret = Position::new(previous, doc.children(previous).len());
    if let Err(err) = merge_blocks(doc, previous, block) {
        log::warn!("failed to merge blocks: {err}");
        return false;
    }
    ensure_placeholder(doc, previous);
    session.selection.collapse(caret);
    true
}

fn delete_before_caret(session: &mut ComposerSession) -> bool {
    let Some(at) = caret(session) else {
        return false;
    };
    let Some(block) = parent_block(&session.doc, at.node) else {
        return false;
    };

    let mut current = node_before(&session.doc, at, block);
    while let Some(node) = current {
        match delete_node_before(&mut session.doc, node, block) {
            Backspace::Deleted(caret) => {
                ensure_placeholder(&mut session.doc, block);
                session.selection.collapse(caret);
                return true;
            }
            Backspace::Continue(next) => current = Some(next),
            Backspace::BlockStart => current = None,
            Backspace::Stop => return false,
        }
    }
    merge_with_previous_block(session, block)
}

/// Backspace: delete the selection, or the character before the caret. At
/// the start of a quoted block the block moves one citation level up; at the
/// start of any other block it joins the block before it.
pub fn delete_backward(session: &mut ComposerSession) -> bool {
    let Some(range) = session.selection.range() else {
        return false;
    };
    let html_mode = session.settings.html_mode;
    if !range.is_collapsed() {
        session.with_history(HistoryKind::Delete, Scope::Body, |s| {
            delete_selection(s);
            if !html_mode {
                rewrap_caret_paragraph(s);
            }
        });
        return true;
    }
    if change_quoted_block_to_normal(session) {
        return true;
    }
    session.with_history(HistoryKind::Delete, Scope::Body, |s| {
        let deleted = delete_before_caret(s);
        if deleted && !html_mode {
            rewrap_caret_paragraph(s);
        }
        deleted
    })
}

// ---- new lines --------------------------------------------------------------

/// Split the block holding the caret in two, the caret starting the second
/// half. A caret outside any block gets a new paragraph.
fn split_block_at_caret(session: &mut ComposerSession) {
    if !session.selection.is_collapsed() {
        delete_selection(session);
    }
    if !save_markers(&mut session.doc, &mut session.selection) {
        return;
    }
    let html_mode = session.settings.html_mode;
    let wrap_length = session.settings.word_wrap_length;
    let doc = &mut session.doc;
    let Some((start, end)) = markers(doc) else {
        return;
    };

    let split = match parent_block(doc, start) {
        Some(block) => split_block(doc, block, start, end),
        None => {
            let paragraph = create_paragraph(doc, &session.settings, 0);
            let anchor = top_level_child(doc, end).unwrap_or(end);
            doc.insert_after(anchor, paragraph)
                .and_then(|_| doc.append_child(paragraph, start))
                .and_then(|_| doc.append_child(paragraph, end))
                .map(|_| {
                    ensure_placeholder(doc, paragraph);
                    None
                })
        }
    };

    match split {
        Ok(Some((left, right))) => {
            if !html_mode {
                for half in [left, right] {
                    if classify(doc, half) == NodeClass::Paragraph {
                        rewrap_quoted_paragraph(doc, half, wrap_length);
                    }
                }
            }
        }
        Ok(None) => {}
        Err(err) => log::warn!("failed to split block: {err}"),
    }
    restore_markers(&mut session.doc, &mut session.selection);
}

fn split_block(
    doc: &mut Document,
    block: NodeId,
    start: NodeId,
    end: NodeId,
) -> Result<Option<(NodeId, NodeId)>, DomError> {
    let right = doc.split_after(end, block)?;
    doc.prepend_child(right, end)?;
    doc.prepend_child(right, start)?;
    ensure_placeholder(doc, block);
    ensure_placeholder(doc, right);
    Ok(Some((block, right)))
}

/// Return. Inside a citation an empty quoted line is unquoted and any other
/// line splits the citation; elsewhere the block is split at the caret.
pub fn insert_paragraph(session: &mut ComposerSession) -> bool {
    ensure_caret(session);
    let Some(range) = session.selection.range() else {
        return false;
    };
    let doc = &session.doc;
    let citation_block = std::iter::once(range.start.node)
        .chain(doc.ancestors(range.start.node))
        .any(|n| is_citation(doc, n))
        .then(|| parent_block(doc, range.start.node))
        .flatten();

    session.flags.return_pressed = true;
    let handled = match citation_block {
        Some(block) if range.is_collapsed() => {
            let empty = !has_visible_content(&session.doc, block);
            (empty && change_quoted_block_to_normal(session))
                || insert_new_line_into_citation(session)
        }
        _ => session.with_history(HistoryKind::Input, Scope::Body, |s| {
            split_block_at_caret(s);
            check_magic_links(s, false);
            true
        }),
    };
    session.flags.return_pressed = false;
    handled
}

// ---- paste and HTML ------------------------------------------------------------

/// Insert plain `text`, one paragraph per line.
pub fn paste(session: &mut ComposerSession, text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    ensure_caret(session);
    let text = text.replace("\r\n", "\n");
    session.with_history(HistoryKind::Paste, Scope::Body, |s| {
        if !s.selection.is_collapsed() {
            delete_selection(s);
        }
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                split_block_at_caret(s);
            }
            if !line.is_empty()
                && let Err(err) = insert_at_caret(s, line)
            {
                log::warn!("failed to paste line: {err}");
            }
        }
        if !s.settings.html_mode {
            let wrap_length = s.settings.word_wrap_length;
            save_markers(&mut s.doc, &mut s.selection);
            wrap_paragraphs_in_document(&mut s.doc, wrap_length);
            restore_markers(&mut s.doc, &mut s.selection);
        }
    });
    true
}

/// Insert an HTML fragment at the caret. Block-level content splits the
/// block holding the caret and goes between the halves.
pub fn insert_html(session: &mut ComposerSession, html: &str) -> bool {
    ensure_caret(session);
    session.with_history(HistoryKind::InsertHtml, Scope::Body, |s| {
        if !s.selection.is_collapsed() {
            delete_selection(s);
        }
        if !save_markers(&mut s.doc, &mut s.selection) {
            return false;
        }
        let doc = &mut s.doc;
        let Some((start, end)) = markers(doc) else {
            return false;
        };
        let nodes = doc.parse_fragment(html);
        let has_blocks = nodes.iter().any(|n| classify(doc, *n).is_block());

        let result = match parent_block(doc, start) {
            Some(block) if has_blocks => insert_blocks(doc, block, start, end, &nodes),
            _ => insert_inline(doc, start, &nodes),
        };
        if let Err(err) = result {
            log::warn!("failed to insert HTML: {err}");
        }
        if !s.settings.html_mode {
            let wrap_length = s.settings.word_wrap_length;
            wrap_paragraphs_in_document(&mut s.doc, wrap_length);
        }
        restore_markers(&mut s.doc, &mut s.selection);
        true
    })
}

fn insert_inline(doc: &mut Document, start: NodeId, nodes: &[NodeId]) -> Result<(), DomError> {
    let parent = doc.parent(start).ok_or(DomError::Detached(start))?;
    for node in nodes {
        doc.insert_before(parent, *node, Some(start))?;
    }
    Ok(())
}

fn insert_blocks(
    doc: &mut Document,
    block: NodeId,
    start: NodeId,
    end: NodeId,
    nodes: &[NodeId],
) -> Result<(), DomError> {
    let right = doc.split_after(end, block)?;
    doc.prepend_child(right, end)?;
    doc.prepend_child(right, start)?;
    let mut previous = block;
    for node in nodes {
        doc.insert_after(previous, *node)?;
        previous = *node;
    }
    if !has_visible_content(doc, block) {
        doc.remove(block);
    }
    ensure_placeholder(doc, right);
    Ok(())
}

/// Re-wrap the paragraph holding the caret on request, in either mode.
pub fn wrap_paragraph_at_caret(session: &mut ComposerSession) -> bool {
    let Some(at) = caret(session) else {
        return false;
    };
    if parent_block(&session.doc, at.node)
        .is_none_or(|b| classify(&session.doc, b) != NodeClass::Paragraph)
    {
        return false;
    }
    session.with_history(HistoryKind::Wrap, Scope::Body, rewrap_caret_paragraph);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::plain_text::inner_text;
    use crate::selection::Coordinates;
    use composer_config::Settings;
    use pretty_assertions::assert_eq;

    fn session(body: &str, settings: Settings) -> ComposerSession {
        ComposerSession::from_html(&format!("<body>{body}</body>"), settings)
    }

    fn text_of(session: &ComposerSession) -> String {
        inner_text(session.document(), session.document().body())
    }

    #[test]
    fn typing_into_an_empty_paragraph_replaces_its_placeholder() {
        let mut s = ComposerSession::new(Settings::default());

        insert_text(&mut s, "hi");

        assert_eq!(s.body_html(), r#"<div class="-x-evo-paragraph">hi</div>"#);
        assert_eq!(s.coordinates(), Some(Coordinates::collapsed(2)));
    }

    #[test]
    fn typed_space_turns_a_url_into_a_link() {
        // Given a paragraph ending in a URL
        let mut s = session(r#"<div class="-x-evo-paragraph">see www.example.com</div>"#, Settings::default());
        s.set_coordinates(Coordinates::collapsed(19));

        // When typing a space
        insert_text(&mut s, " ");

        // Then the URL became a link and one undo reverts both
        assert_eq!(
            s.body_html(),
            r#"<div class="-x-evo-paragraph">see <a href="http://www.example.com">www.example.com</a> </div>"#
        );
        assert!(s.undo());
        assert_eq!(text_of(&s), "see www.example.com");
        assert_eq!(s.document().elements_by_tag(s.document().body(), "a").len(), 0);
    }

    #[test]
    fn follow_ups_wait_for_the_composition_to_end() {
        // Given an input method composing a text face
        let mut s = ComposerSession::new(Settings {
            magic_smileys: true,
            unicode_smileys: true,
            ..Settings::default()
        });
        start_composition(&mut s);

        // When the composed text arrives
        insert_text(&mut s, ":-)");

        // Then it stays as typed until the composition ends
        assert_eq!(s.body_html(), r#"<div class="-x-evo-paragraph">:-)</div>"#);
        assert!(end_composition(&mut s));
        assert_eq!(
            s.body_html(),
            "<div class=\"-x-evo-paragraph\"><span>\u{263A}</span>\u{200b}</div>"
        );
        assert!(!s.flags().composition_in_progress);
        assert!(!end_composition(&mut s));
    }

    #[test]
    fn return_splits_the_paragraph() {
        let mut s = session(r#"<div class="-x-evo-paragraph">onetwo</div>"#, Settings::default());
        s.set_coordinates(Coordinates::collapsed(3));

        insert_paragraph(&mut s);

        assert_eq!(
            s.body_html(),
            r#"<div class="-x-evo-paragraph">one</div><div class="-x-evo-paragraph">two</div>"#
        );
        assert_eq!(s.coordinates(), Some(Coordinates::collapsed(4)));
    }

    #[test]
    fn return_at_the_end_leaves_an_empty_line() {
        let mut s = session(r#"<div class="-x-evo-paragraph">one</div>"#, Settings::default());
        s.set_coordinates(Coordinates::collapsed(3));

        insert_paragraph(&mut s);
        insert_text(&mut s, "two");

        assert_eq!(text_of(&s), "one\ntwo");
    }

    #[test]
    fn backspace_deletes_characters_and_joins_lines() {
        let mut s = session(
            r#"<div class="-x-evo-paragraph">ab</div><div class="-x-evo-paragraph">cd</div>"#,
            Settings::default(),
        );
        s.set_coordinates(Coordinates::collapsed(4));

        delete_backward(&mut s);
        assert_eq!(text_of(&s), "ab\nd");

        delete_backward(&mut s);
        assert_eq!(text_of(&s), "abd");
        assert_eq!(s.coordinates(), Some(Coordinates::collapsed(2)));
    }

    #[test]
    fn deleting_a_selection_across_blocks_merges_them() {
        let mut s = session(
            r#"<div class="-x-evo-paragraph">abc</div><div class="-x-evo-paragraph">def</div>"#,
            Settings::default(),
        );
        s.set_coordinates(Coordinates { start: 1, end: 6 });

        delete_backward(&mut s);

        assert_eq!(s.body_html(), r#"<div class="-x-evo-paragraph">af</div>"#);
        assert_eq!(s.coordinates(), Some(Coordinates::collapsed(1)));
    }

    #[test]
    fn paste_makes_one_paragraph_per_line() {
        let mut s = ComposerSession::new(Settings::default());

        paste(&mut s, "first\r\nsecond");

        assert_eq!(text_of(&s), "first\nsecond");
        assert_eq!(s.history().events().len(), 1);
    }

    #[test]
    fn typing_past_the_width_wraps_in_plain_text_mode() {
        let mut s = ComposerSession::new(Settings {
            word_wrap_length: 10,
            ..Settings::plain_text()
        });

        insert_text(&mut s, "aaaa bbbb cccc");

        assert_eq!(text_of(&s), "aaaa bbbb \ncccc");
        assert_eq!(s.coordinates(), Some(Coordinates::collapsed(15)));
    }

    #[test]
    fn inline_html_lands_at_the_caret() {
        let mut s = session(r#"<div class="-x-evo-paragraph">ad</div>"#, Settings::default());
        s.set_coordinates(Coordinates::collapsed(1));

        insert_html(&mut s, "<b>bc</b>");

        assert_eq!(s.body_html(), r#"<div class="-x-evo-paragraph">a<b>bc</b>d</div>"#);
    }

    #[test]
    fn block_html_splits_the_paragraph() {
        let mut s = session(r#"<div class="-x-evo-paragraph">ad</div>"#, Settings::default());
        s.set_coordinates(Coordinates::collapsed(1));

        insert_html(&mut s, "<p>middle</p>");

        assert_eq!(text_of(&s), "a\nmiddle\nd");
    }
}
