//! Citation levels and plain-text quoting.
//!
//! In plain-text mode every visual line inside a citation starts with a
//! decoration span carrying one `"> "` per nesting level. The decorations are
//! derived state: they are stripped and rebuilt whenever the lines under them
//! change, and never counted as content.

use crate::dom::classify::{
    NodeClass, PLAINTEXT_QUOTED, QUOTE_CHARACTER, QUOTE_SYMBOL, QUOTED, TEMP_BR,
    TEMP_TEXT_WRAPPER, classify, is_citation,
};
use crate::dom::{Document, NodeId};
use crate::editing::ComposerSession;
use crate::error::DomError;
use crate::selection::{
    Position, add_selection_markers_into_element_start, markers, offset_of, restore_markers,
    save_markers,
};
use crate::undo::{HistoryKind, Scope};
use crate::wrap::{
    create_paragraph, remove_wrapping_from_element, set_paragraph_style, wrap_length_for_level,
    wrap_paragraph_length,
};

/// Marker text emitted before a citation when converting to plain text.
pub const CITATION_START: &str = "##CITATION_START##";
/// Marker text emitted after a citation when converting to plain text.
pub const CITATION_END: &str = "##CITATION_END##";
/// Class set on citations that already carry text markers.
pub const MARKED: &str = "marked";

/// Number of citation ancestors of `node` below the body. With
/// `mark_quoted` every counted citation also gets the plain-text-quoted
/// class.
pub fn get_citation_level(doc: &mut Document, node: NodeId, mark_quoted: bool) -> usize {
    let citations: Vec<NodeId> = doc
        .ancestors(node)
        .take_while(|a| *a != doc.body())
        .filter(|a| is_citation(doc, *a))
        .collect();
    if mark_quoted {
        for citation in &citations {
            doc.add_class(*citation, PLAINTEXT_QUOTED);
        }
    }
    citations.len()
}

/// Read-only variant of [`get_citation_level`].
pub fn citation_level(doc: &Document, node: NodeId) -> usize {
    doc.ancestors(node)
        .take_while(|a| *a != doc.body())
        .filter(|a| is_citation(doc, *a))
        .count()
}

/// Build a detached `span.-x-evo-quoted` holding `level` quote characters.
pub fn create_quote_decoration(doc: &mut Document, level: usize) -> Result<NodeId, DomError> {
    let decoration = doc.create_element_with("span", &[("class", QUOTED)]);
    for _ in 0..level {
        let character = doc.create_element_with("span", &[("class", QUOTE_CHARACTER)]);
        let symbol = doc.create_text(QUOTE_SYMBOL);
        doc.append_child(character, symbol)?;
        doc.append_child(decoration, character)?;
    }
    Ok(decoration)
}

fn is_decoration(doc: &Document, node: NodeId) -> bool {
    classify(doc, node) == NodeClass::QuoteDecoration
}

fn is_marker(doc: &Document, node: NodeId) -> bool {
    matches!(classify(doc, node), NodeClass::SelectionMarker(_))
}

/// First child of `node` that is not a selection marker.
fn first_content_child(doc: &Document, node: NodeId) -> Option<NodeId> {
    doc.children(node)
        .iter()
        .copied()
        .find(|c| !is_marker(doc, *c))
}

fn next_content_sibling(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut next = doc.next_sibling(node);
    while let Some(candidate) = next {
        if !is_marker(doc, candidate) {
            return Some(candidate);
        }
        next = doc.next_sibling(candidate);
    }
    None
}

fn previous_content_sibling(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut previous = doc.previous_sibling(node);
    while let Some(candidate) = previous {
        if !is_marker(doc, candidate) {
            return Some(candidate);
        }
        previous = doc.previous_sibling(candidate);
    }
    None
}

/// Whether a line break is followed by more inline content on a new line.
fn break_continues_line(doc: &Document, br: NodeId) -> bool {
    next_content_sibling(doc, br).is_some_and(|next| !classify(doc, next).is_block())
}

/// Whether inline `node` is the first thing on a visual line that nothing
/// else decorates.
fn starts_undecorated_line(doc: &Document, node: NodeId) -> bool {
    match previous_content_sibling(doc, node) {
        None => doc.parent(node).is_some_and(|p| is_citation(doc, p)),
        Some(previous) => classify(doc, previous).is_block(),
    }
}

/// Prepend a decoration to a block unless its first content is itself a
/// block, which gets decorated on its own.
fn decorate_block_start(doc: &mut Document, block: NodeId, level: usize) -> Result<(), DomError> {
    let first = first_content_child(doc, block);
    if first.is_some_and(|f| classify(doc, f).is_block() || is_decoration(doc, f)) {
        return Ok(());
    }
    let decoration = create_quote_decoration(doc, level)?;
    doc.prepend_child(block, decoration)
}

/// Split `text` after every inner newline and decorate the following line.
fn decorate_newlines(doc: &mut Document, text: NodeId, level: usize) -> Result<(), DomError> {
    let mut current = text;
    loop {
        let content = doc.text(current).unwrap_or_default();
        let len = content.chars().count();
        let Some(newline) = content.chars().position(|c| c == '\n') else {
            return Ok(());
        };
        if newline + 1 >= len {
            return Ok(());
        }
        let rest = doc.split_text(current, newline + 1)?;
        let decoration = create_quote_decoration(doc, level)?;
        doc.insert_after(current, decoration)?;
        current = rest;
    }
}

/// Insert decorations for every line under `root`, whose own content sits
/// at citation level `level`.
fn quote_children(doc: &mut Document, root: NodeId, level: usize) -> Result<(), DomError> {
    let mut work = vec![(root, level)];
    while let Some((element, level)) = work.pop() {
        for child in doc.children(element).to_vec() {
            match classify(doc, child) {
                NodeClass::Citation => {
                    doc.add_class(child, PLAINTEXT_QUOTED);
                    work.push((child, level + 1));
                }
                NodeClass::Paragraph | NodeClass::Block => {
                    if level > 0 {
                        decorate_block_start(doc, child, level)?;
                    }
                    work.push((child, level));
                }
                NodeClass::HardBreak | NodeClass::WrapBreak => {
                    if level > 0 && break_continues_line(doc, child) {
                        let decoration = create_quote_decoration(doc, level)?;
                        doc.insert_after(child, decoration)?;
                    }
                }
                NodeClass::Text => {
                    if level > 0 {
                        if starts_undecorated_line(doc, child) {
                            let decoration = create_quote_decoration(doc, level)?;
                            let parent = doc.parent(child).ok_or(DomError::Detached(child))?;
                            doc.insert_before(parent, decoration, Some(child))?;
                        }
                        decorate_newlines(doc, child, level)?;
                    }
                }
                class @ (NodeClass::Anchor | NodeClass::Smiley | NodeClass::InlineFormatting) => {
                    if level > 0 && starts_undecorated_line(doc, child) {
                        let decoration = create_quote_decoration(doc, level)?;
                        let parent = doc.parent(child).ok_or(DomError::Detached(child))?;
                        doc.insert_before(parent, decoration, Some(child))?;
                    }
                    if class == NodeClass::InlineFormatting {
                        work.push((child, level));
                    }
                }
                NodeClass::QuoteDecoration
                | NodeClass::SelectionMarker(_)
                | NodeClass::Image
                | NodeClass::Skipped
                | NodeClass::Comment => {}
            }
        }
    }
    Ok(())
}

fn remove_decorations(doc: &mut Document, root: NodeId) {
    for decoration in doc.elements_with_class(root, QUOTED) {
        doc.remove(decoration);
    }
}

/// Rebuild the decorations of `element` on a copy and swap it in. Returns
/// the element now in the tree.
pub fn quote_plain_text_element(doc: &mut Document, element: NodeId) -> Result<NodeId, DomError> {
    let citation = is_citation(doc, element);
    let level = citation_level(doc, element) + usize::from(citation);

    let copy = doc.clone_node(element, true);
    remove_decorations(doc, copy);
    doc.normalize(copy);
    if citation {
        doc.add_class(copy, PLAINTEXT_QUOTED);
    } else if level > 0 {
        decorate_block_start(doc, copy, level)?;
    }
    quote_children(doc, copy, level)?;

    if doc.parent(element).is_some() {
        doc.replace(element, copy)?;
    }
    Ok(copy)
}

/// Quote every citation in the body. Does nothing when quoting was already
/// applied; returns whether it ran.
pub fn quote_plain_text(doc: &mut Document) -> Result<bool, DomError> {
    let body = doc.body();
    if !doc.elements_with_class(body, PLAINTEXT_QUOTED).is_empty() {
        return Ok(false);
    }

    // Line breaks around top-level citations would become empty quoted lines
    for citation in doc.children(body).to_vec() {
        if !is_citation(doc, citation) {
            continue;
        }
        if let Some(previous) = doc.previous_sibling(citation)
            && classify(doc, previous) == NodeClass::HardBreak
        {
            doc.remove(previous);
        }
        if let Some(first) = doc.first_child(citation)
            && classify(doc, first) == NodeClass::HardBreak
        {
            doc.remove(first);
        }
    }

    remove_decorations(doc, body);
    doc.normalize(body);
    quote_children(doc, body, 0)?;
    Ok(true)
}

/// Strip every decoration from quoted citations.
pub fn dequote_plain_text(doc: &mut Document) {
    let body = doc.body();
    for citation in doc.elements_with_class(body, PLAINTEXT_QUOTED) {
        doc.remove_class(citation, PLAINTEXT_QUOTED);
        if doc.parent(citation).is_some() {
            remove_quoting_from_element(doc, citation);
        }
    }
    remove_decorations(doc, body);
}

/// Remove decorations, temporary wrappers and temporary breaks under
/// `element`, then merge the text they separated.
pub fn remove_quoting_from_element(doc: &mut Document, element: NodeId) {
    remove_decorations(doc, element);
    for wrapper in doc.elements_with_class(element, TEMP_TEXT_WRAPPER) {
        if let Err(err) = doc.unwrap(wrapper) {
            log::warn!("failed to unwrap temporary text wrapper: {err}");
        }
    }
    for br in doc.elements_with_class(element, TEMP_BR) {
        doc.remove(br);
    }
    doc.normalize(element);
}

/// Decorate an already wrapped paragraph at `level`: one decoration at its
/// start and one after every line break.
pub fn quote_plain_text_element_after_wrapping(
    doc: &mut Document,
    element: NodeId,
    level: usize,
) -> Result<(), DomError> {
    if level == 0 {
        return Ok(());
    }
    if first_content_child(doc, element).is_none_or(|f| !is_decoration(doc, f)) {
        let decoration = create_quote_decoration(doc, level)?;
        doc.prepend_child(element, decoration)?;
    }
    let breaks: Vec<NodeId> = doc
        .descendants(element)
        .filter(|n| classify(doc, *n).is_break())
        .collect();
    for br in breaks {
        let already = next_content_sibling(doc, br).is_some_and(|n| is_decoration(doc, n));
        if !already && break_continues_line(doc, br) {
            let decoration = create_quote_decoration(doc, level)?;
            doc.insert_after(br, decoration)?;
        }
    }
    Ok(())
}

/// Re-decorate every paragraph inside a citation after a document-wide
/// re-wrap.
pub fn quote_plain_text_elements_after_wrapping_in_document(
    doc: &mut Document,
) -> Result<(), DomError> {
    let body = doc.body();
    let paragraphs: Vec<NodeId> = doc
        .descendants(body)
        .filter(|n| classify(doc, *n) == NodeClass::Paragraph)
        .collect();
    for paragraph in paragraphs {
        let level = get_citation_level(doc, paragraph, true);
        if level > 0 {
            quote_plain_text_element_after_wrapping(doc, paragraph, level)?;
        }
    }
    Ok(())
}

/// Surround every unmarked citation under `element` with text markers so a
/// plain-text conversion can find its boundaries. Returns how many
/// citations were marked.
pub fn create_text_markers_for_citations(
    doc: &mut Document,
    element: NodeId,
) -> Result<usize, DomError> {
    let citations: Vec<NodeId> = doc
        .descendants(element)
        .filter(|n| is_citation(doc, *n) && !doc.has_class(*n, MARKED))
        .collect();
    for citation in &citations {
        doc.add_class(*citation, MARKED);
        let start = doc.create_element("span");
        let start_text = doc.create_text(CITATION_START);
        doc.append_child(start, start_text)?;
        doc.prepend_child(*citation, start)?;
        let end = doc.create_element("span");
        let end_text = doc.create_text(CITATION_END);
        doc.append_child(end, end_text)?;
        doc.append_child(*citation, end)?;
    }
    Ok(citations.len())
}

/// Whether `node` holds anything visible: non-empty text outside
/// decorations, an image or a smiley.
pub fn has_visible_content(doc: &Document, node: NodeId) -> bool {
    if let Some(text) = doc.text(node) {
        return text.chars().any(|c| c != '\u{200b}');
    }
    let mut stack = doc.children(node).to_vec();
    while let Some(current) = stack.pop() {
        match classify(doc, current) {
            NodeClass::Text => {
                if doc
                    .text(current)
                    .is_some_and(|t| t.chars().any(|c| c != '\u{200b}'))
                {
                    return true;
                }
            }
            NodeClass::Image | NodeClass::Smiley => return true,
            NodeClass::QuoteDecoration
            | NodeClass::SelectionMarker(_)
            | NodeClass::Skipped
            | NodeClass::Comment => {}
            _ => stack.extend(doc.children(current).iter().copied()),
        }
    }
    false
}

/// The child of a citation that contains `at`, if any.
fn quoted_block_at(doc: &Document, at: Position) -> Option<NodeId> {
    if is_citation(doc, at.node) {
        let child = doc.children(at.node).get(at.offset).copied()?;
        return (!is_citation(doc, child) && doc.is_element(child)).then_some(child);
    }
    std::iter::once(at.node)
        .chain(doc.ancestors(at.node))
        .take_while(|n| *n != doc.body())
        .find(|n| {
            doc.is_element(*n)
                && !is_citation(doc, *n)
                && doc.parent(*n).is_some_and(|p| is_citation(doc, p))
        })
}

fn caret_at_block_start(doc: &Document, block: NodeId, at: Position) -> bool {
    if doc.contains(block, at.node) {
        offset_of(doc, block, at) == 0
    } else {
        doc.children(at.node).get(at.offset) == Some(&block)
    }
}

/// Move `block` out of its citation, splitting the citation when the block
/// sits in the middle. An emptied citation is removed.
fn move_block_out_of_citation(doc: &mut Document, block: NodeId) -> Result<(), DomError> {
    let citation = doc.parent(block).ok_or(DomError::Detached(block))?;
    let outer = doc.parent(citation).ok_or(DomError::Detached(citation))?;
    let index = doc.index_in_parent(block).unwrap_or(0);
    let count = doc.children(citation).len();

    if index == 0 {
        doc.insert_before(outer, block, Some(citation))?;
    } else if index + 1 == count {
        doc.insert_after(citation, block)?;
    } else {
        let right = doc.split_after(block, citation)?;
        debug_assert!(doc.parent(right) == Some(outer));
        doc.insert_after(citation, block)?;
    }

    if doc.children(citation).is_empty() {
        doc.remove(citation);
    }
    Ok(())
}

/// With the caret at the very start of a quoted block, move that block one
/// citation level up. Returns `false` without touching anything otherwise.
pub fn change_quoted_block_to_normal(session: &mut ComposerSession) -> bool {
    let Some(range) = session.selection.range().filter(|r| r.is_collapsed()) else {
        return false;
    };
    let Some(block) = quoted_block_at(&session.doc, range.start) else {
        return false;
    };
    if !caret_at_block_start(&session.doc, block, range.start) {
        return false;
    }

    session.with_history(HistoryKind::Unquote, Scope::Body, |s| {
        let html_mode = s.settings.html_mode;
        let wrap_length = s.settings.word_wrap_length;
        save_markers(&mut s.doc, &mut s.selection);

        let level = citation_level(&s.doc, block);
        remove_quoting_from_element(&mut s.doc, block);
        remove_wrapping_from_element(&mut s.doc, block);
        if let Err(err) = move_block_out_of_citation(&mut s.doc, block) {
            log::warn!("failed to move quoted block out of its citation: {err}");
        }

        let new_level = level.saturating_sub(1);
        if !html_mode {
            set_paragraph_style(&mut s.doc, block, wrap_length, new_level);
            wrap_paragraph_length(
                &mut s.doc,
                block,
                wrap_length_for_level(wrap_length, new_level),
            );
            if let Err(err) = quote_plain_text_element_after_wrapping(&mut s.doc, block, new_level)
            {
                log::warn!("failed to quote unquoted block: {err}");
            }
        }

        restore_markers(&mut s.doc, &mut s.selection);
    });
    true
}

/// Remove empty blocks from one edge of `container`, descending into
/// citations along the way.
fn trim_empty_edge(doc: &mut Document, container: NodeId, from_end: bool) {
    loop {
        let edge = if from_end {
            doc.last_child(container)
        } else {
            doc.first_child(container)
        };
        let Some(edge) = edge else {
            return;
        };
        match classify(doc, edge) {
            NodeClass::Citation => {
                trim_empty_edge(doc, edge, from_end);
                if doc.children(edge).is_empty() {
                    doc.remove(edge);
                } else {
                    return;
                }
            }
            class if class.is_block() && !has_visible_content(doc, edge) => doc.remove(edge),
            _ => return,
        }
    }
}

/// Re-wrap the paragraphs under a citation and rebuild its decorations.
fn requote_citation(doc: &mut Document, citation: NodeId, wrap_length: usize) {
    let paragraphs: Vec<NodeId> = doc
        .descendants(citation)
        .filter(|n| classify(doc, *n) == NodeClass::Paragraph)
        .collect();
    for paragraph in paragraphs {
        let level = citation_level(doc, paragraph);
        remove_quoting_from_element(doc, paragraph);
        wrap_paragraph_length(doc, paragraph, wrap_length_for_level(wrap_length, level));
    }
    if let Err(err) = quote_plain_text_element(doc, citation) {
        log::warn!("failed to requote citation: {err}");
    }
}

/// Break the citation around the caret in two and put an empty, unquoted
/// paragraph with the caret between the halves. Returns `false` when the
/// caret is not inside a citation.
pub fn insert_new_line_into_citation(session: &mut ComposerSession) -> bool {
    let Some(range) = session.selection.range() else {
        return false;
    };
    let doc = &session.doc;
    let top = std::iter::once(range.start.node)
        .chain(doc.ancestors(range.start.node))
        .take_while(|n| *n != doc.body())
        .filter(|n| is_citation(doc, *n))
        .last();
    let Some(top) = top else {
        return false;
    };

    session.with_history(HistoryKind::Citation, Scope::Body, |s| {
        let html_mode = s.settings.html_mode;
        let wrap_length = s.settings.word_wrap_length;
        save_markers(&mut s.doc, &mut s.selection);
        let Some((start, end)) = markers(&s.doc) else {
            return;
        };
        s.doc.remove(end);

        let right = match s.doc.split_after(start, top) {
            Ok(right) => right,
            Err(err) => {
                log::warn!("failed to split citation: {err}");
                restore_markers(&mut s.doc, &mut s.selection);
                return;
            }
        };
        s.doc.remove(start);

        let paragraph = create_paragraph(&mut s.doc, &s.settings, 0);
        let br = s.doc.create_element("br");
        let placed = s
            .doc
            .append_child(paragraph, br)
            .and_then(|_| s.doc.insert_after(top, paragraph))
            .and_then(|_| add_selection_markers_into_element_start(&mut s.doc, paragraph));
        if let Err(err) = placed {
            log::warn!("failed to insert paragraph into citation: {err}");
        }

        trim_empty_edge(&mut s.doc, top, true);
        trim_empty_edge(&mut s.doc, right, false);
        for half in [top, right] {
            if !has_visible_content(&s.doc, half) {
                s.doc.remove(half);
            } else if !html_mode {
                remove_quoting_from_element(&mut s.doc, half);
                requote_citation(&mut s.doc, half, wrap_length);
            }
        }

        restore_markers(&mut s.doc, &mut s.selection);
    });
    true
}
