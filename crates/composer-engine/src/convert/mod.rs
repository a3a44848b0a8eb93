//! Switching between rich and plain-text composing, and loading received
//! text as a reply.
//!
//! HTML to plain text is not lossless: the content is rendered to text and
//! parsed back into paragraphs, so inline formatting is dropped. Citations
//! survive the trip as sentinel lines.

pub mod paragraphs;
pub mod persist;
pub mod plain_text;

use composer_config::Settings;

use crate::citation::{
    citation_level, create_text_markers_for_citations, dequote_plain_text, quote_plain_text,
};
use crate::dom::classify::{
    CITE_BODY, INPUT_START, MAIN_CITE, NodeClass, SMILEY_IMG, classify,
};
use crate::dom::{Document, NodeId};
use crate::editing::ComposerSession;
use crate::error::DomError;
use crate::selection::{
    add_selection_markers_into_element_start, default_caret, restore_markers, save_markers,
};
use crate::smiley::toggle_smileys;
use crate::wrap::{
    create_paragraph, remove_wrapping_from_element, set_paragraph_style, wrap_paragraphs_in_document,
};

use paragraphs::{parse_text_into_paragraphs, sentinels_from_quote_prefixes};
use plain_text::inner_text;

/// Body attribute set once the content went through a plain-text
/// conversion.
pub const DATA_CONVERTED: &str = "data-converted";

fn paragraphs_in(doc: &Document, root: NodeId) -> Vec<NodeId> {
    doc.descendants(root)
        .filter(|n| classify(doc, *n) == NodeClass::Paragraph)
        .collect()
}

fn create_main_citation(doc: &mut Document) -> NodeId {
    doc.create_element_with("blockquote", &[("type", "cite"), ("id", MAIN_CITE)])
}

fn append_empty_paragraph(
    doc: &mut Document,
    parent: NodeId,
    settings: &Settings,
) -> Result<NodeId, DomError> {
    let paragraph = create_paragraph(doc, settings, 0);
    let br = doc.create_element("br");
    doc.append_child(paragraph, br)?;
    doc.append_child(parent, paragraph)?;
    Ok(paragraph)
}

/// Where the quoted part of a reply lives: the main citation, or a
/// citation synthesized around the whole body when a cite-body hint is
/// present.
fn quoting_root(doc: &mut Document) -> Result<Option<NodeId>, DomError> {
    if let Some(cite) = doc.get_element_by_id(MAIN_CITE) {
        return Ok(Some(cite));
    }
    let body = doc.body();
    let hints = doc.elements_with_class(body, CITE_BODY);
    if hints.is_empty() {
        return Ok(None);
    }
    for hint in hints {
        doc.remove(hint);
    }
    let cite = create_main_citation(doc);
    doc.move_children(body, cite)?;
    doc.append_child(body, cite)?;
    Ok(Some(cite))
}

/// Rebuild the content of `doc` as plain-text paragraphs. `settings` must
/// be in plain-text mode.
pub(crate) fn convert_document_to_plain_text(
    doc: &mut Document,
    settings: &Settings,
) -> Result<(), DomError> {
    let body = doc.body();
    let main_cite = quoting_root(doc)?;
    let from = main_cite.unwrap_or(body);

    let citations = create_text_markers_for_citations(doc, from)?;
    let text = inner_text(doc, from);
    log::debug!("converting {} characters with {citations} citations", text.len());

    let target = match main_cite {
        Some(cite) => {
            let fresh = create_main_citation(doc);
            doc.replace(cite, fresh)?;
            fresh
        }
        None => {
            doc.remove_children(body);
            body
        }
    };
    parse_text_into_paragraphs(doc, target, &text, settings)?;
    if doc.children(body).is_empty() {
        append_empty_paragraph(doc, body, settings)?;
    }

    let wrap_length = settings.word_wrap_length;
    for paragraph in paragraphs_in(doc, body) {
        let level = citation_level(doc, paragraph);
        set_paragraph_style(doc, paragraph, wrap_length, level);
    }
    wrap_paragraphs_in_document(doc, wrap_length);
    if citations > 0 || main_cite.is_some() {
        quote_plain_text(doc)?;
    }

    remove_images(doc, body);
    toggle_smileys(doc, false);
    doc.set_attr(body, DATA_CONVERTED, "");
    Ok(())
}

/// Remove every image under `root` except smiley images.
pub(crate) fn remove_images(doc: &mut Document, root: NodeId) {
    for img in doc.elements_by_tag(root, "img") {
        if !doc.has_class(img, SMILEY_IMG) {
            doc.remove(img);
        }
    }
}

/// Turn the rich content into plain-text paragraphs: citations become
/// quoted paragraphs, everything is wrapped, inline formatting and images
/// are dropped. The caret keeps its linear position and the undo history
/// is cleared.
pub fn convert_when_changing_composer_mode(session: &mut ComposerSession) {
    let coordinates = session.coordinates();
    session.settings.html_mode = false;
    if let Err(err) = convert_document_to_plain_text(&mut session.doc, &session.settings) {
        log::warn!("plain-text conversion incomplete: {err}");
    }
    session.history.clean_history();
    match coordinates {
        Some(coordinates) => session.set_coordinates(coordinates),
        None => {
            let caret = default_caret(&session.doc);
            session.selection.collapse(caret);
        }
    }
    session.mark_changed();
}

/// Back to rich editing: quoting, wrapping and the fixed paragraph widths
/// go away and smiley images show again.
pub fn convert_to_html_mode(session: &mut ComposerSession) {
    save_markers(&mut session.doc, &mut session.selection);
    let doc = &mut session.doc;
    let body = doc.body();

    dequote_plain_text(doc);
    for paragraph in paragraphs_in(doc, body) {
        remove_wrapping_from_element(doc, paragraph);
        doc.remove_attr(paragraph, "style");
    }
    toggle_smileys(doc, true);
    session.settings.html_mode = true;

    restore_markers(&mut session.doc, &mut session.selection);
    session.history.clean_history();
    session.mark_changed();
}

/// Load the text of a received message as the quoted part of a reply. The
/// caret goes into an empty paragraph above the quote, or below it when
/// replies start at the bottom. Lines starting with `>` become nested
/// citations.
pub fn convert_content(session: &mut ComposerSession, text: &str) {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let text = sentinels_from_quote_prefixes(text);
    if let Err(err) = load_reply(session, &text) {
        log::warn!("failed to load reply content: {err}");
    }
    restore_markers(&mut session.doc, &mut session.selection);
    session.history.clean_history();
    session.mark_changed();
}

fn load_reply(session: &mut ComposerSession, text: &str) -> Result<(), DomError> {
    let doc = &mut session.doc;
    let settings = &session.settings;
    let body = doc.body();
    doc.remove_children(body);

    let cite = create_main_citation(doc);
    doc.append_child(body, cite)?;
    parse_text_into_paragraphs(doc, cite, text, settings)?;

    let input = create_paragraph(doc, settings, 0);
    doc.set_attr(input, "id", INPUT_START);
    let br = doc.create_element("br");
    doc.append_child(input, br)?;
    if settings.start_replies_at_bottom {
        doc.append_child(body, input)?;
    } else {
        doc.prepend_child(body, input)?;
    }

    if !settings.html_mode {
        wrap_paragraphs_in_document(doc, settings.word_wrap_length);
        quote_plain_text(doc)?;
    }
    add_selection_markers_into_element_start(doc, input)?;
    Ok(())
}
