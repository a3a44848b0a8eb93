//! Plain-text line wrapping.
//!
//! Wrapping inserts `br.-x-evo-wrap-br` soft breaks so no visual line of a
//! paragraph exceeds the configured width. Soft breaks are derived state:
//! every wrap starts by removing the previous ones, so wrapping twice gives
//! the same tree as wrapping once.

use composer_config::{Settings, TAB_LENGTH};

use crate::citation::{
    citation_level, quote_plain_text_element_after_wrapping, remove_quoting_from_element,
};
use crate::dom::classify::{NodeClass, PARAGRAPH, PLAINTEXT_QUOTED, WRAP_BR, classify};
use crate::dom::{Document, NodeId};
use crate::error::DomError;

/// Line width available to a paragraph nested `level` citations deep. Each
/// level spends two columns on its `"> "` decoration.
pub fn wrap_length_for_level(wrap_length: usize, level: usize) -> usize {
    wrap_length.saturating_sub(2 * level).max(1)
}

/// Width `text` occupies once entities are decoded, expanding tabs.
pub fn get_decoded_line_length(text: &str) -> usize {
    let decoded = html_escape::decode_html_entities(text);
    decoded.chars().fold(0, |width, c| advance(width, c))
}

fn advance(width: usize, c: char) -> usize {
    match c {
        '\t' => (width / TAB_LENGTH + 1) * TAB_LENGTH,
        '\u{200b}' => width,
        _ => width + 1,
    }
}

/// New detached paragraph. In plain-text mode it gets the fixed-width
/// style for `level`.
pub fn create_paragraph(doc: &mut Document, settings: &Settings, level: usize) -> NodeId {
    let paragraph = doc.create_element_with("div", &[("class", PARAGRAPH)]);
    if !settings.html_mode {
        set_paragraph_style(doc, paragraph, settings.word_wrap_length, level);
    }
    paragraph
}

pub fn set_paragraph_style(doc: &mut Document, paragraph: NodeId, wrap_length: usize, level: usize) {
    let width = wrap_length_for_level(wrap_length, level);
    doc.set_attr(
        paragraph,
        "style",
        &format!("width: {width}ch; word-wrap: normal;"),
    );
}

/// Remove every soft break under `element` and merge the text they split.
pub fn remove_wrapping_from_element(doc: &mut Document, element: NodeId) {
    for br in doc.elements_with_class(element, WRAP_BR) {
        doc.remove(br);
    }
    doc.normalize(element);
}

enum Unit {
    Char { node: NodeId, index: usize, ch: char },
    /// Content that never breaks inside: links, smileys, images
    Atom(usize),
    LineBreak,
}

fn collect_units(doc: &Document, element: NodeId) -> Vec<Unit> {
    enum Step {
        Enter(NodeId),
        LeaveBlock,
    }

    let mut units = Vec::new();
    let mut stack: Vec<Step> = doc.children(element).iter().rev().map(|c| Step::Enter(*c)).collect();
    while let Some(step) = stack.pop() {
        let node = match step {
            Step::LeaveBlock => {
                units.push(Unit::LineBreak);
                continue;
            }
            Step::Enter(node) => node,
        };
        match classify(doc, node) {
            NodeClass::Text => {
                let text = doc.text(node).unwrap_or_default();
                units.extend(
                    text.chars()
                        .enumerate()
                        .map(|(index, ch)| Unit::Char { node, index, ch }),
                );
            }
            NodeClass::HardBreak | NodeClass::WrapBreak => units.push(Unit::LineBreak),
            NodeClass::Citation | NodeClass::Paragraph | NodeClass::Block => {
                units.push(Unit::LineBreak);
                stack.push(Step::LeaveBlock);
                stack.extend(doc.children(node).iter().rev().map(|c| Step::Enter(*c)));
            }
            NodeClass::Anchor | NodeClass::Smiley => {
                let width = doc
                    .text_content(node)
                    .chars()
                    .filter(|c| *c != '\u{200b}')
                    .count();
                units.push(Unit::Atom(width.max(1)));
            }
            NodeClass::Image => units.push(Unit::Atom(1)),
            NodeClass::InlineFormatting => {
                stack.extend(doc.children(node).iter().rev().map(|c| Step::Enter(*c)));
            }
            NodeClass::QuoteDecoration
            | NodeClass::SelectionMarker(_)
            | NodeClass::Skipped
            | NodeClass::Comment => {}
        }
    }
    units
}

/// Greedy line filling. Returns the whitespace characters after which a
/// soft break goes, in document order.
fn find_breaks(units: &[Unit], length: usize) -> Vec<(NodeId, usize)> {
    let mut breaks = Vec::new();
    let mut width = 0usize;
    let mut since_break = 0usize;
    let mut break_at: Option<(NodeId, usize)> = None;

    for unit in units {
        match unit {
            Unit::LineBreak => {
                width = 0;
                since_break = 0;
                break_at = None;
            }
            Unit::Char { node, index, ch } if *ch == ' ' || *ch == '\t' => {
                width = advance(width, *ch);
                since_break = 0;
                break_at = Some((*node, *index));
            }
            Unit::Char { ch, .. } => {
                let w = advance(0, *ch);
                if width + w > length
                    && let Some(at) = break_at.take()
                {
                    breaks.push(at);
                    width = since_break;
                }
                width += w;
                since_break += w;
            }
            Unit::Atom(w) => {
                if width + w > length
                    && let Some(at) = break_at.take()
                {
                    breaks.push(at);
                    width = since_break;
                }
                width += w;
                since_break += w;
            }
        }
    }
    breaks
}

/// Wrap the lines of `element` at `length` columns. Words longer than a
/// line are never split.
pub fn wrap_paragraph_length(doc: &mut Document, element: NodeId, length: usize) {
    remove_wrapping_from_element(doc, element);
    let units = collect_units(doc, element);
    let breaks = find_breaks(&units, length.max(1));

    // Back to front so earlier offsets stay valid while splitting
    for (node, index) in breaks.into_iter().rev() {
        if let Err(err) = insert_soft_break(doc, node, index) {
            log::warn!("failed to insert soft break: {err}");
        }
    }
}

fn insert_soft_break(doc: &mut Document, node: NodeId, index: usize) -> Result<(), DomError> {
    if index + 1 < doc.text_len(node) {
        doc.split_text(node, index + 1)?;
    }
    let br = doc.create_element_with("br", &[("class", WRAP_BR)]);
    doc.insert_after(node, br)
}

/// Wrap `element` at the width its citation level allows.
pub fn wrap_paragraph(doc: &mut Document, element: NodeId, wrap_length: usize) {
    let level = citation_level(doc, element);
    wrap_paragraph_length(doc, element, wrap_length_for_level(wrap_length, level));
}

/// Strip quoting from a paragraph, wrap it and decorate it again when it
/// lives inside a quoted citation.
pub fn rewrap_quoted_paragraph(doc: &mut Document, paragraph: NodeId, wrap_length: usize) {
    let level = citation_level(doc, paragraph);
    let quoted = doc
        .ancestors(paragraph)
        .any(|a| doc.has_class(a, PLAINTEXT_QUOTED));
    remove_quoting_from_element(doc, paragraph);
    wrap_paragraph_length(doc, paragraph, wrap_length_for_level(wrap_length, level));
    if quoted
        && let Err(err) = quote_plain_text_element_after_wrapping(doc, paragraph, level)
    {
        log::warn!("failed to quote wrapped paragraph: {err}");
    }
}

/// Re-wrap every paragraph in the body, keeping quoted citations quoted.
pub fn wrap_paragraphs_in_document(doc: &mut Document, wrap_length: usize) {
    let body = doc.body();
    let paragraphs: Vec<NodeId> = doc
        .descendants(body)
        .filter(|n| classify(doc, *n) == NodeClass::Paragraph)
        .collect();
    log::debug!("wrapping {} paragraphs at {wrap_length}", paragraphs.len());
    for paragraph in paragraphs {
        rewrap_quoted_paragraph(doc, paragraph, wrap_length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::plain_text::inner_text;
    use crate::tests::{body_html, document_from_body};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn wrapped_lines(html: &str, length: usize) -> Vec<String> {
        let mut doc = document_from_body(html);
        let paragraph = doc.children(doc.body())[0];
        wrap_paragraph_length(&mut doc, paragraph, length);
        inner_text(&doc, paragraph)
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn breaks_after_the_last_space_that_fits() {
        // Given a paragraph wider than the limit
        let html = r#"<div class="-x-evo-paragraph">aaa bbb ccc</div>"#;

        // When wrapping at eight columns
        let lines = wrapped_lines(html, 8);

        // Then the space stays at the end of the first line
        assert_eq!(lines, vec!["aaa bbb ", "ccc"]);
    }

    #[test]
    fn long_words_are_not_split() {
        let lines = wrapped_lines(r#"<div>a abcdefghijkl b</div>"#, 5);

        assert_eq!(lines, vec!["a ", "abcdefghijkl ", "b"]);
    }

    #[test]
    fn hard_breaks_reset_the_line() {
        let lines = wrapped_lines("<div>aaaa<br>bbbb cc</div>", 7);

        assert_eq!(lines, vec!["aaaa", "bbbb cc"]);
    }

    #[test]
    fn links_are_atomic() {
        let mut doc = document_from_body(
            r#"<div>see <a href="http://example.com/long">http://example.com/long</a> ok</div>"#,
        );
        let paragraph = doc.children(doc.body())[0];

        wrap_paragraph_length(&mut doc, paragraph, 10);

        assert_eq!(
            body_html(&doc),
            r#"<div>see <br class="-x-evo-wrap-br"><a href="http://example.com/long">http://example.com/long</a> <br class="-x-evo-wrap-br">ok</div>"#
        );
    }

    #[test]
    fn wrapping_is_idempotent() {
        let text = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do";
        let mut doc = document_from_body(&format!(r#"<div class="-x-evo-paragraph">{text}</div>"#));
        let paragraph = doc.children(doc.body())[0];

        wrap_paragraph_length(&mut doc, paragraph, 20);
        let once = body_html(&doc);
        wrap_paragraph_length(&mut doc, paragraph, 20);

        assert_eq!(body_html(&doc), once);
    }

    #[test]
    fn remove_wrapping_restores_the_text() {
        let mut doc = document_from_body("<div>one two three four</div>");
        let paragraph = doc.children(doc.body())[0];
        wrap_paragraph_length(&mut doc, paragraph, 5);

        remove_wrapping_from_element(&mut doc, paragraph);

        assert_eq!(body_html(&doc), "<div>one two three four</div>");
    }

    #[test]
    fn every_line_fits_the_limit() {
        let sentence = "The quick brown fox jumps over the lazy dog and keeps running far away. ";
        let text = sentence.repeat(4);
        let lines = wrapped_lines(&format!("<div>{text}</div>"), 72);

        assert!(lines.len() >= 2);
        for line in lines {
            assert!(line.trim_end().chars().count() <= 72, "line too long: {line:?}");
        }
    }

    #[test]
    fn quoted_paragraphs_lose_two_columns_per_level() {
        let mut doc = document_from_body(
            r#"<blockquote type="cite" class="-x-evo-plaintext-quoted"><div class="-x-evo-paragraph">aaa bbb ccc</div></blockquote>"#,
        );
        let citation = doc.children(doc.body())[0];
        let paragraph = doc.children(citation)[0];

        rewrap_quoted_paragraph(&mut doc, paragraph, 10);

        assert_eq!(
            doc.text_content(paragraph),
            "> aaa bbb > ccc",
            "wrapped at 8 columns and decorated"
        );
    }

    #[rstest]
    #[case("abc", 3)]
    #[case("a&amp;b", 3)]
    #[case("\tx", 9)]
    #[case("ab\tc", 9)]
    fn decoded_line_length(#[case] text: &str, #[case] expected: usize) {
        assert_eq!(get_decoded_line_length(text), expected);
    }

    #[rstest]
    #[case(72, 0, 72)]
    #[case(72, 2, 68)]
    #[case(3, 5, 1)]
    fn level_width(#[case] wrap: usize, #[case] level: usize, #[case] expected: usize) {
        assert_eq!(wrap_length_for_level(wrap, level), expected);
    }
}
