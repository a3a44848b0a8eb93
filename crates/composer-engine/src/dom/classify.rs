//! Typed classification of composer nodes.
//!
//! The composer marks its structure with well-known class names and ids.
//! Walks classify each node once into a [`NodeClass`] and match on that
//! instead of re-testing tags and attributes at every step.

use super::{Document, NodeData, NodeId};

pub const SELECTION_START_MARKER: &str = "-x-evo-selection-start-marker";
pub const SELECTION_END_MARKER: &str = "-x-evo-selection-end-marker";

pub const PARAGRAPH: &str = "-x-evo-paragraph";
pub const WRAP_BR: &str = "-x-evo-wrap-br";
pub const QUOTED: &str = "-x-evo-quoted";
pub const QUOTE_CHARACTER: &str = "-x-evo-quote-character";
pub const PLAINTEXT_QUOTED: &str = "-x-evo-plaintext-quoted";
pub const TEMP_TEXT_WRAPPER: &str = "-x-evo-temp-text-wrapper";
pub const TEMP_BR: &str = "-x-evo-temp-br";
pub const SMILEY_WRAPPER: &str = "-x-evo-smiley-wrapper";
pub const SMILEY_IMG: &str = "-x-evo-smiley-img";
pub const SMILEY_TEXT: &str = "-x-evo-smiley-text";
/// Marks where a smiley still waiting for its image goes
pub const SMILEY_PENDING: &str = "-x-evo-smiley-pending";
pub const VISITED_LINK: &str = "-x-evo-visited-link";
pub const ALIGN_CENTER: &str = "-x-evo-align-center";
pub const ALIGN_RIGHT: &str = "-x-evo-align-right";
pub const CITE_BODY: &str = "-x-evo-cite-body";
pub const MAIN_CITE: &str = "-x-evo-main-cite";
pub const INPUT_START: &str = "-x-evo-input-start";

/// Text of one quote level inside a decoration.
pub const QUOTE_SYMBOL: &str = "> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    /// `blockquote[type=cite]`
    Citation,
    /// `.-x-evo-paragraph`
    Paragraph,
    /// Other block-level containers (`div`, `p`, `pre`, lists, headings)
    Block,
    /// `span.-x-evo-quoted`
    QuoteDecoration,
    /// `br.-x-evo-wrap-br`
    WrapBreak,
    /// Any other `br`
    HardBreak,
    SelectionMarker(MarkerKind),
    /// `span.-x-evo-smiley-wrapper`
    Smiley,
    Anchor,
    /// `b`, `i`, `u`, `span` and friends
    InlineFormatting,
    Image,
    /// Never quoted, wrapped or rendered as text (`meta`, `style`, `script`)
    Skipped,
    Text,
    Comment,
}

impl NodeClass {
    pub fn is_block(self) -> bool {
        matches!(self, Self::Citation | Self::Paragraph | Self::Block)
    }

    pub fn is_break(self) -> bool {
        matches!(self, Self::WrapBreak | Self::HardBreak)
    }
}

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "body", "center", "dd", "div", "dl", "dt", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "ol", "p", "pre", "section",
    "table", "tbody", "td", "th", "thead", "tr", "ul",
];

const SKIPPED_TAGS: &[&str] = &["head", "link", "meta", "script", "style", "title"];

pub fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

pub fn classify(doc: &Document, id: NodeId) -> NodeClass {
    let el = match doc.data(id) {
        NodeData::Text(_) => return NodeClass::Text,
        NodeData::Comment(_) => return NodeClass::Comment,
        NodeData::Element(el) => el,
    };
    match el.tag.as_str() {
        "blockquote" if doc.attr(id, "type") == Some("cite") => NodeClass::Citation,
        "br" if doc.has_class(id, WRAP_BR) => NodeClass::WrapBreak,
        "br" => NodeClass::HardBreak,
        "a" => NodeClass::Anchor,
        "img" => NodeClass::Image,
        "span" => match doc.element_id(id) {
            Some(SELECTION_START_MARKER) => NodeClass::SelectionMarker(MarkerKind::Start),
            Some(SELECTION_END_MARKER) => NodeClass::SelectionMarker(MarkerKind::End),
            _ if doc.has_class(id, QUOTED) => NodeClass::QuoteDecoration,
            _ if doc.has_class(id, SMILEY_WRAPPER) => NodeClass::Smiley,
            _ => NodeClass::InlineFormatting,
        },
        tag if SKIPPED_TAGS.contains(&tag) => NodeClass::Skipped,
        _ if doc.has_class(id, PARAGRAPH) => NodeClass::Paragraph,
        tag if is_block_tag(tag) => NodeClass::Block,
        _ => NodeClass::InlineFormatting,
    }
}

/// Whether `id` is a citation (`blockquote[type=cite]`).
pub fn is_citation(doc: &Document, id: NodeId) -> bool {
    classify(doc, id) == NodeClass::Citation
}

/// Nearest ancestor-or-self of `id` that is a block, stopping at `body`.
pub fn parent_block(doc: &Document, id: NodeId) -> Option<NodeId> {
    std::iter::once(id)
        .chain(doc.ancestors(id))
        .take_while(|n| *n != doc.body())
        .find(|n| classify(doc, *n).is_block())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"<blockquote type="cite">x</blockquote>"#, NodeClass::Citation)]
    #[case("<blockquote>x</blockquote>", NodeClass::Block)]
    #[case(r#"<div class="-x-evo-paragraph">x</div>"#, NodeClass::Paragraph)]
    #[case(r#"<span class="-x-evo-quoted">x</span>"#, NodeClass::QuoteDecoration)]
    #[case(r#"<br class="-x-evo-wrap-br">"#, NodeClass::WrapBreak)]
    #[case("<br>", NodeClass::HardBreak)]
    #[case(r#"<span id="-x-evo-selection-end-marker"></span>"#, NodeClass::SelectionMarker(MarkerKind::End))]
    #[case(r#"<span class="-x-evo-smiley-wrapper"></span>"#, NodeClass::Smiley)]
    #[case(r#"<a href="x">x</a>"#, NodeClass::Anchor)]
    #[case("<b>x</b>", NodeClass::InlineFormatting)]
    #[case("<style>p {}</style>", NodeClass::Skipped)]
    #[case("<!-- c -->", NodeClass::Comment)]
    #[case("text", NodeClass::Text)]
    fn classifies(#[case] html: &str, #[case] expected: NodeClass) {
        let mut doc = Document::new();
        let body = doc.body();
        doc.set_inner_html(body, html);
        let node = doc.children(body)[0];

        assert_eq!(classify(&doc, node), expected);
    }

    #[test]
    fn parent_block_stops_at_body() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.set_inner_html(body, "<b>loose</b>");
        let text = doc.descendants(body).last().unwrap();

        assert_eq!(parent_block(&doc, text), None);
    }
}
