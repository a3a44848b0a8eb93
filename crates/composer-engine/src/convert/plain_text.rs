//! Rendering subtrees as plain text.
//!
//! Both renderings share one line model: text extends the current line, a
//! `<br>` ends it, and block elements start and end lines. A `<br>` that is
//! the last visible thing in its block only keeps an otherwise empty line
//! open, so `<div><br></div>` is one empty line and `<div>a<br></div>` is
//! just `a`.

use crate::dom::classify::{ALIGN_CENTER, ALIGN_RIGHT, NodeClass, classify};
use crate::dom::{Document, NodeId};

const NBSP: char = '\u{a0}';
const ZWSP: char = '\u{200b}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy)]
struct Options {
    /// Render quote decorations, list bullets and alignment padding
    outgoing: bool,
    wrap_length: usize,
}

struct LineWriter {
    options: Options,
    lines: Vec<String>,
    current: String,
    open: bool,
    align: Vec<Align>,
}

impl LineWriter {
    fn new(options: Options) -> Self {
        Self {
            options,
            lines: Vec::new(),
            current: String::new(),
            open: false,
            align: vec![Align::Left],
        }
    }

    fn push_text(&mut self, text: &str) {
        let outgoing = self.options.outgoing;
        let filtered = text.chars().filter(|c| *c != ZWSP).map(|c| {
            if outgoing && c == NBSP { ' ' } else { c }
        });
        let before = self.current.len();
        self.current.extend(filtered);
        if self.current.len() > before {
            self.open = true;
        }
    }

    fn break_line(&mut self) {
        self.flush();
        self.open = true;
    }

    /// End the current line if anything is on it or it was kept open.
    fn end_line(&mut self) {
        if self.open || !self.current.is_empty() {
            self.flush();
        }
    }

    fn flush(&mut self) {
        let line = std::mem::take(&mut self.current);
        let line = match self.align.last() {
            Some(align) if self.options.outgoing => pad(line, *align, self.options.wrap_length),
            _ => line,
        };
        self.lines.push(line);
        self.open = false;
    }

    fn finish(mut self) -> String {
        self.end_line();
        self.lines.join("\n")
    }
}

fn pad(line: String, align: Align, width: usize) -> String {
    let len = line.chars().count();
    if len >= width {
        return line;
    }
    let padding = match align {
        Align::Left => return line,
        Align::Center => (width - len) / 2,
        Align::Right => width - len,
    };
    format!("{}{line}", " ".repeat(padding))
}

fn is_invisible(doc: &Document, node: NodeId, outgoing: bool) -> bool {
    match classify(doc, node) {
        NodeClass::SelectionMarker(_) | NodeClass::Skipped | NodeClass::Comment => true,
        NodeClass::QuoteDecoration => !outgoing,
        NodeClass::Text => doc.text(node).is_none_or(|t| t.chars().all(|c| c == ZWSP)),
        _ => false,
    }
}

/// A `<br>` with nothing visible after it inside its block.
fn is_placeholder_break(doc: &Document, br: NodeId, root: NodeId, outgoing: bool) -> bool {
    let Some(parent) = doc.parent(br) else {
        return false;
    };
    if parent != root && !classify(doc, parent).is_block() {
        return false;
    }
    let mut next = doc.next_sibling(br);
    while let Some(sibling) = next {
        if !is_invisible(doc, sibling, outgoing) {
            return false;
        }
        next = doc.next_sibling(sibling);
    }
    true
}

fn block_align(doc: &Document, block: NodeId, inherited: Align) -> Align {
    if doc.has_class(block, ALIGN_CENTER) {
        Align::Center
    } else if doc.has_class(block, ALIGN_RIGHT) {
        Align::Right
    } else {
        inherited
    }
}

/// ` * ` or ` N. ` for a list item, indented by its list depth.
fn list_item_prefix(doc: &Document, item: NodeId) -> Option<String> {
    let list = doc.parent(item)?;
    let depth = doc
        .ancestors(item)
        .filter(|a| doc.is_tag(*a, "ul") || doc.is_tag(*a, "ol"))
        .count();
    let indent = "   ".repeat(depth.saturating_sub(1));
    if doc.is_tag(list, "ul") {
        return Some(format!("{indent} * "));
    }
    if doc.is_tag(list, "ol") {
        let start: usize = doc
            .attr(list, "start")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);
        let position = doc
            .children(list)
            .iter()
            .take_while(|c| **c != item)
            .filter(|c| doc.is_tag(**c, "li"))
            .count();
        return Some(format!("{indent} {}. ", start + position));
    }
    None
}

enum Step {
    Enter(NodeId),
    Leave,
}

fn render(doc: &Document, root: NodeId, options: Options) -> String {
    let mut out = LineWriter::new(options);
    let mut stack: Vec<Step> = doc.children(root).iter().rev().map(|c| Step::Enter(*c)).collect();

    while let Some(step) = stack.pop() {
        let node = match step {
            Step::Leave => {
                out.end_line();
                out.align.pop();
                continue;
            }
            Step::Enter(node) => node,
        };
        match classify(doc, node) {
            NodeClass::Text => out.push_text(doc.text(node).unwrap_or_default()),
            NodeClass::QuoteDecoration if options.outgoing => {
                out.push_text(&doc.text_content(node));
            }
            NodeClass::QuoteDecoration
            | NodeClass::SelectionMarker(_)
            | NodeClass::Skipped
            | NodeClass::Comment
            | NodeClass::Image => {}
            NodeClass::HardBreak | NodeClass::WrapBreak => {
                if is_placeholder_break(doc, node, root, options.outgoing) {
                    out.open = true;
                } else {
                    out.break_line();
                }
            }
            class if class.is_block() => {
                out.end_line();
                let inherited = out.align.last().copied().unwrap_or(Align::Left);
                out.align.push(block_align(doc, node, inherited));
                if options.outgoing
                    && doc.is_tag(node, "li")
                    && let Some(prefix) = list_item_prefix(doc, node)
                {
                    out.push_text(&prefix);
                }
                stack.push(Step::Leave);
                stack.extend(doc.children(node).iter().rev().map(|c| Step::Enter(*c)));
            }
            _ => stack.extend(doc.children(node).iter().rev().map(|c| Step::Enter(*c))),
        }
    }
    out.finish()
}

/// The text a reader sees under `root`, one line per visual line. Quote
/// decorations, selection markers, images and comments are left out.
pub fn inner_text(doc: &Document, root: NodeId) -> String {
    render(
        doc,
        root,
        Options {
            outgoing: false,
            wrap_length: 0,
        },
    )
}

/// Text for an outgoing plain-text message: quote decorations included,
/// list items prefixed, aligned paragraphs padded to `wrap_length` and
/// non-breaking spaces turned into spaces.
pub fn to_plain_text(doc: &Document, root: NodeId, wrap_length: usize) -> String {
    render(
        doc,
        root,
        Options {
            outgoing: true,
            wrap_length,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::document_from_body;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("<div>a</div><div>b</div>", "a\nb")]
    #[case("<div>a<br>b</div>", "a\nb")]
    #[case("<div>a<br></div><div>b</div>", "a\nb")]
    #[case("<div>a</div><div><br></div><div>b</div>", "a\n\nb")]
    #[case("<div>a<br><br>b</div>", "a\n\nb")]
    #[case("plain <b>bold</b> text", "plain bold text")]
    #[case(r#"<div>a<span id="-x-evo-selection-start-marker"></span><br></div>"#, "a")]
    #[case(r#"<div><img src="x.png">pic</div>"#, "pic")]
    #[case("<div>smile\u{200b}</div>", "smile")]
    fn inner_text_lines(#[case] html: &str, #[case] expected: &str) {
        let doc = document_from_body(html);

        assert_eq!(inner_text(&doc, doc.body()), expected);
    }

    #[test]
    fn inner_text_leaves_out_quote_decorations() {
        let doc = document_from_body(
            r#"<blockquote type="cite"><div><span class="-x-evo-quoted"><span class="-x-evo-quote-character">&gt; </span></span>quoted</div></blockquote>"#,
        );

        assert_eq!(inner_text(&doc, doc.body()), "quoted");
    }

    #[test]
    fn plain_text_keeps_quote_decorations() {
        // Given a quoted, wrapped citation
        let doc = document_from_body(
            r#"<blockquote type="cite" class="-x-evo-plaintext-quoted"><div><span class="-x-evo-quoted"><span class="-x-evo-quote-character">&gt; </span></span>one <br class="-x-evo-wrap-br"><span class="-x-evo-quoted"><span class="-x-evo-quote-character">&gt; </span></span>two</div></blockquote><div>reply&nbsp;&nbsp;here</div>"#,
        );

        // When rendering for sending
        let text = to_plain_text(&doc, doc.body(), 72);

        // Then every quoted line starts with its decoration
        assert_eq!(text, "> one \n> two\nreply  here");
    }

    #[test]
    fn plain_text_prefixes_list_items() {
        let doc = document_from_body(
            "<ul><li>apples</li><li>pears</li></ul><ol start=\"3\"><li>three</li><li>four</li></ol>",
        );

        assert_eq!(
            to_plain_text(&doc, doc.body(), 72),
            " * apples\n * pears\n 3. three\n 4. four"
        );
    }

    #[rstest]
    #[case(ALIGN_CENTER, "   abcd")]
    #[case(ALIGN_RIGHT, "      abcd")]
    fn plain_text_pads_aligned_paragraphs(#[case] class: &str, #[case] expected: &str) {
        let doc = document_from_body(&format!(r#"<div class="{class}">abcd</div>"#));

        assert_eq!(to_plain_text(&doc, doc.body(), 10), expected);
    }
}
