//! Rebuilding paragraphs from plain text.
//!
//! The text comes from [`inner_text`](super::plain_text::inner_text) of a
//! subtree whose citations were surrounded with sentinels, or from a
//! received plain-text message. Every line becomes a paragraph; the
//! sentinels open and close citations around them.

use std::sync::LazyLock;

use composer_config::Settings;
use regex::{Captures, Regex};

use crate::citation::{CITATION_END, CITATION_START, citation_level};
use crate::dom::classify::is_citation;
use crate::dom::{Document, NodeId};
use crate::error::DomError;
use crate::magic::linkify_text;
use crate::wrap::{create_paragraph, get_decoded_line_length};

const NBSP: &str = "\u{a0}";
const ZWSP: char = '\u{200b}';

/// Class of the span a tab character is kept in.
pub const TAB_SPAN: &str = "Apple-tab-span";

/// Lines starting with one of these are never joined with their neighbours.
const NEVER_JOINED: &[char] = &[' ', '+', '-', '@', '*', '=', '\t', ';', '#'];

/// A run of two or more blanks, or a single one opening the line.
static PROTECTED_SPACES: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}|^[ \t]"));

/// `> ` quote prefixes of received plain text.
pub struct QuotePrefix;

impl QuotePrefix {
    pub const PREFIX: char = '>';

    /// Strips quote prefixes from a line, returning (depth, byte_offset).
    ///
    /// Handles `> text`, `>> nested` and `> > spaced nested`. A line that is
    /// not quoted returns `(0, 0)` so its leading spaces survive.
    pub fn strip_prefixes(s: &str) -> (usize, usize) {
        let b = s.as_bytes();
        let mut i = 0usize;
        let mut depth = 0usize;

        loop {
            let mut j = i;
            while j < b.len() && b[j] == b' ' {
                j += 1;
            }
            if j < b.len() && b[j] == (Self::PREFIX as u8) {
                depth += 1;
                i = j + 1;
                if i < b.len() && b[i] == b' ' {
                    i += 1;
                }
            } else {
                break;
            }
        }
        if depth == 0 { (0, 0) } else { (depth, i) }
    }
}

/// Rewrite `> ` quoted lines as sentinel-delimited citations. Sentinels
/// get lines of their own so quoted empty lines are kept.
pub fn sentinels_from_quote_prefixes(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut depth = 0usize;

    for line in text.split('\n') {
        let (level, offset) = QuotePrefix::strip_prefixes(line);
        if level != depth {
            let sentinels = if level > depth {
                CITATION_START.repeat(level - depth)
            } else {
                CITATION_END.repeat(depth - level)
            };
            lines.push(sentinels);
            depth = level;
        }
        lines.push(line[offset..].to_string());
    }
    if depth > 0 {
        lines.push(CITATION_END.repeat(depth));
    }
    lines.join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sentinel {
    Start,
    End,
}

/// Earliest sentinel in `text` with its byte position.
fn next_sentinel(text: &str) -> Option<(usize, Sentinel, usize)> {
    let start = text
        .find(CITATION_START)
        .map(|at| (at, Sentinel::Start, CITATION_START.len()));
    let end = text
        .find(CITATION_END)
        .map(|at| (at, Sentinel::End, CITATION_END.len()));
    match (start, end) {
        (Some(s), Some(e)) => Some(if s.0 <= e.0 { s } else { e }),
        (s, e) => s.or(e),
    }
}

fn protect_spaces(line: &str) -> String {
    match PROTECTED_SPACES.as_ref() {
        Ok(regex) => regex
            .replace_all(line, |caps: &Captures| caps[0].replace(' ', NBSP))
            .into_owned(),
        Err(err) => {
            log::warn!("space pattern unavailable: {err}");
            line.to_string()
        }
    }
}

struct ParagraphBuilder<'a> {
    doc: &'a mut Document,
    settings: &'a Settings,
    /// Containers being filled; the first is the target element
    stack: Vec<NodeId>,
    base_level: usize,
    /// Paragraph still accepting joined lines
    open: Option<NodeId>,
}

impl ParagraphBuilder<'_> {
    fn top(&self) -> NodeId {
        self.stack[self.stack.len() - 1]
    }

    fn level(&self) -> usize {
        self.base_level + self.stack.len() - 1
    }

    fn close(&mut self) {
        self.open = None;
    }

    fn line(&mut self, raw: &str, next: Option<&str>) -> Result<(), DomError> {
        let mut rest = raw.strip_suffix('\r').unwrap_or(raw);
        let mut had_sentinel = false;

        while let Some((at, sentinel, len)) = next_sentinel(rest) {
            if at > 0 {
                self.text_line(&rest[..at], None)?;
            }
            self.close();
            match sentinel {
                Sentinel::Start => {
                    let citation = self.doc.create_element_with("blockquote", &[("type", "cite")]);
                    self.doc.append_child(self.top(), citation)?;
                    self.stack.push(citation);
                }
                Sentinel::End => {
                    if self.stack.len() > 1 {
                        self.stack.pop();
                    } else {
                        log::debug!("unbalanced citation end in text");
                    }
                }
            }
            rest = &rest[at + len..];
            had_sentinel = true;
        }

        if had_sentinel && rest.is_empty() {
            return Ok(());
        }
        self.text_line(rest, next)
    }

    fn text_line(&mut self, line: &str, next: Option<&str>) -> Result<(), DomError> {
        if line.chars().all(|c| c == ZWSP) {
            self.close();
            let paragraph = create_paragraph(self.doc, self.settings, self.level());
            let br = self.doc.create_element("br");
            self.doc.append_child(paragraph, br)?;
            return self.doc.append_child(self.top(), paragraph);
        }

        let joinable = self.settings.paragraphs.preserve_blocks && !line.starts_with(NEVER_JOINED);
        let paragraph = match self.open.filter(|_| joinable) {
            Some(open) => {
                let space = self.doc.create_text(" ");
                self.doc.append_child(open, space)?;
                open
            }
            None => {
                let paragraph = create_paragraph(self.doc, self.settings, self.level());
                self.doc.append_child(self.top(), paragraph)?;
                paragraph
            }
        };
        self.fill(paragraph, line)?;
        self.doc.normalize(paragraph);

        self.open = joinable.then_some(paragraph);
        if joinable && self.ends_paragraph(line, next) {
            self.close();
        }
        Ok(())
    }

    /// Whether a line closes its paragraph: it is longer than a line gets,
    /// or it is short although the next word would still have fit.
    fn ends_paragraph(&self, line: &str, next: Option<&str>) -> bool {
        let thresholds = &self.settings.paragraphs;
        let length = get_decoded_line_length(line);
        if length > thresholds.long_line_threshold {
            return true;
        }
        if length >= thresholds.short_line_threshold {
            return false;
        }
        let next_word = next
            .filter(|n| next_sentinel(n).is_none())
            .and_then(|n| n.split_whitespace().next());
        match next_word {
            Some(word) => length + word.chars().count() < thresholds.long_line_threshold,
            None => true,
        }
    }

    fn fill(&mut self, paragraph: NodeId, line: &str) -> Result<(), DomError> {
        let protected = protect_spaces(line);
        for (index, segment) in protected.split('\t').enumerate() {
            if index > 0 {
                let tab = self.doc.create_element_with(
                    "span",
                    &[("class", TAB_SPAN), ("style", "white-space:pre")],
                );
                let content = self.doc.create_text("\t");
                self.doc.append_child(tab, content)?;
                self.doc.append_child(paragraph, tab)?;
            }
            if segment.is_empty() {
                continue;
            }
            for node in linkify_text(self.doc, segment)? {
                self.doc.append_child(paragraph, node)?;
            }
        }
        Ok(())
    }
}

/// Append paragraphs built from `text` to `parent`, one per line, with
/// citations re-created from sentinels. With `preserve_blocks` set, lines
/// that look like a wrapped paragraph are joined back together.
pub fn parse_text_into_paragraphs(
    doc: &mut Document,
    parent: NodeId,
    text: &str,
    settings: &Settings,
) -> Result<(), DomError> {
    let base_level = citation_level(doc, parent) + usize::from(is_citation(doc, parent));
    let lines: Vec<&str> = text.split('\n').collect();
    log::debug!("parsing {} lines into paragraphs", lines.len());

    let mut builder = ParagraphBuilder {
        doc,
        settings,
        stack: vec![parent],
        base_level,
        open: None,
    };
    for (index, line) in lines.iter().enumerate() {
        builder.line(line, lines.get(index + 1).copied())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::body_html;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn html_settings() -> Settings {
        Settings::default()
    }

    fn parsed(text: &str, settings: &Settings) -> String {
        let mut doc = Document::new();
        let body = doc.body();
        parse_text_into_paragraphs(&mut doc, body, text, settings).unwrap();
        body_html(&doc)
    }

    #[test]
    fn every_line_is_a_paragraph() {
        assert_eq!(
            parsed("one\n\ntwo", &html_settings()),
            r#"<div class="-x-evo-paragraph">one</div><div class="-x-evo-paragraph"><br></div><div class="-x-evo-paragraph">two</div>"#
        );
    }

    #[test]
    fn sentinels_become_citations() {
        // Given text with a nested citation
        let text = format!("intro\n{CITATION_START}\nouter\n{CITATION_START}inner{CITATION_END}\n{CITATION_END}\nreply");

        // When parsing it
        let html = parsed(&text, &html_settings());

        // Then the citations are nested blockquotes
        assert_eq!(
            html,
            r#"<div class="-x-evo-paragraph">intro</div><blockquote type="cite"><div class="-x-evo-paragraph">outer</div><blockquote type="cite"><div class="-x-evo-paragraph">inner</div></blockquote></blockquote><div class="-x-evo-paragraph">reply</div>"#
        );
    }

    #[test]
    fn plain_mode_paragraphs_get_width_for_their_level() {
        let settings = Settings::plain_text();
        let text = format!("{CITATION_START}\nquoted\n{CITATION_END}");

        let html = parsed(&text, &settings);

        assert_eq!(
            html,
            r#"<blockquote type="cite"><div class="-x-evo-paragraph" style="width: 70ch; word-wrap: normal;">quoted</div></blockquote>"#
        );
    }

    #[test]
    fn spaces_and_tabs_are_protected() {
        let html = parsed("  indented\tx", &html_settings());

        assert_eq!(
            html,
            "<div class=\"-x-evo-paragraph\">\u{a0}\u{a0}indented<span class=\"Apple-tab-span\" style=\"white-space:pre\">\t</span>x</div>"
        );
    }

    #[test]
    fn links_are_created() {
        let html = parsed("see www.example.com now", &html_settings());

        assert_eq!(
            html,
            r#"<div class="-x-evo-paragraph">see <a href="http://www.example.com">www.example.com</a> now</div>"#
        );
    }

    #[test]
    fn wrapped_lines_are_joined_when_preserving_blocks() {
        // Given a paragraph wrapped at 72 columns followed by a list
        let mut settings = html_settings();
        settings.paragraphs.preserve_blocks = true;
        let first = "This line was long enough that the sender's client had to wrap it";
        let text = format!("{first}\nhere.\n- item one\n- item two");

        // When parsing with block preservation
        let mut doc = Document::new();
        let body = doc.body();
        parse_text_into_paragraphs(&mut doc, body, &text, &settings).unwrap();

        // Then the wrapped lines form one paragraph and list lines stay apart
        let texts: Vec<String> = doc
            .children(body)
            .iter()
            .map(|p| doc.text_content(*p))
            .collect();
        assert_eq!(texts, vec![format!("{first} here."), "- item one".into(), "- item two".into()]);
    }

    #[rstest]
    #[case("hello", (0, 0))]
    #[case("  hello", (0, 0))]
    #[case("> hello", (1, 2))]
    #[case("> > hello", (2, 4))]
    #[case(">> hello", (2, 3))]
    fn quote_prefixes(#[case] line: &str, #[case] expected: (usize, usize)) {
        assert_eq!(QuotePrefix::strip_prefixes(line), expected);
    }

    #[test]
    fn quoted_lines_become_sentinels() {
        let text = sentinels_from_quote_prefixes("On Monday:\n> hi\n>\n>> deep\nthanks");

        assert_eq!(
            text,
            format!("On Monday:\n{CITATION_START}\nhi\n\n{CITATION_START}\ndeep\n{CITATION_END}{CITATION_END}\nthanks")
        );
    }
}
