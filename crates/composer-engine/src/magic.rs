//! Automatic links.
//!
//! After a word is finished (space or return), the text just before the
//! caret is matched against a URL or an e-mail pattern and the match is
//! wrapped in an anchor. Typing inside an existing anchor keeps its `href`
//! in sync with its text.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom::classify::{NodeClass, classify, parent_block};
use crate::dom::{Document, NodeId};
use crate::editing::ComposerSession;
use crate::error::DomError;
use crate::selection::{Position, markers, restore_markers, save_markers};
use crate::undo::{HistoryKind, Scope};

static URL_PATTERN: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r#"(?:[A-Za-z][A-Za-z0-9+.-]{2,8}://(?:[-;:&=+$,\w]+@)?[A-Za-z0-9.-]+(?::\d+)?|www\.[A-Za-z0-9.-]+)(?:[/?#][^\s<>"]*)?"#,
    )
});

static EMAIL_PATTERN: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*")
});

/// Characters that end a sentence rather than a link.
const TRAILING_PUNCTUATION: &[char] = &[',', '.', ':', ';', '?', '!', '-', '|', '}', ']', ')', '"'];

fn pattern_for(text: &str) -> Option<&'static Regex> {
    let lock = if text.contains('@') && !text.contains("://") {
        &EMAIL_PATTERN
    } else {
        &URL_PATTERN
    };
    match lock.as_ref() {
        Ok(regex) => Some(regex),
        Err(err) => {
            log::warn!("link pattern unavailable: {err}");
            None
        }
    }
}

/// A link found in text. Offsets are in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMatch {
    pub start: usize,
    pub end: usize,
    pub href: String,
}

/// `href` for link text: `www.` gets `http://`, addresses get `mailto:`.
pub fn href_for(link: &str) -> String {
    if link.starts_with("www.") {
        format!("http://{link}")
    } else if link.contains('@') && !link.contains("://") {
        format!("mailto:{link}")
    } else {
        link.to_string()
    }
}

/// Byte ranges of every link in `text`, trailing punctuation trimmed.
fn trimmed_matches(text: &str) -> Vec<(usize, usize)> {
    let Some(regex) = pattern_for(text) else {
        return Vec::new();
    };
    regex
        .find_iter(text)
        .filter_map(|m| {
            let trimmed = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            (!trimmed.is_empty()).then_some((m.start(), m.start() + trimmed.len()))
        })
        .collect()
}

/// The last link in `text`.
pub fn find_link(text: &str) -> Option<LinkMatch> {
    let (start, end) = trimmed_matches(text).pop()?;
    Some(LinkMatch {
        start: text[..start].chars().count(),
        end: text[..end].chars().count(),
        href: href_for(&text[start..end]),
    })
}

fn create_anchor(doc: &mut Document, href: &str, text: &str) -> Result<NodeId, DomError> {
    let anchor = doc.create_element_with("a", &[("href", href)]);
    let content = doc.create_text(text);
    doc.append_child(anchor, content)?;
    Ok(anchor)
}

/// Detached nodes for `text` with every link in it wrapped in an anchor.
pub fn linkify_text(doc: &mut Document, text: &str) -> Result<Vec<NodeId>, DomError> {
    let mut nodes = Vec::new();
    let mut pending = String::new();

    for piece in text.split_inclusive(char::is_whitespace) {
        let word = piece.trim_end();
        match trimmed_matches(word).first() {
            Some(&(start, end)) => {
                pending.push_str(&word[..start]);
                if !pending.is_empty() {
                    nodes.push(doc.create_text(std::mem::take(&mut pending)));
                }
                let link = &word[start..end];
                nodes.push(create_anchor(doc, &href_for(link), link)?);
                pending.push_str(&word[end..]);
            }
            None => pending.push_str(word),
        }
        pending.push_str(&piece[word.len()..]);
    }
    if !pending.is_empty() {
        nodes.push(doc.create_text(pending));
    }
    Ok(nodes)
}

/// Last text node under `node` that is not inside an anchor.
fn last_plain_text(doc: &Document, node: NodeId) -> Option<NodeId> {
    let texts: Vec<NodeId> = doc
        .descendants(node)
        .filter(|n| doc.is_text(*n))
        .collect();
    texts.into_iter().rev().find(|t| {
        !doc.ancestors(*t)
            .take_while(|a| *a != node)
            .any(|a| matches!(classify(doc, a), NodeClass::Anchor | NodeClass::QuoteDecoration))
    })
}

/// The text node and offset the link check scans up to.
fn link_target(session: &ComposerSession, caret: Position) -> Option<(NodeId, usize)> {
    let doc = &session.doc;
    if session.flags.return_pressed {
        let block = parent_block(doc, caret.node)?;
        let previous = doc.previous_sibling(block)?;
        let text = last_plain_text(doc, previous)?;
        return Some((text, doc.text_len(text)));
    }
    if doc.is_text(caret.node) {
        return Some((caret.node, caret.offset));
    }
    let before = doc.children(caret.node).get(caret.offset.checked_sub(1)?).copied()?;
    doc.is_text(before).then(|| (before, doc.text_len(before)))
}

fn enclosing_anchor(doc: &Document, node: NodeId) -> Option<NodeId> {
    doc.ancestors(node)
        .take_while(|a| *a != doc.body())
        .find(|a| classify(doc, *a) == NodeClass::Anchor)
}

/// Turn the URL or address just before the caret into a link. With
/// `include_space` the check runs after a typed space; inside an existing
/// link it moves the space out of the anchor instead.
pub fn check_magic_links(session: &mut ComposerSession, include_space: bool) -> bool {
    if !session.settings.magic_links {
        return false;
    }
    let Some(range) = session.selection.range().filter(|r| r.is_collapsed()) else {
        return false;
    };
    let Some((target, end)) = link_target(session, range.start) else {
        return false;
    };

    if let Some(anchor) = enclosing_anchor(&session.doc, target) {
        return update_link(session, anchor, include_space);
    }
    // Mid-word typing only edits existing links
    if !include_space && !session.flags.return_pressed {
        return false;
    }

    let text: String = session
        .doc
        .text(target)
        .unwrap_or_default()
        .chars()
        .take(end)
        .collect();
    let Some(link) = find_link(&text) else {
        return false;
    };
    if !text
        .chars()
        .skip(link.end)
        .all(|c| c.is_whitespace() || TRAILING_PUNCTUATION.contains(&c))
    {
        return false;
    }

    session.with_history(HistoryKind::MagicLink, Scope::Body, |s| {
        save_markers(&mut s.doc, &mut s.selection);
        if let Err(err) = wrap_in_anchor(&mut s.doc, target, &link) {
            log::warn!("failed to create link: {err}");
        }
        restore_markers(&mut s.doc, &mut s.selection);
    });
    true
}

fn wrap_in_anchor(doc: &mut Document, text: NodeId, link: &LinkMatch) -> Result<(), DomError> {
    if link.end < doc.text_len(text) {
        doc.split_text(text, link.end)?;
    }
    let content = doc.split_text(text, link.start)?;
    let anchor = doc.create_element_with("a", &[("href", link.href.as_str())]);
    doc.insert_after(text, anchor)?;
    doc.append_child(anchor, content)?;
    if doc.text_len(text) == 0 {
        doc.remove(text);
    }
    Ok(())
}

/// Keep an edited link consistent with its text.
fn update_link(session: &mut ComposerSession, anchor: NodeId, include_space: bool) -> bool {
    let text = session.doc.text_content(anchor);

    if include_space && text.ends_with(char::is_whitespace) {
        session.with_history(HistoryKind::MagicLink, Scope::Body, |s| {
            save_markers(&mut s.doc, &mut s.selection);
            if let Err(err) = move_trailing_whitespace_out(&mut s.doc, anchor) {
                log::warn!("failed to move whitespace out of link: {err}");
            }
            restore_markers(&mut s.doc, &mut s.selection);
        });
        return true;
    }

    let Some(href) = session.doc.attr(anchor, "href").map(str::to_string) else {
        return false;
    };
    let bare = href
        .strip_prefix("mailto:")
        .or_else(|| {
            (!text.starts_with("http://"))
                .then(|| href.strip_prefix("http://"))
                .flatten()
        })
        .unwrap_or(&href);
    let prefix = &href[..href.len() - bare.len()];

    let (longer, shorter) = if text.len() > bare.len() {
        (text.as_str(), bare)
    } else {
        (bare, text.as_str())
    };
    let edited = longer.chars().count() == shorter.chars().count() + 1 && longer.starts_with(shorter);
    if !edited {
        return false;
    }

    let new_href = if prefix.is_empty() {
        href_for(&text)
    } else {
        format!("{prefix}{text}")
    };
    session.doc.set_attr(anchor, "href", &new_href);
    true
}

/// Move whitespace at the end of the anchor's text, and any selection
/// markers after it, to just behind the anchor.
fn move_trailing_whitespace_out(doc: &mut Document, anchor: NodeId) -> Result<(), DomError> {
    let Some(last) = doc.descendants(anchor).filter(|n| doc.is_text(*n)).last() else {
        return Ok(());
    };
    let content = doc.text(last).unwrap_or_default();
    let kept = content.trim_end().chars().count();
    let tail = doc.split_text(last, kept)?;
    doc.insert_after(anchor, tail)?;

    if let Some((start, end)) = markers(doc)
        && doc.contains(anchor, start)
    {
        doc.insert_after(tail, end)?;
        doc.insert_after(tail, start)?;
    }
    if doc.text_len(last) == 0 {
        doc.remove(last);
    }
    Ok(())
}
