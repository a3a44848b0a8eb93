//! Emoticons: recognition of typed text faces and insertion of smiley
//! glyphs.
//!
//! Recognition runs a small table-driven automaton backwards from the caret.
//! Insertion produces either a Unicode glyph or, when an image is available,
//! a wrapper holding both the image and the text face; the composer mode
//! decides which of the two is shown.

pub mod loader;

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::dom::classify::{SMILEY_IMG, SMILEY_PENDING, SMILEY_TEXT, SMILEY_WRAPPER};
use crate::dom::{Document, NodeId};
use crate::editing::ComposerSession;
use crate::error::{AssetError, DomError};
use crate::selection::{markers, restore_markers, save_markers};
use crate::undo::{HistoryKind, Scope};

pub use loader::{
    EmoticonResolver, LoadResult, LoadedImage, PendingLoad, SmileyLoads, ThemeDirResolver,
};

#[derive(Debug, PartialEq, Eq)]
pub struct Emoticon {
    /// Icon name, e.g. `face-smile`
    pub name: &'static str,
    pub text_face: &'static str,
    pub unicode: &'static str,
}

const fn emoticon(name: &'static str, text_face: &'static str, unicode: &'static str) -> Emoticon {
    Emoticon {
        name,
        text_face,
        unicode,
    }
}

/// Every known emoticon. The automaton result indexes this table.
pub static EMOTICONS: [Emoticon; 21] = [
    emoticon("face-angel", "O:-)", "\u{1F607}"),
    emoticon("face-angry", "X-(", "\u{1F620}"),
    emoticon("face-cool", "B-)", "\u{1F60E}"),
    emoticon("face-crying", ":'(", "\u{1F622}"),
    emoticon("face-devilish", ">:-)", "\u{1F608}"),
    emoticon("face-embarrassed", ":\"-)", "\u{1F633}"),
    emoticon("face-kiss", ":-*", "\u{1F618}"),
    emoticon("face-laugh", ":-))", "\u{1F602}"),
    emoticon("face-monkey", ":-(|)", "\u{1F435}"),
    emoticon("face-plain", ":-|", "\u{1F610}"),
    emoticon("face-raspberry", ":-P", "\u{1F61B}"),
    emoticon("face-sad", ":-(", "\u{2639}"),
    emoticon("face-sick", ":-Q", "\u{1F637}"),
    emoticon("face-smile", ":-)", "\u{263A}"),
    emoticon("face-smile-big", ":-D", "\u{1F603}"),
    emoticon("face-smirk", ":-!", "\u{1F60F}"),
    emoticon("face-surprise", ":-O", "\u{1F632}"),
    emoticon("face-tired", "|-)", "\u{1F62B}"),
    emoticon("face-uncertain", ":-/", "\u{1F615}"),
    emoticon("face-wink", ";-)", "\u{1F609}"),
    emoticon("face-worried", ":-S", "\u{1F61F}"),
];

pub fn lookup_emoticon(name: &str) -> Option<&'static Emoticon> {
    EMOTICONS.iter().find(|e| e.name == name)
}

// Transition table read right to left. Each state lists the characters it
// accepts, terminated by 0; the same index in STATES is the next state, 0
// for no match and -n for the n-th emoticon.
const CHARS: &[u8; 80] = b"DO)(|/PQ*!\
S\0:-\0:\0:-\0\
:\0:;=-\"\0:;\
B\"|\0:-'\0:X\
\0:\0:-\0:\0:-\
\0:\0:-\0:\0:-\
\0:\0:\0:-\0:\0\
:-\0:\0:-\0:\0";

#[rustfmt::skip]
const STATES: [i32; 80] = [
     12,  17,  22,  34,  43,  48,  53,  58,  65,  70,
     75,   0, -15,  15,   0, -15,   0, -17,  20,   0,
    -17,   0, -14, -20, -14,  28,  63,   0, -14, -20,
     -3,  63, -18,   0, -12,  38,  41,   0, -12,  -2,
      0,  -4,   0, -10,  46,   0, -10,   0, -19,  51,
      0, -19,   0, -11,  56,   0, -11,   0, -13,  61,
      0, -13,   0,  -6,   0,  68,  -7,   0,  -7,   0,
    -16,  73,   0, -16,   0, -21,  78,   0, -21,   0,
];

/// A text face found right before the caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmileyMatch {
    pub emoticon: &'static Emoticon,
    /// Character offset where the face starts
    pub start: usize,
    /// The characters as typed, e.g. `:)` for `face-smile`
    pub written: String,
}

/// Recognize a text face at the end of `text`. The face must start the
/// text or follow whitespace.
pub fn detect_smiley(text: &str) -> Option<SmileyMatch> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = chars.len().checked_sub(1)?;
    let mut state: i32 = 0;

    loop {
        let c = chars[pos];
        let mut relative = 0usize;
        let base = usize::try_from(state).ok()?;
        while CHARS[base + relative] != 0 {
            if c.is_ascii() && CHARS[base + relative] == c as u8 {
                break;
            }
            relative += 1;
        }
        state = STATES[base + relative];
        if state <= 0 || pos == 0 {
            break;
        }
        pos -= 1;
    }

    // Angel and devilish share their tail with the plain smile
    if pos > 0 && state == -14 {
        match chars[pos - 1] {
            'O' => {
                state = -1;
                pos -= 1;
            }
            '>' => {
                state = -5;
                pos -= 1;
            }
            _ => {}
        }
    }

    if state >= 0 {
        return None;
    }
    if pos > 0 && !chars[pos - 1].is_whitespace() {
        return None;
    }
    let index = usize::try_from(-state - 1).ok()?;
    Some(SmileyMatch {
        emoticon: EMOTICONS.get(index)?,
        start: pos,
        written: chars[pos..].iter().collect(),
    })
}

/// Replace a text face typed just before the caret with its smiley.
pub fn check_magic_smileys(session: &mut ComposerSession) -> bool {
    if !session.settings.magic_smileys {
        return false;
    }
    let Some(range) = session.selection.range().filter(|r| r.is_collapsed()) else {
        return false;
    };
    let Some(text) = session.doc.text(range.start.node) else {
        return false;
    };
    let before: String = text.chars().take(range.start.offset).collect();
    let Some(found) = detect_smiley(&before) else {
        return false;
    };

    log::debug!("recognized {} as {}", found.written, found.emoticon.name);
    insert_smiley(session, found.emoticon, Some(found.written));
    true
}

/// Insert the emoticon called `name` at the caret.
pub fn insert_smiley_by_name(session: &mut ComposerSession, name: &str) -> Result<(), AssetError> {
    let emoticon = lookup_emoticon(name).ok_or_else(|| AssetError::UnknownEmoticon(name.into()))?;
    insert_smiley(session, emoticon, None);
    Ok(())
}

/// Insert `emoticon` at the caret. `written` is the typed text face right
/// before the caret that the smiley replaces.
///
/// The spot is first marked with an anchor span. Unicode and text-only
/// smileys replace it at once; image smileys replace it when their image
/// arrives, see [`poll_pending_loads`].
pub fn insert_smiley(
    session: &mut ComposerSession,
    emoticon: &'static Emoticon,
    written: Option<String>,
) {
    let written = written.unwrap_or_default();
    session.with_history(HistoryKind::Smiley, Scope::Body, |s| {
        let Some(anchor) = mark_anchor(s, &written) else {
            return;
        };

        let receiver = if s.settings.unicode_smileys {
            None
        } else {
            start_load(s, emoticon)
        };
        match receiver {
            Some(receiver) => {
                let sequence = s.history.upcoming_sequence();
                s.smileys
                    .push(PendingLoad::new(emoticon, anchor, written, sequence, receiver));
            }
            None => {
                let smiley = if s.settings.unicode_smileys {
                    build_unicode_smiley(&mut s.doc, emoticon)
                } else {
                    log::debug!("no image for {}, inserting its text face", emoticon.name);
                    build_smiley_wrapper(&mut s.doc, emoticon, None, s.settings.html_mode)
                };
                match smiley {
                    Ok(smiley) => {
                        replace_anchor(s, &anchor, smiley);
                    }
                    Err(err) => {
                        log::warn!("failed to build smiley: {err}");
                        drop_anchor(s, &anchor);
                    }
                }
            }
        }
        poll_pending_loads(s);
    });
}

fn start_load(
    session: &ComposerSession,
    emoticon: &Emoticon,
) -> Option<oneshot::Receiver<LoadResult>> {
    let resolver = session.smileys.resolver()?;
    let uri = resolver.image_uri(emoticon)?;
    Some(resolver.load(&uri))
}

/// Insert every smiley whose image finished loading. Returns how many were
/// inserted. A failed load leaves its text face as typed.
pub fn poll_pending_loads(session: &mut ComposerSession) -> usize {
    let mut inserted = 0;
    for mut load in session.smileys.take_pending() {
        match load.receiver.try_recv() {
            Ok(Ok(image)) => {
                if insert_loaded(session, &load, &image) {
                    inserted += 1;
                }
            }
            Ok(Err(err)) => {
                log::warn!("smiley {} not inserted: {err}", load.emoticon.name);
                drop_anchor(session, &load.anchor);
            }
            Err(TryRecvError::Empty) => session.smileys.push(load),
            Err(TryRecvError::Closed) => {
                log::warn!("image load for {} was abandoned", load.emoticon.name);
                drop_anchor(session, &load.anchor);
            }
        }
    }
    inserted
}

fn insert_loaded(session: &mut ComposerSession, load: &PendingLoad, image: &LoadedImage) -> bool {
    let Some(anchor) = session.doc.get_element_by_id(&load.anchor) else {
        log::debug!("anchor of {} is gone, smiley dropped", load.emoticon.name);
        return false;
    };
    if session.doc.text_content(anchor) != load.written {
        log::debug!("text face of {} was edited, smiley dropped", load.emoticon.name);
        drop_anchor(session, &load.anchor);
        return false;
    }
    let html_mode = session.settings.html_mode;
    let wrapper = match build_smiley_wrapper(&mut session.doc, load.emoticon, Some(image), html_mode)
    {
        Ok(wrapper) => wrapper,
        Err(err) => {
            log::warn!("failed to build smiley: {err}");
            drop_anchor(session, &load.anchor);
            return false;
        }
    };

    // Nothing was recorded since the anchor went in: undo both together
    let history = &mut session.history;
    if !history.is_recording()
        && load.sequence.is_some()
        && history.current_event().map(|e| e.sequence) == load.sequence
    {
        history.insert_and();
    }
    replace_anchor(session, &load.anchor, wrapper)
}

/// Wrap the text face `written` just before the caret in an anchor span,
/// or put an empty anchor at the caret when `written` is empty. Returns the
/// anchor's element id.
fn mark_anchor(session: &mut ComposerSession, written: &str) -> Option<String> {
    if !save_markers(&mut session.doc, &mut session.selection) {
        log::warn!("no caret to insert a smiley at");
        return None;
    }
    let anchor = place_anchor(session, written);
    restore_markers(&mut session.doc, &mut session.selection);
    match anchor {
        Ok(anchor) => anchor,
        Err(err) => {
            log::warn!("failed to mark the smiley position: {err}");
            None
        }
    }
}

fn place_anchor(session: &mut ComposerSession, written: &str) -> Result<Option<String>, DomError> {
    let doc = &mut session.doc;
    let Some((start, _)) = markers(doc) else {
        return Ok(None);
    };
    let parent = doc.parent(start).ok_or(DomError::Detached(start))?;

    let face = if written.is_empty() {
        None
    } else {
        let Some(previous) = doc
            .previous_sibling(start)
            .filter(|p| doc.text(*p).is_some_and(|t| t.ends_with(written)))
        else {
            log::debug!("text face {written} is no longer before the caret");
            return Ok(None);
        };
        let offset = doc.text_len(previous) - written.chars().count();
        Some(if offset == 0 {
            previous
        } else {
            doc.split_text(previous, offset)?
        })
    };

    let id = session.smileys.next_anchor_id();
    let doc = &mut session.doc;
    let span = doc.create_element_with("span", &[("id", id.as_str()), ("class", SMILEY_PENDING)]);
    doc.insert_before(parent, span, Some(start))?;
    if let Some(face) = face {
        doc.append_child(span, face)?;
    }
    Ok(Some(id))
}

/// Put `smiley` and a zero-width space where the anchor span is. The caret
/// keeps its place; when it was inside the anchor it ends up after the
/// smiley.
fn replace_anchor(session: &mut ComposerSession, anchor: &str, smiley: NodeId) -> bool {
    session.with_history(HistoryKind::Smiley, Scope::Body, |s| {
        let saved = save_markers(&mut s.doc, &mut s.selection);
        let replaced = swap_in_smiley(&mut s.doc, anchor, smiley);
        if saved {
            restore_markers(&mut s.doc, &mut s.selection);
        }
        match replaced {
            Ok(()) => true,
            Err(err) => {
                log::warn!("failed to insert smiley: {err}");
                false
            }
        }
    })
}

fn swap_in_smiley(doc: &mut Document, anchor: &str, smiley: NodeId) -> Result<(), DomError> {
    let span = doc
        .get_element_by_id(anchor)
        .ok_or_else(|| DomError::NoSuchElement(anchor.to_string()))?;
    let parent = doc.parent(span).ok_or(DomError::Detached(span))?;
    if let Some((start, end)) = markers(doc) {
        for marker in [end, start] {
            if doc.contains(span, marker) {
                doc.insert_after(span, marker)?;
            }
        }
    }
    let zero_width_space = doc.create_text("\u{200b}");
    doc.insert_before(parent, smiley, Some(span))?;
    doc.insert_before(parent, zero_width_space, Some(span))?;
    doc.remove(span);
    Ok(())
}

/// Unwrap the anchor span, leaving whatever it holds as plain text.
fn drop_anchor(session: &mut ComposerSession, anchor: &str) {
    let Some(span) = session.doc.get_element_by_id(anchor) else {
        return;
    };
    let saved = save_markers(&mut session.doc, &mut session.selection);
    if let Err(err) = session.doc.unwrap(span) {
        log::warn!("failed to remove smiley anchor: {err}");
    }
    if saved {
        restore_markers(&mut session.doc, &mut session.selection);
    }
}

fn build_unicode_smiley(doc: &mut Document, emoticon: &Emoticon) -> Result<NodeId, DomError> {
    let span = doc.create_element("span");
    let glyph = doc.create_text(emoticon.unicode);
    doc.append_child(span, glyph)?;
    Ok(span)
}

/// Build the smiley wrapper: an optional image plus the text face, with the
/// one the current mode hides set to `display: none`.
fn build_smiley_wrapper(
    doc: &mut Document,
    emoticon: &Emoticon,
    image: Option<&LoadedImage>,
    html_mode: bool,
) -> Result<NodeId, DomError> {
    let wrapper = doc.create_element_with("span", &[("class", SMILEY_WRAPPER)]);

    if let Some(image) = image {
        let img = doc.create_element_with(
            "img",
            &[
                ("src", image.uri.as_str()),
                ("data-inline", ""),
                ("data-name", emoticon.name),
                ("alt", emoticon.text_face),
                ("class", SMILEY_IMG),
            ],
        );
        if !html_mode {
            doc.set_attr(img, "style", "display: none;");
        }
        doc.append_child(wrapper, img)?;
    }

    let text = doc.create_element_with("span", &[("class", SMILEY_TEXT)]);
    if html_mode && image.is_some() {
        doc.set_attr(text, "style", "display: none;");
    }
    let face = doc.create_text(emoticon.text_face);
    doc.append_child(text, face)?;
    doc.append_child(wrapper, text)?;
    Ok(wrapper)
}

/// Show smiley images in HTML mode and their text faces in plain-text mode.
pub fn toggle_smileys(doc: &mut Document, html_mode: bool) {
    let body = doc.body();
    for wrapper in doc.elements_with_class(body, SMILEY_WRAPPER) {
        let has_image = !doc.elements_with_class(wrapper, SMILEY_IMG).is_empty();
        for img in doc.elements_with_class(wrapper, SMILEY_IMG) {
            if html_mode {
                doc.remove_attr(img, "style");
            } else {
                doc.set_attr(img, "style", "display: none;");
            }
        }
        for text in doc.elements_with_class(wrapper, SMILEY_TEXT) {
            if html_mode && has_image {
                doc.set_attr(text, "style", "display: none;");
            } else {
                doc.remove_attr(text, "style");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::Cmd;
    use crate::selection::Position;
    use composer_config::Settings;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Resolver whose loads finish only when the test says so.
    #[derive(Clone, Default)]
    struct HeldResolver {
        senders: Rc<RefCell<Vec<(String, oneshot::Sender<LoadResult>)>>>,
    }

    impl HeldResolver {
        fn take_sender(&self, name: &str) -> (String, oneshot::Sender<LoadResult>) {
            let mut senders = self.senders.borrow_mut();
            let index = senders
                .iter()
                .position(|(uri, _)| uri.contains(name))
                .unwrap();
            senders.remove(index)
        }

        fn complete(&self, name: &str) {
            let (uri, sender) = self.take_sender(name);
            sender
                .send(Ok(LoadedImage {
                    uri,
                    mime_type: "image/png".to_string(),
                }))
                .unwrap();
        }

        fn fail(&self, name: &str) {
            let (uri, sender) = self.take_sender(name);
            sender
                .send(Err(AssetError::LoadFailed {
                    uri,
                    reason: "broken".to_string(),
                }))
                .unwrap();
        }

        fn abandon(&self, name: &str) {
            drop(self.take_sender(name));
        }
    }

    impl EmoticonResolver for HeldResolver {
        fn image_uri(&self, emoticon: &Emoticon) -> Option<String> {
            Some(format!("file:///theme/{}.png", emoticon.name))
        }

        fn load(&self, uri: &str) -> oneshot::Receiver<LoadResult> {
            let (sender, receiver) = oneshot::channel();
            self.senders.borrow_mut().push((uri.to_string(), sender));
            receiver
        }
    }

    fn smiley_session() -> (ComposerSession, HeldResolver) {
        let mut session = ComposerSession::new(Settings {
            magic_smileys: true,
            ..Settings::default()
        });
        let resolver = HeldResolver::default();
        session.set_emoticon_resolver(Box::new(resolver.clone()));
        (session, resolver)
    }

    fn type_text(session: &mut ComposerSession, text: &str) {
        session.apply(Cmd::InsertText {
            text: text.to_string(),
        });
    }

    fn image_smiley(name: &str, face: &str) -> String {
        format!(
            r#"<span class="-x-evo-smiley-wrapper"><img src="file:///theme/{name}.png" data-inline data-name="{name}" alt="{face}" class="-x-evo-smiley-img"><span class="-x-evo-smiley-text" style="display: none;">{face}</span></span>"#
        )
    }

    fn paragraph(content: &str) -> String {
        format!(r#"<div class="-x-evo-paragraph">{content}</div>"#)
    }

    #[test]
    fn late_image_replaces_the_face_where_it_was_typed() {
        // Given a typed face whose image is still loading
        let (mut session, resolver) = smiley_session();
        type_text(&mut session, ":-)");
        assert_eq!(
            session.body_html(),
            paragraph(r#"<span id="-x-evo-smiley-pending-1" class="-x-evo-smiley-pending">:-)</span>"#)
        );

        // When more text is typed before the image arrives
        type_text(&mut session, " x");
        resolver.complete("face-smile");
        let inserted = session.poll_pending_loads();

        // Then the smiley takes the face's place and the caret stays put
        assert_eq!(inserted, 1);
        assert_eq!(
            session.body_html(),
            paragraph(&format!("{}\u{200b} x", image_smiley("face-smile", ":-)")))
        );
        let doc = session.document();
        let typed = doc.last_child(doc.children(doc.body())[0]).unwrap();
        assert_eq!(
            session.selection().range().map(|r| r.start),
            Some(Position::new(typed, 2))
        );
        assert_eq!(session.smileys.pending_count(), 0);
    }

    #[test]
    fn concurrent_loads_land_on_their_own_faces() {
        // Given two faces typed while both images are loading
        let (mut session, resolver) = smiley_session();
        type_text(&mut session, ":-)");
        type_text(&mut session, " ");
        type_text(&mut session, ";-)");
        assert_eq!(session.smileys.pending_count(), 2);

        // When the second image arrives before the first
        resolver.complete("face-wink");
        assert_eq!(session.poll_pending_loads(), 1);
        resolver.complete("face-smile");
        assert_eq!(session.poll_pending_loads(), 1);

        // Then each smiley replaced its own face and no face is left over
        assert_eq!(
            session.body_html(),
            paragraph(&format!(
                "{}\u{200b} {}\u{200b}",
                image_smiley("face-smile", ":-)"),
                image_smiley("face-wink", ";-)")
            ))
        );
    }

    #[test]
    fn failed_load_leaves_the_face_as_typed() {
        let (mut session, resolver) = smiley_session();
        type_text(&mut session, ":-)");

        resolver.fail("face-smile");

        assert_eq!(session.poll_pending_loads(), 0);
        assert_eq!(session.body_html(), paragraph(":-)"));
        assert_eq!(session.smileys.pending_count(), 0);
    }

    #[test]
    fn abandoned_load_leaves_the_face_as_typed() {
        let (mut session, resolver) = smiley_session();
        type_text(&mut session, "hi :-)");

        resolver.abandon("face-smile");

        assert_eq!(session.poll_pending_loads(), 0);
        assert_eq!(session.body_html(), paragraph("hi :-)"));
        assert_eq!(session.smileys.pending_count(), 0);
    }

    #[test]
    fn load_for_an_undone_face_inserts_nothing() {
        // Given a typed face that was undone while its image loaded
        let (mut session, resolver) = smiley_session();
        type_text(&mut session, ":-)");
        assert!(session.undo());

        // When the image arrives
        resolver.complete("face-smile");

        // Then nothing comes back
        assert_eq!(session.poll_pending_loads(), 0);
        assert_eq!(session.body_html(), paragraph("<br>"));
    }

    #[test]
    fn late_smiley_undoes_together_with_its_face() {
        // Given a smiley that arrived right after its face was typed
        let (mut session, resolver) = smiley_session();
        type_text(&mut session, ":-)");
        resolver.complete("face-smile");
        session.poll_pending_loads();
        let with_smiley = session.body_html();

        // When undoing once
        assert!(session.undo());

        // Then both the smiley and the typing are gone
        assert_eq!(session.body_html(), paragraph("<br>"));
        assert!(!session.history().can_undo());

        // And one redo brings both back
        assert!(session.redo());
        assert_eq!(session.body_html(), with_smiley);
    }

    #[test]
    fn ready_images_are_inserted_without_polling() {
        // Given an icon theme that has the smile
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("face-smile.png"), b"png").unwrap();
        let mut session = ComposerSession::new(Settings {
            magic_smileys: true,
            emoticon_dir: Some(dir.path().to_path_buf()),
            ..Settings::default()
        });

        // When typing the face
        type_text(&mut session, ":-)");

        // Then the image smiley is already in and one undo removes it
        let doc = session.document();
        let images = doc.elements_with_class(doc.body(), SMILEY_IMG);
        assert_eq!(images.len(), 1);
        assert_eq!(doc.attr(images[0], "data-name"), Some("face-smile"));
        assert!(doc.elements_with_class(doc.body(), SMILEY_PENDING).is_empty());
        assert_eq!(session.smileys.pending_count(), 0);
        assert!(session.undo());
        assert_eq!(session.body_html(), paragraph("<br>"));
    }

    #[test]
    fn chosen_smiley_waits_at_the_caret() {
        // Given a smiley picked by name while its image loads
        let (mut session, resolver) = smiley_session();
        type_text(&mut session, "ab");
        session.apply(Cmd::InsertSmiley {
            name: "face-wink".to_string(),
        });
        type_text(&mut session, "c");

        // When the image arrives
        resolver.complete("face-wink");
        session.poll_pending_loads();

        // Then the smiley sits where it was picked
        assert_eq!(
            session.body_html(),
            paragraph(&format!("ab{}\u{200b}c", image_smiley("face-wink", ";-)")))
        );
    }

    #[rstest]
    #[case(":-)", "face-smile", ":-)")]
    #[case(":)", "face-smile", ":)")]
    #[case("hi ;-)", "face-wink", ";-)")]
    #[case(";)", "face-wink", ";)")]
    #[case(":-(", "face-sad", ":-(")]
    #[case(":-D", "face-smile-big", ":-D")]
    #[case("O:-)", "face-angel", "O:-)")]
    #[case("so >:)", "face-devilish", ">:)")]
    #[case(":'(", "face-crying", ":'(")]
    #[case("B-)", "face-cool", "B-)")]
    #[case(":-P", "face-raspberry", ":-P")]
    #[case(":\"-)", "face-embarrassed", ":\"-)")]
    fn recognizes_text_faces(#[case] text: &str, #[case] name: &str, #[case] written: &str) {
        let found = detect_smiley(text).unwrap();

        assert_eq!(found.emoticon.name, name);
        assert_eq!(found.written, written);
    }

    #[rstest]
    #[case("")]
    #[case("hello")]
    #[case("abc:-)")]
    #[case(")")]
    #[case("-)")]
    fn rejects_non_faces(#[case] text: &str) {
        assert_eq!(detect_smiley(text), None);
    }

    #[test]
    fn match_start_is_a_character_offset() {
        let found = detect_smiley("naïve :-)").unwrap();

        assert_eq!(found.start, 6);
    }

    #[test]
    fn every_table_entry_is_reachable_by_name() {
        for emoticon in &EMOTICONS {
            assert_eq!(lookup_emoticon(emoticon.name), Some(emoticon));
        }
        assert_eq!(lookup_emoticon("face-unknown"), None);
    }

    #[test]
    fn wrapper_hides_the_text_face_in_html_mode() {
        let mut doc = Document::new();
        let image = LoadedImage {
            uri: "file:///smile.png".to_string(),
            mime_type: "image/png".to_string(),
        };
        let smile = lookup_emoticon("face-smile").unwrap();

        let wrapper = build_smiley_wrapper(&mut doc, smile, Some(&image), true).unwrap();

        assert_eq!(
            doc.outer_html(wrapper),
            r#"<span class="-x-evo-smiley-wrapper"><img src="file:///smile.png" data-inline data-name="face-smile" alt=":-)" class="-x-evo-smiley-img"><span class="-x-evo-smiley-text" style="display: none;">:-)</span></span>"#
        );
    }

    #[test]
    fn toggling_swaps_image_and_text() {
        let mut doc = Document::new();
        let image = LoadedImage {
            uri: "file:///smile.png".to_string(),
            mime_type: "image/png".to_string(),
        };
        let smile = lookup_emoticon("face-smile").unwrap();
        let wrapper = build_smiley_wrapper(&mut doc, smile, Some(&image), true).unwrap();
        doc.append_child(doc.body(), wrapper).unwrap();

        toggle_smileys(&mut doc, false);

        let img = doc.elements_with_class(wrapper, SMILEY_IMG)[0];
        let text = doc.elements_with_class(wrapper, SMILEY_TEXT)[0];
        assert_eq!(doc.attr(img, "style"), Some("display: none;"));
        assert_eq!(doc.attr(text, "style"), None);
    }
}
