//! Serializing the composer content for sending and for drafts.
//!
//! All three outputs are produced from a copy of the document, so the live
//! tree and the selection are left as the user had them.

use uuid::Uuid;

use crate::citation::{dequote_plain_text, quote_plain_text};
use crate::dom::classify::{
    NodeClass, SMILEY_IMG, SMILEY_PENDING, TEMP_BR, TEMP_TEXT_WRAPPER, VISITED_LINK, WRAP_BR,
    classify, is_citation,
};
use crate::dom::{Document, NodeId};
use crate::editing::{ComposerSession, DRAFT_ATTRIBUTE};
use crate::selection::{remove_selection_markers, save_markers};
use crate::wrap::{wrap_paragraph, wrap_paragraphs_in_document};

use super::plain_text::to_plain_text;
use super::{DATA_CONVERTED, convert_document_to_plain_text, remove_images};

/// Style elements the editor adds for its own display.
pub const EDITOR_STYLE_IDS: [&str; 4] = [
    "-x-evo-quote-style",
    "-x-evo-a-color-style",
    "-x-evo-a-color-style-visited",
    "-x-evo-style-a",
];

/// An image sent as a MIME part and referenced by `cid:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    /// Source the image had in the editor
    pub src: String,
    /// The image's `data-name`, usually the file name
    pub name: Option<String>,
    /// Content id, shaped like a message id
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlContent {
    pub html: String,
    pub inline_images: Vec<InlineImage>,
}

fn generate_content_id(domain: &str) -> String {
    format!("{}@{domain}", Uuid::new_v4().simple())
}

/// Point every inline image at a `cid:` URL, one content id per distinct
/// source. `img[data-inline]` sources come first, then
/// `[data-inline][background]` backgrounds. Returns the images in the order
/// their ids were created.
pub fn get_inline_images_data(doc: &mut Document, domain: &str) -> Vec<InlineImage> {
    let root = doc.root();
    let inline: Vec<NodeId> = doc
        .descendants(root)
        .filter(|n| doc.has_attr(*n, "data-inline"))
        .collect();
    let sources = inline
        .iter()
        .filter(|n| doc.is_tag(**n, "img"))
        .map(|n| (*n, "src"))
        .chain(
            inline
                .iter()
                .filter(|n| doc.has_attr(**n, "background"))
                .map(|n| (*n, "background")),
        )
        .collect::<Vec<_>>();

    let mut images: Vec<InlineImage> = Vec::new();
    for (node, attr) in sources {
        let Some(src) = doc.attr(node, attr).map(str::to_string) else {
            continue;
        };
        let id = match images.iter().find(|image| image.src == src) {
            Some(image) => image.id.clone(),
            None => {
                let image = InlineImage {
                    name: doc.attr(node, "data-name").map(str::to_string),
                    id: generate_content_id(domain),
                    src,
                };
                let id = image.id.clone();
                images.push(image);
                id
            }
        };
        doc.set_attr(node, attr, &format!("cid:{id}"));
    }
    log::debug!("{} inline images", images.len());
    images
}

/// Put back the sources [`get_inline_images_data`] replaced.
pub fn restore_images(doc: &mut Document, images: &[InlineImage]) {
    let root = doc.root();
    let nodes: Vec<NodeId> = doc.descendants(root).filter(|n| doc.is_element(*n)).collect();
    for image in images {
        let cid = format!("cid:{}", image.id);
        for node in &nodes {
            for attr in ["src", "background"] {
                if doc.attr(*node, attr) == Some(cid.as_str()) {
                    doc.set_attr(*node, attr, &image.src);
                }
            }
        }
    }
}

/// Unwrap the anchors of smileys still waiting for their image, keeping
/// the typed text faces.
fn remove_smiley_anchors(doc: &mut Document) {
    let root = doc.root();
    for anchor in doc.elements_with_class(root, SMILEY_PENDING) {
        if let Err(err) = doc.unwrap(anchor) {
            log::warn!("failed to remove smiley anchor: {err}");
        }
    }
}

fn remove_editor_state(doc: &mut Document) {
    for id in EDITOR_STYLE_IDS {
        while let Some(style) = doc.get_element_by_id(id) {
            doc.remove(style);
        }
    }
    remove_selection_markers(doc);
    remove_smiley_anchors(doc);
    let root = doc.root();
    let hidden_spaces: Vec<NodeId> = doc
        .descendants(root)
        .filter(|n| doc.is_tag(*n, "span") && doc.has_attr(*n, "data-hidden-space"))
        .collect();
    for span in hidden_spaces {
        doc.remove(span);
    }
}

/// The message as HTML. With `from_domain` inline images are referenced by
/// content id and returned alongside; the live document keeps its sources.
pub fn process_content_for_html(
    session: &mut ComposerSession,
    from_domain: Option<&str>,
) -> HtmlContent {
    let inline_images = match from_domain {
        Some(domain) => get_inline_images_data(&mut session.doc, domain),
        None => Vec::new(),
    };
    let mut doc = session.doc.clone();
    restore_images(&mut session.doc, &inline_images);

    remove_editor_state(&mut doc);
    dequote_plain_text(&mut doc);
    let root = doc.root();
    for class in [WRAP_BR, VISITED_LINK, TEMP_BR, TEMP_TEXT_WRAPPER] {
        for node in doc.elements_with_class(root, class) {
            doc.remove_class(node, class);
        }
    }

    HtmlContent {
        html: doc.outer_html(root),
        inline_images,
    }
}

/// The message as plain text: paragraphs wrapped, citations quoted with
/// `> ` per level.
pub fn process_content_for_plain_text(session: &ComposerSession) -> String {
    let mut doc = session.doc.clone();
    let mut settings = session.settings.clone();
    let body = doc.body();
    remove_selection_markers(&mut doc);

    if settings.html_mode {
        settings.html_mode = false;
        if doc.has_attr(body, DATA_CONVERTED) {
            remove_images(&mut doc, body);
        } else if let Err(err) = convert_document_to_plain_text(&mut doc, &settings) {
            log::warn!("plain-text conversion incomplete: {err}");
        }
    }

    let wrap_length = settings.word_wrap_length;
    dequote_plain_text(&mut doc);
    wrap_paragraphs_in_document(&mut doc, wrap_length);
    for item in doc.elements_by_tag(body, "li") {
        wrap_paragraph(&mut doc, item, wrap_length);
    }
    let has_citations = doc
        .descendants(body)
        .any(|n| is_citation(&doc, n));
    if has_citations && let Err(err) = quote_plain_text(&mut doc) {
        log::warn!("failed to quote citations: {err}");
    }

    // Smiley images never reach plain text
    for img in doc.elements_with_class(body, SMILEY_IMG) {
        doc.remove(img);
    }
    to_plain_text(&doc, body, wrap_length)
}

/// The whole document for saving as a draft: the selection is kept in
/// marker spans and the body carries `data-evo-draft`.
pub fn process_content_for_draft(session: &ComposerSession) -> String {
    let mut doc = session.doc.clone();
    let mut selection = session.selection.clone();
    save_markers(&mut doc, &mut selection);
    remove_smiley_anchors(&mut doc);

    let root = doc.root();
    let body = doc.body();
    doc.set_attr(body, DRAFT_ATTRIBUTE, "");
    let visited: Vec<NodeId> = doc
        .descendants(root)
        .filter(|n| classify(&doc, *n) == NodeClass::Anchor && doc.has_class(*n, VISITED_LINK))
        .collect();
    for anchor in visited {
        doc.remove_class(anchor, VISITED_LINK);
    }
    doc.outer_html(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::Cmd;
    use crate::selection::Coordinates;
    use composer_config::Settings;
    use pretty_assertions::assert_eq;

    fn session(body: &str, settings: Settings) -> ComposerSession {
        ComposerSession::from_html(&format!("<html><head></head><body>{body}</body></html>"), settings)
    }

    #[test]
    fn repeated_sources_share_one_content_id() {
        // Given the same image twice and a background
        let mut doc = Document::from_html(
            r#"<body><img src="file:///a.png" data-inline data-name="a.png"><img src="file:///a.png" data-inline><table data-inline background="file:///bg.png"></table></body>"#,
        );

        // When preparing the inline images
        let images = get_inline_images_data(&mut doc, "example.org");

        // Then two distinct ids were generated
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].src, "file:///a.png");
        assert_eq!(images[0].name.as_deref(), Some("a.png"));
        assert!(images[0].id.ends_with("@example.org"));
        assert_ne!(images[0].id, images[1].id);
        let imgs = doc.elements_by_tag(doc.body(), "img");
        let cid = format!("cid:{}", images[0].id);
        assert_eq!(doc.attr(imgs[0], "src"), Some(cid.as_str()));
        assert_eq!(doc.attr(imgs[1], "src"), Some(cid.as_str()));

        restore_images(&mut doc, &images);
        assert_eq!(doc.attr(imgs[1], "src"), Some("file:///a.png"));
        let table = doc.elements_by_tag(doc.body(), "table")[0];
        assert_eq!(doc.attr(table, "background"), Some("file:///bg.png"));
    }

    #[test]
    fn html_output_drops_editor_state() {
        let mut s = session(
            r#"<div class="-x-evo-paragraph">hi<span data-hidden-space=""> </span><a class="-x-evo-visited-link" href="http://x.org">x</a></div>"#,
            Settings::default(),
        );
        s.set_coordinates(Coordinates::collapsed(1));
        let head = s.document().head();
        let style = s.document_mut().create_element_with("style", &[("id", "-x-evo-quote-style")]);
        s.document_mut().append_child(head, style).unwrap();

        let content = process_content_for_html(&mut s, None);

        assert_eq!(
            content.html,
            r#"<html><head></head><body><div class="-x-evo-paragraph">hi<a href="http://x.org">x</a></div></body></html>"#
        );
        assert!(content.inline_images.is_empty());
    }

    #[test]
    fn html_output_references_inline_images_by_content_id() {
        let mut s = session(r#"<img src="data:image/png;base64,AA" data-inline>"#, Settings::default());

        let content = process_content_for_html(&mut s, Some("example.org"));

        let id = &content.inline_images[0].id;
        assert!(content.html.contains(&format!("src=\"cid:{id}\"")));
        assert!(s.body_html().contains("data:image/png;base64,AA"));
    }

    #[test]
    fn plain_text_output_quotes_and_wraps() {
        // Given a rich reply with a long quoted line
        let s = session(
            r#"<div>Thanks!</div><blockquote type="cite"><div>aaaa bbbb cccc dddd</div></blockquote>"#,
            Settings {
                word_wrap_length: 12,
                ..Settings::default()
            },
        );

        // When producing the plain-text body
        let text = process_content_for_plain_text(&s);

        // Then quoted lines are wrapped to the narrower width and prefixed
        assert_eq!(text, "Thanks!\n> aaaa bbbb \n> cccc dddd");
        assert_eq!(s.document().elements_by_tag(s.document().body(), "blockquote").len(), 1);
    }

    #[test]
    fn plain_text_output_from_a_plain_composer() {
        let mut s = ComposerSession::new(Settings::plain_text());
        s.apply(Cmd::InsertText {
            text: "one\u{a0}\u{a0}two".to_string(),
        });

        assert_eq!(process_content_for_plain_text(&s), "one  two");
    }

    #[test]
    fn draft_round_trips_content_and_caret() {
        let mut s = session(
            r#"<div class="-x-evo-paragraph">abc</div><div class="-x-evo-paragraph">def</div>"#,
            Settings::default(),
        );
        s.set_coordinates(Coordinates::collapsed(5));

        let draft = process_content_for_draft(&s);
        let reopened = ComposerSession::from_draft(&draft, Settings::default());

        assert!(draft.contains("<body data-evo-draft>"));
        assert_eq!(reopened.body_html(), s.body_html());
        assert_eq!(reopened.coordinates(), Some(Coordinates::collapsed(5)));
        assert_eq!(s.document().get_element_by_id("-x-evo-selection-start-marker"), None);
    }

    #[test]
    fn pending_smiley_anchors_are_not_saved() {
        // Given a typed face still waiting for its image
        let s = session(
            r#"<div class="-x-evo-paragraph">hi <span id="-x-evo-smiley-pending-1" class="-x-evo-smiley-pending">:-)</span></div>"#,
            Settings::default(),
        );

        // When saving a draft
        let draft = process_content_for_draft(&s);

        // Then the face is kept as plain text
        assert!(draft.contains("hi :-)</div>"));
        assert!(!draft.contains("-x-evo-smiley-pending"));
        assert!(s.body_html().contains("-x-evo-smiley-pending"));
    }
}
