use super::input;
use super::patch::Patch;
use super::session::ComposerSession;
use crate::dom::NodeId;
use crate::smiley::insert_smiley_by_name;

/// Edit commands a host feeds into a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Typed text, replacing the selection
    InsertText { text: String },
    /// Return
    InsertParagraph,
    /// Backspace
    DeleteBackward,
    Paste { text: String },
    InsertHtml { html: String },
    /// Insert the emoticon with the given icon name
    InsertSmiley { name: String },
    /// Re-wrap the paragraph holding the caret
    WrapParagraph,
    /// An input method started composing
    CompositionStart,
    /// The input method committed its text
    CompositionEnd,
    Undo,
    Redo,
}

impl ComposerSession {
    /// Apply a command and report where the caret ended up.
    pub fn apply(&mut self, cmd: Cmd) -> Patch {
        log::debug!("applying {cmd:?}");
        let handled = match cmd {
            Cmd::InsertText { text } => input::insert_text(self, &text),
            Cmd::InsertParagraph => input::insert_paragraph(self),
            Cmd::DeleteBackward => input::delete_backward(self),
            Cmd::Paste { text } => input::paste(self, &text),
            Cmd::InsertHtml { html } => input::insert_html(self, &html),
            Cmd::InsertSmiley { name } => match insert_smiley_by_name(self, &name) {
                Ok(()) => true,
                Err(err) => {
                    log::warn!("{err}");
                    false
                }
            },
            Cmd::WrapParagraph => input::wrap_paragraph_at_caret(self),
            Cmd::CompositionStart => input::start_composition(self),
            Cmd::CompositionEnd => input::end_composition(self),
            Cmd::Undo => self.undo(),
            Cmd::Redo => self.redo(),
        };

        let keep: Vec<NodeId> = self
            .selection
            .range()
            .map(|r| vec![r.start.node, r.end.node])
            .unwrap_or_default();
        self.doc.maybe_collect_garbage(&keep);

        Patch {
            handled,
            new_selection: self.coordinates(),
            version: self.version,
        }
    }
}
