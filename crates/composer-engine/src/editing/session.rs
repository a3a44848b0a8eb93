use std::time::Instant;

use composer_config::Settings;

use crate::citation::quote_plain_text;
use crate::convert::{convert_to_html_mode, convert_when_changing_composer_mode};
use crate::dom::{Document, NodeId};
use crate::editing::spellcheck::SpellCheckDebouncer;
use crate::selection::{Coordinates, Position, Selection, default_caret, markers, restore_markers};
use crate::smiley::{EmoticonResolver, SmileyLoads, ThemeDirResolver, poll_pending_loads};
use crate::undo::{HistoryKind, Scope, UndoRedoManager};
use crate::wrap::{create_paragraph, wrap_paragraphs_in_document};

/// Body attribute marking a saved draft.
pub const DRAFT_ATTRIBUTE: &str = "data-evo-draft";

/// Transient state shared by the input handlers between keystrokes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFlags {
    /// An input method is composing text; automatic follow-ups of typing
    /// wait until it commits
    pub composition_in_progress: bool,
    pub return_pressed: bool,
    pub space_pressed: bool,
    /// Set on every recorded edit, cleared by the host after saving
    pub content_changed: bool,
}

/// One open composer: the document, its selection, the settings it was
/// opened with and the undo history.
pub struct ComposerSession {
    pub(crate) doc: Document,
    pub(crate) selection: Selection,
    pub(crate) settings: Settings,
    pub(crate) history: UndoRedoManager,
    pub(crate) flags: SessionFlags,
    pub(crate) smileys: SmileyLoads,
    pub(crate) spell_check: SpellCheckDebouncer,
    /// Incremented on every change
    pub(crate) version: u64,
}

impl ComposerSession {
    /// A session with one empty paragraph holding the caret.
    pub fn new(settings: Settings) -> Self {
        let mut doc = Document::new();
        let body = doc.body();
        if let Err(err) = append_empty_paragraph(&mut doc, body, &settings) {
            log::warn!("failed to create the initial paragraph: {err}");
        }
        Self::with_document(doc, settings)
    }

    /// Open existing message content. In plain-text mode the paragraphs are
    /// wrapped and citations quoted.
    pub fn from_html(html: &str, settings: Settings) -> Self {
        let mut doc = Document::from_html(html);
        let body = doc.body();
        if doc.children(body).is_empty()
            && let Err(err) = append_empty_paragraph(&mut doc, body, &settings)
        {
            log::warn!("failed to create the initial paragraph: {err}");
        }
        if !settings.html_mode {
            wrap_paragraphs_in_document(&mut doc, settings.word_wrap_length);
            if let Err(err) = quote_plain_text(&mut doc) {
                log::warn!("failed to quote loaded content: {err}");
            }
        }
        Self::with_document(doc, settings)
    }

    /// Reopen a draft written by
    /// [`process_content_for_draft`](crate::convert::persist::process_content_for_draft).
    /// The caret goes back where the selection markers were saved.
    pub fn from_draft(html: &str, settings: Settings) -> Self {
        let mut doc = Document::from_html(html);
        let body = doc.body();
        doc.remove_attr(body, DRAFT_ATTRIBUTE);
        if doc.children(body).is_empty()
            && let Err(err) = append_empty_paragraph(&mut doc, body, &settings)
        {
            log::warn!("failed to create the initial paragraph: {err}");
        }
        Self::with_document(doc, settings)
    }

    fn with_document(doc: Document, settings: Settings) -> Self {
        let mut smileys = SmileyLoads::default();
        if let Some(dir) = &settings.emoticon_dir {
            smileys.set_resolver(Box::new(ThemeDirResolver::new(dir)));
        }
        let mut session = Self {
            doc,
            selection: Selection::default(),
            history: UndoRedoManager::new(settings.history_limit),
            settings,
            flags: SessionFlags::default(),
            smileys,
            spell_check: SpellCheckDebouncer::default(),
            version: 0,
        };
        if markers(&session.doc).is_some() {
            restore_markers(&mut session.doc, &mut session.selection);
        } else {
            let caret = initial_caret(&session.doc);
            session.selection.collapse(caret);
        }
        session
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Direct tree access for hosts that mutate the document themselves.
    /// Such edits are not recorded in the history.
    pub fn document_mut(&mut self) -> &mut Document {
        self.mark_changed();
        &mut self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history(&self) -> &UndoRedoManager {
        &self.history
    }

    pub fn flags(&self) -> &SessionFlags {
        &self.flags
    }

    pub fn flags_mut(&mut self) -> &mut SessionFlags {
        &mut self.flags
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn body_html(&self) -> String {
        self.doc.inner_html(self.doc.body())
    }

    pub fn set_caret(&mut self, at: Position) {
        self.selection.collapse(at);
    }

    pub fn select(&mut self, anchor: Position, focus: Position) {
        self.selection.select(&self.doc, anchor, focus);
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.selection.coordinates(&self.doc)
    }

    pub fn set_coordinates(&mut self, coordinates: Coordinates) {
        self.selection.set_coordinates(&self.doc, coordinates);
    }

    /// Revert the last edit. Returns `false` when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo(&mut self.doc, &mut self.selection);
        if undone {
            self.mark_changed();
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo(&mut self.doc, &mut self.selection);
        if redone {
            self.mark_changed();
        }
        redone
    }

    pub fn set_emoticon_resolver(&mut self, resolver: Box<dyn EmoticonResolver>) {
        self.smileys.set_resolver(resolver);
    }

    /// Insert smileys whose images have arrived.
    pub fn poll_pending_loads(&mut self) -> usize {
        poll_pending_loads(self)
    }

    /// Switch between rich and plain-text editing. Both directions clear
    /// the undo history.
    pub fn set_html_mode(&mut self, html_mode: bool) {
        if self.settings.html_mode == html_mode {
            return;
        }
        if html_mode {
            convert_to_html_mode(self);
        } else {
            convert_when_changing_composer_mode(self);
        }
    }

    /// The view scrolled: (re)start the spell-check countdown.
    pub fn on_scroll(&mut self, now: Instant) {
        if self.settings.inline_spelling {
            self.spell_check.schedule(now);
        }
    }

    /// Whether the debounced spell check should run now. Reports each
    /// scheduled pass once.
    pub fn spell_check_due(&mut self, now: Instant) -> bool {
        self.spell_check.poll(now)
    }

    /// Run `f` as one recorded edit. Calls made while another edit is
    /// recording, or while undo or redo replays, join that edit.
    pub(crate) fn with_history<T>(
        &mut self,
        kind: HistoryKind,
        scope: Scope,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let nested = self.history.is_recording() || self.history.is_operation_in_progress();
        if !nested {
            self.history
                .begin_event(&self.doc, &self.selection, kind, scope);
        }
        let result = f(self);
        if !nested {
            self.history.finish_event(&self.doc, &self.selection);
            self.mark_changed();
        }
        result
    }

    pub(crate) fn mark_changed(&mut self) {
        self.version += 1;
        self.flags.content_changed = true;
    }
}

fn append_empty_paragraph(
    doc: &mut Document,
    parent: NodeId,
    settings: &Settings,
) -> Result<NodeId, crate::error::DomError> {
    let paragraph = create_paragraph(doc, settings, 0);
    let br = doc.create_element("br");
    doc.append_child(paragraph, br)?;
    doc.append_child(parent, paragraph)?;
    Ok(paragraph)
}

/// Start of the first paragraph, or of the body.
fn initial_caret(doc: &Document) -> Position {
    let body = doc.body();
    match doc.first_child(body) {
        Some(first) if doc.is_element(first) => Position::new(first, 0),
        _ => default_caret(doc),
    }
}
