/*!
 * # Editing Core Module
 *
 * The composer edits one HTML document in place. Everything an edit needs
 * lives in a [`ComposerSession`]: the document tree, the selection, the
 * settings the composer was opened with, the undo history and the
 * transient keystroke flags.
 *
 * ## Architecture Overview
 *
 * ### 1. Single Owner: the Session
 * - The engine never keeps global state; every operation takes the session
 * - Hosts read the tree through [`ComposerSession::document`] and feed input
 *   through [`ComposerSession::apply`]
 *
 * ### 2. Command-Based Editing
 * - All edits are represented as **Commands** (`Cmd` enum)
 * - Each command records one history event; the automatic follow-ups of a
 *   keystroke (magic links, smileys, plain-text re-wrapping) join it
 * - Applying a command returns a **Patch** with the new caret and version
 *
 * ### 3. Selection Markers
 * - Structural edits park the selection in two marker spans, mutate, and
 *   turn the markers back into a range afterwards
 * - History stores the caret as linear coordinates, which survive the
 *   subtree being rebuilt
 *
 * ## Module Structure
 *
 * - **`session`**: `ComposerSession`, its flags and the history wrapper
 * - **`commands`**: `Cmd` enum and dispatch
 * - **`input`**: typing, Return, Backspace, paste and HTML insertion
 * - **`patch`**: Edit result metadata: handled flag, new caret and version
 * - **`spellcheck`**: debounce of spell checking after scrolling
 *
 * ## Usage Pattern
 *
 * ```rust
 * use composer_config::Settings;
 * use composer_engine::editing::*;
 *
 * // 1. Open a composer
 * let mut session = ComposerSession::new(Settings::plain_text());
 *
 * // 2. Apply edits via commands
 * let patch = session.apply(Cmd::InsertText { text: "Hello".to_string() });
 * assert!(patch.handled);
 *
 * // 3. Undo restores the previous tree and caret
 * session.apply(Cmd::Undo);
 * ```
 */

pub mod commands;
pub mod input;
pub mod patch;
pub mod session;
pub mod spellcheck;

pub use commands::Cmd;
pub use patch::Patch;
pub use session::{ComposerSession, DRAFT_ATTRIBUTE, SessionFlags};
pub use spellcheck::{SPELL_CHECK_DELAY, SpellCheckDebouncer};
