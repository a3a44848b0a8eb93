pub mod citation;
pub mod convert;
pub mod dom;
pub mod editing;
pub mod error;
pub mod magic;
pub mod selection;
pub mod smiley;
pub mod undo;
pub mod wrap;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use convert::persist::{
    HtmlContent, InlineImage, process_content_for_draft, process_content_for_html,
    process_content_for_plain_text,
};
pub use convert::{convert_content, convert_to_html_mode, convert_when_changing_composer_mode};
pub use dom::{Document, NodeId};
pub use editing::{Cmd, ComposerSession, Patch};
pub use error::{AssetError, DomError};
pub use selection::{Coordinates, Position, Selection};
pub use undo::{HistoryKind, UndoRedoManager};
