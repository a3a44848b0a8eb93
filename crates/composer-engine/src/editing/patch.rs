use crate::selection::Coordinates;

/// Result of applying a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Whether the command did anything; hosts fall back to their default
    /// handling when it did not
    pub handled: bool,
    /// Caret after the command, as linear offsets into the body
    pub new_selection: Option<Coordinates>,
    pub version: u64,
}
