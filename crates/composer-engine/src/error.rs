use crate::dom::NodeId;

/// Invalid tree edits. The editing layers treat these as recoverable: they
/// log and carry on rather than interrupt typing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} cannot have children")]
    NotAContainer(NodeId),
    #[error("inserting {child:?} under {parent:?} would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },
    #[error("node {reference:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, reference: NodeId },
    #[error("node {0:?} has no parent")]
    Detached(NodeId),
    #[error("node {0:?} is not a text node")]
    NotText(NodeId),
    #[error("offset {offset} is past the end of {node:?} (length {len})")]
    OffsetOutOfRange { node: NodeId, offset: usize, len: usize },
    #[error("no element with id {0}")]
    NoSuchElement(String),
}

/// Failures of the emoticon asset resolver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("no image for emoticon {0}")]
    UnknownEmoticon(String),
    #[error("failed to load {uri}: {reason}")]
    LoadFailed { uri: String, reason: String },
}
