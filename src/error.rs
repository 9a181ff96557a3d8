use thiserror::Error;

use crate::types::NodeId;

pub type Result<T> = std::result::Result<T, DomError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("unsupported qualifier: {qualifier}")]
    UnsupportedQualifier { qualifier: String },

    #[error("change type not supported by list rendering: {kind}")]
    UnsupportedChange { kind: &'static str },

    #[error("range boundary {end} is not reachable from {start}")]
    BrokenRange { start: NodeId, end: NodeId },

    #[error("splice at {index} removing {removed_count} is out of range for length {len}")]
    SpliceOutOfRange {
        index: usize,
        removed_count: usize,
        len: usize,
    },

    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("node {0} no longer exists")]
    StaleNode(NodeId),

    #[error("node {0} has no parent")]
    Detached(NodeId),

    #[error("cannot insert {child} into {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("custom element already defined: {name}")]
    AlreadyDefined { name: String },
}

impl DomError {
    /// Errors that indicate a programming mistake in view code rather than a
    /// bad runtime state.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedQualifier { .. } | Self::UnsupportedChange { .. }
        )
    }
}
