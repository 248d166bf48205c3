use thiserror::Error;
use crate::time::ActorId;
use crate::tree::TreeNodeId;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum TreeError {
    /// The operation's parent doesn't exist, or isn't the kind of element the operation expects.
    #[error("not applicable datatype")]
    NotApplicableDataType,

    /// A style operation needs at least one attribute to set or remove.
    #[error("style operation has no attributes")]
    EmptyStyle,

    #[error("tree node not found: {0}")]
    NodeNotFound(TreeNodeId),

    #[error("invalid tree position: offset {offset} in {parent} (which has {len} children)")]
    InvalidPos { parent: TreeNodeId, offset: u32, len: usize },

    #[error("invalid tree range: from is after to")]
    InvalidRange,

    /// A tree position named a text node as its parent. Only elements have children.
    #[error("tree node {0} is text and has no children")]
    TextParent(TreeNodeId),

    /// The replica already has its identity.
    #[error("document already has actor {0}")]
    ActorAlreadySet(ActorId),

    /// Changes made before the replica had an identity were handed off under the placeholder
    /// actor, so it can't be replaced any more.
    #[error("changes made before the actor was set have already been sent")]
    UnboundChangesSent,

    #[error("document size exceeds limit: {actual} > {limit}")]
    DocumentSizeExceedsLimit { limit: usize, actual: i64 },
}

pub type Result<T> = std::result::Result<T, TreeError>;
