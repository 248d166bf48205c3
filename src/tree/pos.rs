use std::fmt::{Debug, Display, Formatter};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use crate::time::Ticket;

/// Identifies a node in a tree. Nodes are named by the ticket of the operation which created them.
/// The offset tells apart the pieces of a node which has been split, and is 0 for whole nodes.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TreeNodeId {
    pub created_at: Ticket,
    pub offset: u32,
}

impl TreeNodeId {
    pub const fn new(created_at: Ticket, offset: u32) -> Self {
        Self { created_at, offset }
    }
}

impl From<Ticket> for TreeNodeId {
    fn from(created_at: Ticket) -> Self {
        Self { created_at, offset: 0 }
    }
}

impl Display for TreeNodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.created_at, self.offset)
    }
}

impl Debug for TreeNodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TreeNodeId({})", self)
    }
}

/// A position in a tree, expressed as "before child `offset` of `parent_id`". An offset equal to
/// the number of children names the spot just before the parent's closing tag.
///
/// Offsets count every child the parent physically holds - including removed ones - so a position
/// means the same thing on every replica even if they disagree about which nodes are still live.
/// Positions are resolved against the tree each time they're used. Don't cache the result.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TreePos {
    pub parent_id: TreeNodeId,
    pub offset: u32,
}

impl TreePos {
    pub const fn new(parent_id: TreeNodeId, offset: u32) -> Self {
        Self { parent_id, offset }
    }
}

impl Debug for TreePos {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TreePos({} + {})", self.parent_id, self.offset)
    }
}
