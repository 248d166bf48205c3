//! Deferred reclamation. When a write makes an attribute value dead, the tree doesn't free it.
//! Instead it hands back a [`GCPair`] which the [`Root`](crate::Root) holds on to until every
//! replica is known to have seen the removal. Only then can the data be dropped without risking
//! divergence.

use std::fmt::{Display, Formatter};
use smartstring::alias::String as SmartString;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use crate::resource::DataSize;
use crate::time::{Ticket, VersionVector};
use crate::tree::TreeNodeId;

/// A stable handle to a single attribute assignment: "the value written to `key` on `node` at
/// ticket `at`". Handles don't own anything. They stay valid no matter how the tree is reshaped.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FragmentRef {
    pub node: TreeNodeId,
    pub key: SmartString,
    pub at: Ticket,
}

impl FragmentRef {
    pub fn new(node: TreeNodeId, key: SmartString, at: Ticket) -> Self {
        Self { node, key, at }
    }
}

impl Display for FragmentRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}@{}", self.node, self.key, self.at)
    }
}

/// A dead assignment (`created`) paired with the assignment which killed it (`removed`). When a
/// key is removed the tombstone is written in place of the value, and the tombstone itself is
/// paired with itself - it only exists to shadow older writes.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GCPair {
    pub created: FragmentRef,
    pub removed: FragmentRef,

    /// Bytes held by the dead fragment.
    pub size: DataSize,
}

impl GCPair {
    /// The pair can be physically reclaimed once every replica has seen the removing write.
    pub fn is_collectable(&self, min_synced: &VersionVector) -> bool {
        min_synced.covers(&self.removed.at)
    }

    pub fn is_tombstone(&self) -> bool {
        self.created == self.removed
    }
}
