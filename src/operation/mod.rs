//! Operations are the unit of change in a document. Each one knows what it does, where, and when
//! (its executed-at ticket), and can apply itself to a [`Root`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::root::Root;
use crate::time::{ActorId, Ticket, VersionVector};

mod tree_style;

pub use tree_style::{StyleKind, TreeStyle};

#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operation {
    TreeStyle(TreeStyle),
}

impl Operation {
    pub fn execute(&self, root: &mut Root, version_vector: Option<&VersionVector>) -> Result<()> {
        match self {
            Operation::TreeStyle(op) => op.execute(root, version_vector),
        }
    }

    pub fn executed_at(&self) -> &Ticket {
        match self {
            Operation::TreeStyle(op) => op.executed_at(),
        }
    }

    pub fn parent_created_at(&self) -> &Ticket {
        match self {
            Operation::TreeStyle(op) => op.parent_created_at(),
        }
    }

    pub fn set_actor(&mut self, actor: ActorId) {
        match self {
            Operation::TreeStyle(op) => op.set_actor(actor),
        }
    }
}

impl From<TreeStyle> for Operation {
    fn from(op: TreeStyle) -> Self {
        Operation::TreeStyle(op)
    }
}
