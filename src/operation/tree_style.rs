use std::borrow::Cow;
use std::collections::BTreeMap;
use smartstring::alias::String as SmartString;
use tracing::{trace, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use crate::error::{Result, TreeError};
use crate::root::{Element, Root};
use crate::time::{ActorId, Ticket, VersionVector};
use crate::tree::TreePos;

/// What a style operation does to each element in its range. An operation either sets attributes
/// or removes them - never both.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StyleKind {
    Set(BTreeMap<SmartString, SmartString>),
    Remove(Vec<SmartString>),
}

/// Style (or unstyle) every element in a range of a tree.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TreeStyle {
    /// Creation time of the tree being styled.
    parent_created_at: Ticket,

    from: TreePos,
    to: TreePos,

    kind: StyleKind,

    executed_at: Ticket,
}

impl TreeStyle {
    /// Create an operation which sets `attributes` on the range.
    pub fn new(parent_created_at: Ticket, from: TreePos, to: TreePos,
               attributes: BTreeMap<SmartString, SmartString>, executed_at: Ticket) -> Result<Self> {
        if attributes.is_empty() { return Err(TreeError::EmptyStyle); }
        Ok(Self { parent_created_at, from, to, kind: StyleKind::Set(attributes), executed_at })
    }

    /// Create an operation which removes the named attributes from the range.
    pub fn new_remove(parent_created_at: Ticket, from: TreePos, to: TreePos,
                      attributes_to_remove: Vec<SmartString>, executed_at: Ticket) -> Result<Self> {
        if attributes_to_remove.is_empty() { return Err(TreeError::EmptyStyle); }
        Ok(Self { parent_created_at, from, to, kind: StyleKind::Remove(attributes_to_remove), executed_at })
    }

    /// Apply this operation to root.
    ///
    /// `version_vector` is the author's version vector at the time of the edit, used to work out
    /// which nodes the author could see. Pass `None` for edits made against this replica's own
    /// state.
    ///
    /// This either fully applies - tree, gc registry and size accounting all updated - or returns
    /// an error having changed nothing.
    pub fn execute(&self, root: &mut Root, version_vector: Option<&VersionVector>) -> Result<()> {
        let tree = match root.find_by_created_at_mut(&self.parent_created_at) {
            Some(Element::Tree(tree)) => tree,
            _ => {
                warn!(parent = %self.parent_created_at, executed_at = %self.executed_at,
                    "style target is not a tree");
                return Err(TreeError::NotApplicableDataType);
            }
        };

        let (pairs, mut diff) = match &self.kind {
            StyleKind::Set(attributes) => {
                tree.style(&self.from, &self.to, attributes, &self.executed_at, version_vector)?
            }
            StyleKind::Remove(keys) => {
                tree.remove_style(&self.from, &self.to, keys, &self.executed_at, version_vector)?
            }
        };

        let num_pairs = pairs.len();
        for pair in pairs {
            root.register_gc_pair(pair.clone());
            root.adjust_diff_for_gc_pair(&mut diff, &pair);
        }
        root.acc(diff);

        trace!(executed_at = %self.executed_at, pairs = num_pairs, %diff, "executed tree style");
        Ok(())
    }

    pub fn from_pos(&self) -> &TreePos { &self.from }
    pub fn to_pos(&self) -> &TreePos { &self.to }
    pub fn executed_at(&self) -> &Ticket { &self.executed_at }
    pub fn parent_created_at(&self) -> &Ticket { &self.parent_created_at }
    pub fn kind(&self) -> &StyleKind { &self.kind }

    /// The attributes this operation sets. Empty for removals.
    pub fn attributes(&self) -> Cow<'_, BTreeMap<SmartString, SmartString>> {
        match &self.kind {
            StyleKind::Set(attributes) => Cow::Borrowed(attributes),
            StyleKind::Remove(_) => Cow::Owned(BTreeMap::new()),
        }
    }

    /// The attributes this operation removes. Empty for sets.
    pub fn attributes_to_remove(&self) -> &[SmartString] {
        match &self.kind {
            StyleKind::Set(_) => &[],
            StyleKind::Remove(keys) => keys.as_slice(),
        }
    }

    /// Attribute this operation to actor.
    ///
    /// Locally authored operations are stamped with a placeholder actor and get their real one
    /// just before they're committed. This must happen before the operation is sent anywhere -
    /// other replicas order it by the ticket they receive.
    pub fn set_actor(&mut self, actor: ActorId) {
        self.executed_at = self.executed_at.set_actor(actor);
    }
}
