//! A replicated tree of element and text nodes. This is the primitive style operations act on.
//!
//! Nodes live in an arena and are addressed internally by [`NodeIdx`]. Externally they're named by
//! [`TreeNodeId`], which is stable across replicas. Removing a node only tombstones it - children
//! stay physically in place, so positions computed on one replica resolve the same way on another.
//!
//! Styling a range walks the tree in document order. Elements contribute an opening and closing
//! token, text nodes a single token. Every element whose opening token falls in `[from, to)` has
//! its attributes written.

use std::collections::BTreeMap;
use std::fmt::Write;
use smallvec::SmallVec;
use smartstring::alias::String as SmartString;
use crate::error::{Result, TreeError};
use crate::gc::{FragmentRef, GCPair};
use crate::resource::DataSize;
use crate::time::{Ticket, VersionVector, TICKET_SIZE};

mod pos;
mod rht;

pub use pos::{TreeNodeId, TreePos};
pub use rht::{Rht, RhtNode};
use rht::{DeadAttr, RhtOutcome};

pub type NodeIdx = usize;

/// The result of a style call: the pairs which became dead, and the change in live size.
pub type StyleResult = (SmallVec<[GCPair; 4]>, DataSize);

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TreeNodeKind {
    Element(SmartString),
    Text(SmartString),
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub(crate) id: TreeNodeId,
    pub(crate) kind: TreeNodeKind,
    pub(crate) parent: Option<NodeIdx>,
    pub(crate) children: SmallVec<[NodeIdx; 4]>,
    pub(crate) removed_at: Option<Ticket>,
    pub(crate) attrs: Rht,
}

impl TreeNode {
    fn new(id: TreeNodeId, kind: TreeNodeKind, parent: Option<NodeIdx>) -> Self {
        Self { id, kind, parent, children: SmallVec::new(), removed_at: None, attrs: Rht::new() }
    }

    pub fn id(&self) -> TreeNodeId { self.id }
    pub fn kind(&self) -> &TreeNodeKind { &self.kind }
    pub fn attrs(&self) -> &Rht { &self.attrs }
    pub fn removed_at(&self) -> Option<Ticket> { self.removed_at }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, TreeNodeKind::Text(_))
    }

    pub fn is_removed(&self) -> bool {
        self.removed_at.is_some()
    }

    /// Size of the node itself, not counting its attributes.
    pub fn data_size(&self) -> DataSize {
        let data = match &self.kind {
            TreeNodeKind::Element(_) => 0,
            TreeNodeKind::Text(value) => 2 * value.encode_utf16().count() as i64,
        };
        DataSize { data, meta: TICKET_SIZE }
    }

    /// A node can be styled by a write if the author of that write had already seen the node get
    /// created, and the node hadn't been removed before the write happened.
    ///
    /// `client_lamport` is how far the author had seen of the node creator's edits.
    fn can_style(&self, executed_at: &Ticket, client_lamport: i64) -> bool {
        if self.is_text() { return false; }

        let existed = self.id.created_at.lamport() <= client_lamport;
        existed && self.removed_at.map_or(true, |removed| executed_at.after(&removed))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Token { Start, End, Text }

#[derive(Debug, Clone)]
pub struct CrdtTree {
    created_at: Ticket,
    nodes: Vec<TreeNode>,
    index: BTreeMap<TreeNodeId, NodeIdx>,
}

const ROOT_IDX: NodeIdx = 0;

impl CrdtTree {
    /// Create a tree with a single root element. The tree as a whole is identified by the root
    /// node's creation ticket.
    pub fn new(root_id: TreeNodeId, root_type: &str) -> Self {
        let mut index = BTreeMap::new();
        index.insert(root_id, ROOT_IDX);
        Self {
            created_at: root_id.created_at,
            nodes: vec![TreeNode::new(root_id, TreeNodeKind::Element(root_type.into()), None)],
            index,
        }
    }

    pub fn created_at(&self) -> Ticket { self.created_at }

    pub fn root_id(&self) -> TreeNodeId {
        self.nodes[ROOT_IDX].id
    }

    pub fn find(&self, id: &TreeNodeId) -> Option<&TreeNode> {
        self.index.get(id).map(|idx| &self.nodes[*idx])
    }

    /// Live attributes of a node. Returns None if the node doesn't exist.
    pub fn attrs_of(&self, id: &TreeNodeId) -> Option<&Rht> {
        self.find(id).map(|n| &n.attrs)
    }

    /// Number of nodes physically in the tree, tombstones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // There's always a root.
        false
    }

    fn idx_of_element(&self, id: &TreeNodeId) -> Result<NodeIdx> {
        let idx = *self.index.get(id).ok_or(TreeError::NodeNotFound(*id))?;
        if self.nodes[idx].is_text() {
            return Err(TreeError::TextParent(*id));
        }
        Ok(idx)
    }

    fn push_child(&mut self, parent: &TreeNodeId, id: TreeNodeId, kind: TreeNodeKind) -> Result<DataSize> {
        let parent_idx = self.idx_of_element(parent)?;
        // Inserting a node we already have is a no-op. This happens on redelivery.
        if self.index.contains_key(&id) { return Ok(DataSize::ZERO); }

        let idx = self.nodes.len();
        let node = TreeNode::new(id, kind, Some(parent_idx));
        let size = node.data_size();
        self.nodes.push(node);
        self.nodes[parent_idx].children.push(idx);
        self.index.insert(id, idx);
        Ok(size)
    }

    /// Append an element to the end of parent's children. Returns the size added.
    pub fn insert_element(&mut self, parent: &TreeNodeId, id: TreeNodeId, node_type: &str) -> Result<DataSize> {
        self.push_child(parent, id, TreeNodeKind::Element(node_type.into()))
    }

    pub fn insert_text(&mut self, parent: &TreeNodeId, id: TreeNodeId, value: &str) -> Result<DataSize> {
        self.push_child(parent, id, TreeNodeKind::Text(value.into()))
    }

    /// Tombstone a node and everything under it. If a node is removed twice the earliest removal
    /// is kept.
    pub fn remove_node(&mut self, id: &TreeNodeId, at: Ticket) -> Result<()> {
        let idx = *self.index.get(id).ok_or(TreeError::NodeNotFound(*id))?;

        let mut stack = vec![idx];
        while let Some(idx) = stack.pop() {
            let node = &mut self.nodes[idx];
            if node.removed_at.map_or(true, |existing| existing.after(&at)) {
                node.removed_at = Some(at);
            }
            stack.extend(node.children.iter().copied());
        }
        Ok(())
    }

    /// Flatten the tree into document order. Returns the token list, plus for each node the index
    /// of its first token and the index of its last token.
    fn tokens(&self) -> (Vec<(NodeIdx, Token)>, Vec<usize>, Vec<usize>) {
        let mut tokens = Vec::with_capacity(self.nodes.len() * 2);
        let mut starts = vec![0; self.nodes.len()];
        let mut ends = vec![0; self.nodes.len()];

        // (node, children visited)
        let mut stack: Vec<(NodeIdx, bool)> = vec![(ROOT_IDX, false)];
        while let Some((idx, visited)) = stack.pop() {
            let node = &self.nodes[idx];
            if node.is_text() {
                starts[idx] = tokens.len();
                ends[idx] = tokens.len();
                tokens.push((idx, Token::Text));
            } else if visited {
                ends[idx] = tokens.len();
                tokens.push((idx, Token::End));
            } else {
                starts[idx] = tokens.len();
                tokens.push((idx, Token::Start));
                stack.push((idx, true));
                stack.extend(node.children.iter().rev().map(|c| (*c, false)));
            }
        }

        (tokens, starts, ends)
    }

    fn resolve_point(&self, pos: &TreePos, starts: &[usize], ends: &[usize]) -> Result<usize> {
        let parent_idx = self.idx_of_element(&pos.parent_id)?;
        let parent = &self.nodes[parent_idx];
        let offset = pos.offset as usize;

        if offset < parent.children.len() {
            Ok(starts[parent.children[offset]])
        } else if offset == parent.children.len() {
            Ok(ends[parent_idx])
        } else {
            Err(TreeError::InvalidPos {
                parent: pos.parent_id,
                offset: pos.offset,
                len: parent.children.len(),
            })
        }
    }

    /// Resolve a range to the set of elements whose opening tag falls inside it. Nothing is
    /// modified, so a bad range leaves the tree untouched.
    fn elements_in_range(&self, from: &TreePos, to: &TreePos) -> Result<Vec<NodeIdx>> {
        let (tokens, starts, ends) = self.tokens();
        let from_idx = self.resolve_point(from, &starts, &ends)?;
        let to_idx = self.resolve_point(to, &starts, &ends)?;
        if from_idx > to_idx { return Err(TreeError::InvalidRange); }

        Ok(tokens[from_idx..to_idx].iter()
            .filter(|(_, token)| *token == Token::Start)
            .map(|(idx, _)| *idx)
            .collect())
    }

    fn apply_in_range<F>(&mut self, from: &TreePos, to: &TreePos, executed_at: &Ticket,
                         version_vector: Option<&VersionVector>, mut f: F) -> Result<StyleResult>
        where F: FnMut(&mut Rht) -> RhtOutcome
    {
        let targets = self.elements_in_range(from, to)?;

        let mut pairs = SmallVec::new();
        let mut diff = DataSize::ZERO;
        for idx in targets {
            let node = &mut self.nodes[idx];

            // Local edits (no version vector) can see everything in the tree.
            let client_lamport = match version_vector {
                None => i64::MAX,
                Some(vv) => vv.version_of(&node.id.created_at.actor()),
            };
            if !node.can_style(executed_at, client_lamport) { continue; }

            let outcome = f(&mut node.attrs);
            diff += outcome.added;
            pairs.extend(outcome.dead.into_iter().map(|dead| to_gc_pair(node.id, dead)));
        }

        Ok((pairs, diff))
    }

    /// Set attributes on every element in `[from, to)`. Returns the assignments which became dead
    /// and the size of everything written.
    pub fn style(&mut self, from: &TreePos, to: &TreePos, attributes: &BTreeMap<SmartString, SmartString>,
                 executed_at: &Ticket, version_vector: Option<&VersionVector>) -> Result<StyleResult> {
        self.apply_in_range(from, to, executed_at, version_vector, |attrs| {
            let mut outcome = RhtOutcome::default();
            for (key, value) in attributes.iter() {
                let o = attrs.set(key.clone(), value.clone(), *executed_at);
                outcome.added += o.added;
                outcome.dead.extend(o.dead);
            }
            outcome
        })
    }

    /// Remove attributes from every element in `[from, to)`.
    pub fn remove_style(&mut self, from: &TreePos, to: &TreePos, keys: &[SmartString],
                        executed_at: &Ticket, version_vector: Option<&VersionVector>) -> Result<StyleResult> {
        self.apply_in_range(from, to, executed_at, version_vector, |attrs| {
            let mut outcome = RhtOutcome::default();
            for key in keys {
                let o = attrs.remove(key.clone(), *executed_at);
                outcome.added += o.added;
                outcome.dead.extend(o.dead);
            }
            outcome
        })
    }

    /// Physically drop a collected fragment. Only tombstones still occupy space in the tree -
    /// overwritten values were already replaced in place.
    pub(crate) fn purge(&mut self, fragment: &FragmentRef) -> bool {
        match self.index.get(&fragment.node) {
            Some(idx) => self.nodes[*idx].attrs.purge(&fragment.key, fragment.at),
            None => false,
        }
    }

    pub fn data_size(&self) -> DataSize {
        let mut size = DataSize::ZERO;
        for node in self.nodes.iter().filter(|n| !n.is_removed()) {
            size += node.data_size();
            size += node.attrs.data_size();
        }
        size
    }

    pub(crate) fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub(crate) fn index(&self) -> &BTreeMap<TreeNodeId, NodeIdx> {
        &self.index
    }

    /// Render the live tree as XML. Attributes are printed in key order.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(ROOT_IDX, &mut out);
        out
    }

    fn write_xml(&self, idx: NodeIdx, out: &mut String) {
        let node = &self.nodes[idx];
        if node.is_removed() { return; }

        match &node.kind {
            TreeNodeKind::Text(value) => out.push_str(value),
            TreeNodeKind::Element(name) => {
                // Writing to a String can't fail.
                let _ = write!(out, "<{}", name);
                for (key, value) in node.attrs.iter() {
                    let _ = write!(out, " {}=\"{}\"", key, value);
                }
                out.push('>');
                for child in node.children.iter() {
                    self.write_xml(*child, out);
                }
                let _ = write!(out, "</{}>", name);
            }
        }
    }
}

fn to_gc_pair(node: TreeNodeId, dead: DeadAttr) -> GCPair {
    GCPair {
        created: FragmentRef::new(node, dead.key.clone(), dead.created_at),
        removed: FragmentRef::new(node, dead.key, dead.removed_at),
        size: dead.size,
    }
}
