//! The root of a document replica: every element, the pending garbage, and the size accounting.
//!
//! The root is plain shared state. It doesn't lock anything - whoever owns the root is expected to
//! apply operations to it one at a time.

use std::collections::BTreeMap;
use smartstring::alias::String as SmartString;
use tracing::debug;
use crate::gc::{FragmentRef, GCPair};
use crate::resource::{DataSize, DocSize};
use crate::time::{Ticket, VersionVector, TICKET_SIZE};
use crate::tree::CrdtTree;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Primitive {
    Null,
    Bool(bool),
    Integer(i64),
    String(SmartString),
}

/// Something stored in the document, addressed by the ticket it was created at.
#[derive(Debug, Clone)]
pub enum Element {
    Primitive(Ticket, Primitive),
    Tree(CrdtTree),
}

impl Element {
    pub fn created_at(&self) -> Ticket {
        match self {
            Element::Primitive(created_at, _) => *created_at,
            Element::Tree(tree) => tree.created_at(),
        }
    }

    pub fn data_size(&self) -> DataSize {
        match self {
            Element::Primitive(_, p) => {
                let data = match p {
                    Primitive::Null => 0,
                    Primitive::Bool(_) => 1,
                    Primitive::Integer(_) => 8,
                    Primitive::String(s) => 2 * s.encode_utf16().count() as i64,
                };
                DataSize { data, meta: TICKET_SIZE }
            }
            Element::Tree(tree) => tree.data_size(),
        }
    }

    pub fn as_tree(&self) -> Option<&CrdtTree> {
        match self {
            Element::Tree(tree) => Some(tree),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Root {
    elements: BTreeMap<Ticket, Element>,

    /// Dead fragments waiting to be collected, keyed by the fragment itself.
    gc_pairs: BTreeMap<FragmentRef, GCPair>,

    doc_size: DocSize,
}

impl Root {
    pub fn new() -> Self { Self::default() }

    /// Add an element to the document. Its current size is counted as live.
    pub fn register_element(&mut self, element: Element) {
        self.doc_size.live += element.data_size();
        self.elements.insert(element.created_at(), element);
    }

    /// Drop an element from the registry entirely. Its live size is released.
    pub fn deregister_element(&mut self, created_at: &Ticket) -> Option<Element> {
        let element = self.elements.remove(created_at)?;
        self.doc_size.live -= element.data_size();
        Some(element)
    }

    pub fn find_by_created_at(&self, created_at: &Ticket) -> Option<&Element> {
        self.elements.get(created_at)
    }

    pub fn find_by_created_at_mut(&mut self, created_at: &Ticket) -> Option<&mut Element> {
        self.elements.get_mut(created_at)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Queue a dead fragment for collection. Registering the same fragment twice does nothing.
    /// Returns true if the pair was newly added.
    pub fn register_gc_pair(&mut self, pair: GCPair) -> bool {
        if self.gc_pairs.contains_key(&pair.created) { return false; }

        self.doc_size.gc += pair.size;
        self.gc_pairs.insert(pair.created.clone(), pair);
        true
    }

    /// The tree reports the size of everything an edit wrote. Fragments which are already dead
    /// belong to the gc ledger instead, so take them back out of the live diff.
    pub fn adjust_diff_for_gc_pair(&self, diff: &mut DataSize, pair: &GCPair) {
        *diff -= pair.size;
    }

    /// Accumulate a change in live size.
    pub fn acc(&mut self, diff: DataSize) {
        self.doc_size.live += diff;
    }

    pub fn doc_size(&self) -> DocSize {
        self.doc_size
    }

    pub fn gc_pairs(&self) -> impl Iterator<Item = &GCPair> {
        self.gc_pairs.values()
    }

    pub fn gc_pair_len(&self) -> usize {
        self.gc_pairs.len()
    }

    pub fn has_gc_pair(&self, created: &FragmentRef) -> bool {
        self.gc_pairs.contains_key(created)
    }

    /// Physically reclaim every fragment whose removal has been seen by all replicas.
    /// `min_synced` is the pairwise minimum of every replica's version vector.
    ///
    /// Writes concurrent with a collected removal can still be in flight. A collected tombstone
    /// leaves its ticket behind in the attribute table, so those writes still lose when they land.
    ///
    /// Returns the number of pairs collected.
    pub fn garbage_collect(&mut self, min_synced: &VersionVector) -> usize {
        let collectable: Vec<FragmentRef> = self.gc_pairs.iter()
            .filter(|(_, pair)| pair.is_collectable(min_synced))
            .map(|(key, _)| key.clone())
            .collect();

        for key in collectable.iter() {
            let Some(pair) = self.gc_pairs.remove(key) else { continue; };
            self.doc_size.gc -= pair.size;

            if pair.is_tombstone() {
                self.purge_from_trees(&pair.created);
            }
        }

        if !collectable.is_empty() {
            debug!(count = collectable.len(), remaining = self.gc_pairs.len(), "collected garbage");
        }
        collectable.len()
    }

    fn purge_from_trees(&mut self, fragment: &FragmentRef) {
        for element in self.elements.values_mut() {
            if let Element::Tree(tree) = element {
                if tree.purge(fragment) { return; }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::time::{ActorId, ACTOR_ID_SIZE};
    use crate::tree::TreeNodeId;

    fn t(lamport: i64) -> Ticket {
        Ticket::new(lamport, 0, ActorId::new([1; ACTOR_ID_SIZE]))
    }

    fn pair(created: i64, removed: i64) -> GCPair {
        let node = TreeNodeId::from(t(1));
        GCPair {
            created: FragmentRef::new(node, "bold".into(), t(created)),
            removed: FragmentRef::new(node, "bold".into(), t(removed)),
            size: DataSize::new(16, TICKET_SIZE),
        }
    }

    #[test]
    fn registering_is_idempotent() {
        let mut root = Root::new();
        assert!(root.register_gc_pair(pair(2, 3)));
        assert!(!root.register_gc_pair(pair(2, 3)));
        assert_eq!(root.gc_pair_len(), 1);
        assert_eq!(root.doc_size().gc, DataSize::new(16, TICKET_SIZE));
    }

    #[test]
    fn adjust_moves_size_out_of_diff() {
        let root = Root::new();
        let mut diff = DataSize::new(32, 2 * TICKET_SIZE);
        root.adjust_diff_for_gc_pair(&mut diff, &pair(2, 3));
        assert_eq!(diff, DataSize::new(16, TICKET_SIZE));
    }

    #[test]
    fn elements_by_ticket() {
        let mut root = Root::new();
        root.register_element(Element::Primitive(t(1), Primitive::Integer(5)));
        root.register_element(Element::Tree(CrdtTree::new(TreeNodeId::from(t(2)), "doc")));

        assert!(root.find_by_created_at(&t(1)).unwrap().as_tree().is_none());
        assert!(root.find_by_created_at(&t(2)).unwrap().as_tree().is_some());
        assert!(root.find_by_created_at(&t(3)).is_none());
        assert_eq!(root.doc_size().live, DataSize::new(8, 2 * TICKET_SIZE));

        root.deregister_element(&t(2));
        assert!(root.find_by_created_at(&t(2)).is_none());
        assert_eq!(root.doc_size().live, DataSize::new(8, TICKET_SIZE));
    }

    #[test]
    fn collects_only_synced_removals() {
        let mut root = Root::new();
        root.register_gc_pair(pair(2, 3));
        root.register_gc_pair(pair(4, 6));

        let vv: VersionVector = [(ActorId::new([1; ACTOR_ID_SIZE]), 5)].into_iter().collect();
        assert_eq!(root.garbage_collect(&vv), 1);
        assert_eq!(root.gc_pair_len(), 1);
        assert_eq!(root.doc_size().gc, DataSize::new(16, TICKET_SIZE));
        assert_eq!(root.garbage_collect(&vv), 0);
    }
}
