//! The attribute table on each element node. Every key is its own last-writer-wins register,
//! ordered by ticket.
//!
//! Writes which lose (because a later write already landed) are not simply dropped. The losing
//! value is still created, just dead on arrival, and reported so it can be paired for collection.
//! That way every replica ends up with the same set of dead fragments no matter what order the
//! writes were delivered in.

use std::collections::BTreeMap;
use smallvec::SmallVec;
use smartstring::alias::String as SmartString;
use crate::resource::DataSize;
use crate::time::{Ticket, TICKET_SIZE};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RhtNode {
    pub(crate) key: SmartString,
    pub(crate) value: SmartString,
    pub(crate) updated_at: Ticket,
    pub(crate) is_removed: bool,
}

fn utf16_len(s: &str) -> i64 {
    s.encode_utf16().count() as i64
}

impl RhtNode {
    fn new(key: SmartString, value: SmartString, updated_at: Ticket, is_removed: bool) -> Self {
        Self { key, value, updated_at, is_removed }
    }

    pub fn key(&self) -> &str { &self.key }
    pub fn value(&self) -> &str { &self.value }
    pub fn updated_at(&self) -> Ticket { self.updated_at }
    pub fn is_removed(&self) -> bool { self.is_removed }

    /// Strings are counted in UTF-16 code units, 2 bytes each.
    pub fn data_size(&self) -> DataSize {
        DataSize {
            data: 2 * (utf16_len(&self.key) + utf16_len(&self.value)),
            meta: TICKET_SIZE,
        }
    }
}

/// An assignment which is now dead. `removed_at` is the write which shadows it. For tombstones
/// that's the tombstone's own ticket.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct DeadAttr {
    pub key: SmartString,
    pub created_at: Ticket,
    pub removed_at: Ticket,
    pub size: DataSize,
}

impl DeadAttr {
    fn superseded(node: &RhtNode, removed_at: Ticket) -> Self {
        Self {
            key: node.key.clone(),
            created_at: node.updated_at,
            removed_at,
            size: node.data_size(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RhtOutcome {
    pub dead: SmallVec<[DeadAttr; 2]>,

    /// Bytes of every fragment this write created, dead or alive.
    pub added: DataSize,
}

#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Rht {
    nodes: BTreeMap<SmartString, RhtNode>,

    /// For keys whose tombstone has been collected, the newest collected tombstone. Writes older
    /// than this still lose, even though there's no entry left to lose to.
    floors: BTreeMap<SmartString, Ticket>,
}

impl Rht {
    pub fn new() -> Self { Self::default() }

    /// The ticket a new write to key has to beat.
    fn latest(&self, key: &str) -> Option<Ticket> {
        self.nodes.get(key)
            .map(|n| n.updated_at)
            .or_else(|| self.floors.get(key).copied())
    }

    fn live_node(&self, key: &str) -> Option<&RhtNode> {
        self.nodes.get(key).filter(|n| !n.is_removed)
    }

    pub(crate) fn set(&mut self, key: SmartString, value: SmartString, at: Ticket) -> RhtOutcome {
        let mut outcome = RhtOutcome::default();

        let latest = self.latest(&key);
        // Seen it.
        if latest == Some(at) { return outcome; }

        let node = RhtNode::new(key, value, at, false);
        outcome.added = node.data_size();

        match latest {
            Some(latest) if !at.after(&latest) => {
                // Lost to a later write. The value is dead on arrival.
                outcome.dead.push(DeadAttr::superseded(&node, latest));
            }
            _ => {
                // A tombstone was already paired when it was written.
                if let Some(e) = self.live_node(&node.key) {
                    outcome.dead.push(DeadAttr::superseded(e, at));
                }
                self.nodes.insert(node.key.clone(), node);
            }
        }

        outcome
    }

    pub(crate) fn remove(&mut self, key: SmartString, at: Ticket) -> RhtOutcome {
        let mut outcome = RhtOutcome::default();

        let latest = self.latest(&key);
        if latest == Some(at) { return outcome; }

        let tombstone = RhtNode::new(key, SmartString::new(), at, true);
        outcome.added = tombstone.data_size();

        match latest {
            Some(latest) if !at.after(&latest) => {
                outcome.dead.push(DeadAttr::superseded(&tombstone, at));
            }
            _ => {
                if let Some(e) = self.live_node(&tombstone.key) {
                    outcome.dead.push(DeadAttr::superseded(e, at));
                }
                outcome.dead.push(DeadAttr::superseded(&tombstone, at));
                self.nodes.insert(tombstone.key.clone(), tombstone);
            }
        }

        outcome
    }

    /// Physically drop the tombstone written to key at `at`, leaving its ticket behind as a floor
    /// for later writes. Returns false if the entry has since been overwritten (or was never a
    /// tombstone), in which case nothing changes.
    pub(crate) fn purge(&mut self, key: &str, at: Ticket) -> bool {
        match self.nodes.get(key) {
            Some(e) if e.is_removed && e.updated_at == at => {
                self.nodes.remove(key);
                let floor = self.floors.entry(key.into()).or_insert(at);
                if at.after(floor) { *floor = at; }
                true
            }
            _ => false,
        }
    }

    /// Live value of key, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.nodes.get(key)
            .filter(|n| !n.is_removed)
            .map(|n| n.value.as_str())
    }

    pub fn get_node(&self, key: &str) -> Option<&RhtNode> {
        self.nodes.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate live (key, value) pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes.values()
            .filter(|n| !n.is_removed)
            .map(|n| (n.key.as_str(), n.value.as_str()))
    }

    /// Every node, including tombstones.
    pub fn nodes(&self) -> impl Iterator<Item = &RhtNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the live entries.
    pub fn data_size(&self) -> DataSize {
        let mut size = DataSize::ZERO;
        for n in self.nodes.values().filter(|n| !n.is_removed) {
            size += n.data_size();
        }
        size
    }
}
