use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use crate::time::{ActorId, Ticket};

/// A version vector maps each actor to the highest lamport clock value we've applied from that
/// actor. Entries only ever move forward.
///
/// This is stored in a BTreeMap so iteration order (and thus anything derived from it) is the same
/// on every replica.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct VersionVector(BTreeMap<ActorId, i64>);

impl VersionVector {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, actor: &ActorId) -> Option<i64> {
        self.0.get(actor).copied()
    }

    /// The lamport value seen from actor, or 0 if we haven't heard from them.
    pub fn version_of(&self, actor: &ActorId) -> i64 {
        self.get(actor).unwrap_or(0)
    }

    /// Raise actor's entry to lamport. Lower values are ignored.
    pub fn set(&mut self, actor: ActorId, lamport: i64) {
        match self.0.entry(actor) {
            Entry::Vacant(e) => { e.insert(lamport); }
            Entry::Occupied(mut e) => {
                if *e.get() < lamport { e.insert(lamport); }
            }
        }
    }

    pub fn unset(&mut self, actor: &ActorId) {
        self.0.remove(actor);
    }

    /// Has the change which issued this ticket already been applied?
    pub fn covers(&self, ticket: &Ticket) -> bool {
        self.version_of(&ticket.actor()) >= ticket.lamport()
    }

    /// True if every entry in other is matched or exceeded here.
    pub fn after_or_equal(&self, other: &VersionVector) -> bool {
        other.0.iter().all(|(actor, lamport)| self.version_of(actor) >= *lamport)
    }

    /// Pairwise maximum.
    #[must_use]
    pub fn max(&self, other: &VersionVector) -> VersionVector {
        let mut result = self.clone();
        for (actor, lamport) in other.0.iter() {
            result.set(*actor, *lamport);
        }
        result
    }

    /// Pairwise minimum. An actor missing on either side counts as 0 and is dropped from the
    /// result, since nothing from it can be assumed seen by both.
    #[must_use]
    pub fn min(&self, other: &VersionVector) -> VersionVector {
        VersionVector(self.0.iter().filter_map(|(actor, lamport)| {
            other.get(actor).map(|o| (*actor, i64::min(*lamport, o)))
        }).collect())
    }

    pub fn max_lamport(&self) -> i64 {
        self.0.values().copied().max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ActorId, &i64)> {
        self.0.iter()
    }
}

impl FromIterator<(ActorId, i64)> for VersionVector {
    fn from_iter<T: IntoIterator<Item = (ActorId, i64)>>(iter: T) -> Self {
        let mut vv = VersionVector::new();
        for (actor, lamport) in iter {
            vv.set(actor, lamport);
        }
        vv
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::time::ACTOR_ID_SIZE;

    fn actor(b: u8) -> ActorId { ActorId::new([b; ACTOR_ID_SIZE]) }

    #[test]
    fn set_is_monotonic() {
        let mut vv = VersionVector::new();
        vv.set(actor(1), 5);
        vv.set(actor(1), 3);
        assert_eq!(vv.get(&actor(1)), Some(5));
        assert_eq!(vv.version_of(&actor(2)), 0);

        vv.unset(&actor(1));
        assert!(vv.is_empty());
    }

    #[test]
    fn covers_tickets() {
        let vv: VersionVector = [(actor(1), 5)].into_iter().collect();
        assert!(vv.covers(&Ticket::new(5, 3, actor(1))));
        assert!(!vv.covers(&Ticket::new(6, 0, actor(1))));
        assert!(!vv.covers(&Ticket::new(1, 0, actor(2))));
    }

    #[test]
    fn min_and_max() {
        let a: VersionVector = [(actor(1), 5), (actor(2), 1)].into_iter().collect();
        let b: VersionVector = [(actor(1), 3), (actor(3), 9)].into_iter().collect();

        let max = a.max(&b);
        assert_eq!(max.version_of(&actor(1)), 5);
        assert_eq!(max.version_of(&actor(2)), 1);
        assert_eq!(max.version_of(&actor(3)), 9);
        assert_eq!(max.max_lamport(), 9);

        let min = a.min(&b);
        assert_eq!(min.len(), 1);
        assert_eq!(min.get(&actor(1)), Some(3));

        assert!(max.after_or_equal(&a));
        assert!(max.after_or_equal(&b));
        assert!(!a.after_or_equal(&b));
    }
}
