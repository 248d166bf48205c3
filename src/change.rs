//! Changes group the operations from a single local edit. A change carries the author's clock and
//! version vector, which every operation in it is applied against.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::trace;
use crate::error::Result;
use crate::operation::Operation;
use crate::root::Root;
use crate::time::{ActorId, Ticket, VersionVector};

/// Identifies a change, and records what its author had seen when they made it.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChangeId {
    client_seq: u32,
    lamport: i64,
    actor: ActorId,
    version_vector: VersionVector,
}

impl ChangeId {
    pub fn new(client_seq: u32, lamport: i64, actor: ActorId, version_vector: VersionVector) -> Self {
        Self { client_seq, lamport, actor, version_vector }
    }

    /// The ID of the change after this one from the same replica.
    #[must_use]
    pub fn next(&self) -> ChangeId {
        let lamport = self.lamport + 1;
        let mut version_vector = self.version_vector.clone();
        version_vector.set(self.actor, lamport);
        ChangeId {
            client_seq: self.client_seq + 1,
            lamport,
            actor: self.actor,
            version_vector,
        }
    }

    /// Catch our clock up with a change we've received.
    #[must_use]
    pub fn sync_clocks(&self, other: &ChangeId) -> ChangeId {
        let lamport = i64::max(self.lamport, other.lamport);
        let mut version_vector = self.version_vector.max(&other.version_vector);
        version_vector.set(self.actor, lamport);
        ChangeId {
            client_seq: self.client_seq,
            lamport,
            actor: self.actor,
            version_vector,
        }
    }

    /// Issue a ticket within this change. Tickets in one change share a lamport value and are
    /// told apart by delimiter.
    pub fn new_ticket(&self, delimiter: u32) -> Ticket {
        Ticket::new(self.lamport, delimiter, self.actor)
    }

    /// Move this ID over to a different actor, carrying the version vector entry with it.
    #[must_use]
    pub fn set_actor(&self, actor: ActorId) -> ChangeId {
        let mut version_vector = self.version_vector.clone();
        if version_vector.get(&self.actor).is_some() {
            version_vector.unset(&self.actor);
            version_vector.set(actor, self.lamport);
        }
        ChangeId { actor, version_vector, ..*self }
    }

    pub fn client_seq(&self) -> u32 { self.client_seq }
    pub fn lamport(&self) -> i64 { self.lamport }
    pub fn actor(&self) -> ActorId { self.actor }
    pub fn version_vector(&self) -> &VersionVector { &self.version_vector }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Origin {
    /// Made on this replica, against its current state.
    Local,
    /// Received from another replica.
    Remote,
}

#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Change {
    id: ChangeId,
    operations: Vec<Operation>,
    message: Option<String>,
}

impl Change {
    pub fn new(id: ChangeId, operations: Vec<Operation>, message: Option<String>) -> Self {
        Self { id, operations, message }
    }

    /// Apply every operation in order. Remote changes are applied against the author's version
    /// vector. Local ones see the whole document.
    ///
    /// This stops at the first failing operation. Operations before it stay applied, so callers
    /// wanting all-or-nothing should run this against a copy of the root.
    pub fn execute(&self, root: &mut Root, origin: Origin) -> Result<()> {
        let version_vector = match origin {
            Origin::Local => None,
            Origin::Remote => Some(&self.id.version_vector),
        };

        for op in self.operations.iter() {
            op.execute(root, version_vector)?;
        }

        trace!(actor = %self.id.actor, lamport = self.id.lamport, ops = self.operations.len(), "executed change");
        Ok(())
    }

    /// Attribute this change (and everything in it) to actor. Only valid before the change has
    /// been sent to anyone.
    pub fn set_actor(&mut self, actor: ActorId) {
        self.id = self.id.set_actor(actor);
        for op in self.operations.iter_mut() {
            op.set_actor(actor);
        }
    }

    pub fn id(&self) -> &ChangeId { &self.id }
    pub fn operations(&self) -> &[Operation] { &self.operations }
    pub fn message(&self) -> Option<&str> { self.message.as_deref() }
}

/// Collects the operations of a local edit, handing out a fresh ticket for each.
#[derive(Debug)]
pub struct ChangeContext {
    id: ChangeId,
    delimiter: u32,
    operations: Vec<Operation>,
    message: Option<String>,
}

impl ChangeContext {
    pub fn new(id: ChangeId, message: Option<String>) -> Self {
        Self { id, delimiter: 0, operations: Vec::new(), message }
    }

    pub fn issue_ticket(&mut self) -> Ticket {
        self.delimiter += 1;
        self.id.new_ticket(self.delimiter)
    }

    pub fn push(&mut self, op: impl Into<Operation>) {
        self.operations.push(op.into());
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn into_change(self) -> Change {
        Change::new(self.id, self.operations, self.message)
    }
}
