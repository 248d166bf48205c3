use std::fmt::{Debug, Display, Formatter};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use crate::time::{ActorId, ACTOR_ID_SIZE};

/// Bytes a ticket takes up when counted towards a document's size. (lamport + delimiter + actor)
pub const TICKET_SIZE: i64 = 8 + 4 + ACTOR_ID_SIZE as i64;

/// A ticket is a logical timestamp. Tickets are totally ordered across all replicas by
/// (lamport, delimiter, actor). The delimiter separates the tickets issued within a single change,
/// which all share the same lamport clock value.
///
/// Field order matters here - the derived `Ord` compares fields in declaration order.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ticket {
    lamport: i64,
    delimiter: u32,
    actor: ActorId,
}

impl Ticket {
    pub const INITIAL: Ticket = Ticket { lamport: 0, delimiter: 0, actor: ActorId::INITIAL };
    pub const MAX: Ticket = Ticket { lamport: i64::MAX, delimiter: u32::MAX, actor: ActorId::MAX };

    pub const fn new(lamport: i64, delimiter: u32, actor: ActorId) -> Self {
        Self { lamport, delimiter, actor }
    }

    pub fn lamport(&self) -> i64 { self.lamport }
    pub fn delimiter(&self) -> u32 { self.delimiter }
    pub fn actor(&self) -> ActorId { self.actor }

    /// Returns a copy of this ticket attributed to a different actor. The lamport and delimiter
    /// components are left alone.
    #[must_use]
    pub fn set_actor(&self, actor: ActorId) -> Ticket {
        Ticket { actor, ..*self }
    }

    /// Is this ticket strictly later than other?
    pub fn after(&self, other: &Ticket) -> bool {
        self > other
    }
}

impl Display for Ticket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.lamport, self.delimiter, self.actor)
    }
}

impl Debug for Ticket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ticket({})", self)
    }
}
