//! Logical time. Every change to a document is stamped with a [`Ticket`], and each replica tracks
//! what it has seen from every other replica with a [`VersionVector`].

use std::fmt::{Debug, Display, Formatter};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod ticket;
mod version_vector;

pub use ticket::{Ticket, TICKET_SIZE};
pub use version_vector::VersionVector;

pub const ACTOR_ID_SIZE: usize = 12;

/// The identity of a replica. Actor IDs are opaque 12 byte values handed out by whatever system
/// sits in front of the document. The all-zero ID is reserved for operations which were authored
/// locally before the replica learned its real identity.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActorId(pub [u8; ACTOR_ID_SIZE]);

impl ActorId {
    /// Placeholder actor used before a replica is attached.
    pub const INITIAL: ActorId = ActorId([0; ACTOR_ID_SIZE]);
    pub const MAX: ActorId = ActorId([u8::MAX; ACTOR_ID_SIZE]);

    pub fn new(bytes: [u8; ACTOR_ID_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse an actor from its 24 character hex representation.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != ACTOR_ID_SIZE * 2 || !s.is_ascii() { return None; }

        let mut bytes = [0u8; ACTOR_ID_SIZE];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(bytes))
    }

    pub fn is_initial(&self) -> bool {
        *self == Self::INITIAL
    }

    pub fn as_bytes(&self) -> &[u8; ACTOR_ID_SIZE] {
        &self.0
    }
}

impl From<[u8; ACTOR_ID_SIZE]> for ActorId {
    fn from(bytes: [u8; ACTOR_ID_SIZE]) -> Self {
        Self(bytes)
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl Debug for ActorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ActorId({})", self)
    }
}
