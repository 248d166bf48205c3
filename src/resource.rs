use std::fmt::{Display, Formatter};
use std::ops::{AddAssign, Neg, SubAssign};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A signed count of bytes. `data` is user content (keys, values). `meta` is bookkeeping - mostly
/// tickets.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DataSize {
    pub data: i64,
    pub meta: i64,
}

impl DataSize {
    pub const ZERO: DataSize = DataSize { data: 0, meta: 0 };

    pub fn new(data: i64, meta: i64) -> Self {
        Self { data, meta }
    }

    pub fn add(&mut self, other: DataSize) {
        self.data += other.data;
        self.meta += other.meta;
    }

    pub fn sub(&mut self, other: DataSize) {
        self.data -= other.data;
        self.meta -= other.meta;
    }

    pub fn total(&self) -> i64 {
        self.data + self.meta
    }

    pub fn is_zero(&self) -> bool {
        self.data == 0 && self.meta == 0
    }
}

impl AddAssign for DataSize {
    fn add_assign(&mut self, rhs: Self) {
        self.add(rhs);
    }
}

impl SubAssign for DataSize {
    fn sub_assign(&mut self, rhs: Self) {
        self.sub(rhs);
    }
}

impl Neg for DataSize {
    type Output = DataSize;

    fn neg(self) -> Self::Output {
        DataSize { data: -self.data, meta: -self.meta }
    }
}

impl Display for DataSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{data: {}, meta: {}}}", self.data, self.meta)
    }
}

/// The size of a document, split into what is live and what is dead but still waiting on the
/// garbage collector.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DocSize {
    pub live: DataSize,
    pub gc: DataSize,
}

impl DocSize {
    pub fn total(&self) -> i64 {
        self.live.total() + self.gc.total()
    }
}
