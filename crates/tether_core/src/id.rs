//! Monotonic identifier generation
//!
//! Ids are plain `u64` values handed out by an [`IdGenerator`]. Zero is
//! reserved as the null id so that a default-initialised id never collides
//! with a live one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A raw identifier value
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RawId(u64);

impl RawId {
    /// The reserved null id
    pub const NULL: Self = Self(0);

    /// Create from raw bits
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Get the raw bits
    #[inline]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Check if this id is null
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "RawId(null)")
        } else {
            write!(f, "RawId({})", self.0)
        }
    }
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Thread-safe id generator
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// Create a new generator. The first id handed out is 1.
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Generate the next unique id
    #[inline]
    pub fn next(&self) -> RawId {
        RawId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
