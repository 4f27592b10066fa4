//! # Entity Management
//!
//! Entities are plain integer identifiers handed out by a strictly
//! increasing counter. An id is never reused while the engine exists,
//! although the storage it occupied may be.

use std::fmt;

/// Unique identifier for an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an entity id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partition tag grouping entities into independent namespaces.
///
/// Every engine owns [`PoolId::DEFAULT`]; other pools come into existence the
/// first time an entity is created in them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PoolId(pub u32);

impl PoolId {
    /// The pool every engine starts with.
    pub const DEFAULT: Self = Self(u32::MAX);
}

impl Default for PoolId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::DEFAULT {
            f.write_str("default")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Strictly increasing entity id counter.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    next: u64,
}

impl EntityAllocator {
    /// Creates an allocator starting at id 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Issues the next id.
    #[inline]
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids issued so far.
    #[inline]
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert!(a < b);
        assert_eq!(alloc.issued(), 2);
    }

    #[test]
    fn test_default_pool() {
        assert_eq!(PoolId::default(), PoolId::DEFAULT);
        assert_eq!(PoolId::DEFAULT.to_string(), "default");
        assert_eq!(PoolId(3).to_string(), "3");
    }
}
