//! # Owner identity.
//!
//! Every [`Dispatcher`](crate::Dispatcher) draws a fresh [`OwnerId`] at construction.
//! Registry slots are scoped by it, so detaching one owner never touches another owner's
//! entries even when both use the same key id.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Global counter for owner identities.
static OWNER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Stable, process-unique identity of a dispatcher instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Allocates the next unused identity.
    pub fn next() -> Self {
        Self(OWNER_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Returns the raw numeric value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_is_unique() {
        let a = OwnerId::next();
        let b = OwnerId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn test_display() {
        let id = OwnerId(7);
        assert_eq!(id.to_string(), "owner#7");
    }
}
