//! # Slot collision policy
//!
//! Registry slots are identified by `(owner, key id)`. When a keyed dispatch **without**
//! [`CancelPolicy::IN_FLIGHT`](crate::CancelPolicy::IN_FLIGHT) finds its slot occupied,
//! the collision policy decides what happens. Dispatches with `IN_FLIGHT` always replace.
//!
//! ## Variants
//! - `Replace`: **cancel** the occupant and register the new operation.
//! - `DropIfRunning`: **refuse** the new operation; it resolves to [`Outcome::Rejected`](crate::Outcome::Rejected).
//! - `Evict`: overwrite the slot **without** cancelling the occupant. The occupant keeps
//!   running but is no longer tracked (not even by lifecycle cancellation); an
//!   [`EventKind::OperationEvicted`](crate::EventKind::OperationEvicted) event is published.
//!
//! ## Invariants
//! - With `Replace` and `DropIfRunning` every running keyed operation stays reachable from
//!   the registry until it finishes.

/// Policy controlling keyed dispatches that hit an occupied slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Cancel the occupant, then register the new operation.
    ///
    /// Use when:
    /// - A newer request always invalidates the older one
    /// - Nothing may run untracked
    #[default]
    Replace,

    /// Keep the occupant and refuse the new operation.
    ///
    /// Use when:
    /// - Redundant work should be avoided
    /// - Example: "refresh" pressed twice while loading
    DropIfRunning,

    /// Overwrite the slot and leave the occupant running untracked.
    ///
    /// Only for parity with designs that tolerate the leak.
    Evict,
}

impl CollisionPolicy {
    /// Short stable label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            CollisionPolicy::Replace => "replace",
            CollisionPolicy::DropIfRunning => "drop_if_running",
            CollisionPolicy::Evict => "evict",
        }
    }
}
