//! # Runtime events emitted by the registry and keyed operations.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Operation events**: keyed operation flow (started, completed, cancelled, panicked)
//! - **Registry events**: slot decisions (superseded, rejected, evicted, lifecycle, shutdown)
//! - **Subscriber events**: delivery problems (overflow, panic)
//!
//! The [`Event`] struct carries metadata such as timestamps, owner, key and operation id.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use taskreactor::{Event, EventKind, KeyId, OwnerId};
//!
//! let owner = OwnerId::next();
//! let ev = Event::new(EventKind::OperationSuperseded)
//!     .with_owner(owner)
//!     .with_key(&KeyId::from("search"))
//!     .with_reason("replaced by newer dispatch");
//!
//! assert_eq!(ev.kind, EventKind::OperationSuperseded);
//! assert_eq!(ev.owner, Some(owner));
//! assert_eq!(ev.key.as_deref(), Some("search"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::cancel::{KeyId, OwnerId};
use crate::runtime::OperationId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: subscriber name and panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full, worker closed or listener lagged).
    ///
    /// Sets:
    /// - `reason`: subscriber name and drop reason
    SubscriberOverflow,

    // === Operation events ===
    /// Keyed operation admitted into the registry and about to run.
    ///
    /// Sets: `owner`, `key`, `op`.
    OperationStarted,

    /// Keyed operation body returned without being cancelled.
    ///
    /// Sets: `owner`, `key`, `op`.
    OperationCompleted,

    /// Keyed operation body returned after its token was cancelled.
    ///
    /// Sets: `owner`, `key`, `op`.
    OperationCancelled,

    /// Operation body panicked; the panic was contained.
    ///
    /// Sets: `owner`, `reason` (panic message); `key`, `op` for keyed operations.
    OperationPanicked,

    // === Registry events ===
    /// Running operation was cancelled because a newer one took its slot.
    ///
    /// Sets: `owner`, `key`, `op` (the cancelled operation).
    OperationSuperseded,

    /// New operation was refused because its slot is occupied
    /// ([`CollisionPolicy::DropIfRunning`](crate::CollisionPolicy::DropIfRunning)).
    ///
    /// Sets: `owner`, `key`, `op` (the refused operation).
    OperationRejected,

    /// Occupant was overwritten without cancellation
    /// ([`CollisionPolicy::Evict`](crate::CollisionPolicy::Evict)); it keeps running untracked.
    ///
    /// Sets: `owner`, `key`, `op` (the evicted operation).
    OperationEvicted,

    /// Lifecycle-tagged operation was cancelled because its owner detached.
    ///
    /// Sets: `owner`, `key`, `op`.
    LifecycleCancelled,

    /// Registry actor stopped; every remaining entry was cancelled.
    ///
    /// Sets: `reason` (number of cancelled entries).
    RegistryShutdown,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Owner the event refers to.
    pub owner: Option<OwnerId>,
    /// Rendered key identity.
    pub key: Option<Arc<str>>,
    /// Keyed operation id.
    pub op: Option<OperationId>,
    /// Human-readable reason (panic messages, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            owner: None,
            key: None,
            op: None,
            reason: None,
        }
    }

    /// Attaches an owner.
    #[inline]
    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Attaches a key identity (rendered with `Display`).
    #[inline]
    pub fn with_key(mut self, key: &KeyId) -> Self {
        self.key = Some(key.to_string().into());
        self
    }

    /// Attaches an operation id.
    #[inline]
    pub fn with_op(mut self, op: OperationId) -> Self {
        self.op = Some(op);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates an operation event for `(owner, key, op)`.
    #[inline]
    pub(crate) fn operation(kind: EventKind, owner: OwnerId, key: &KeyId, op: OperationId) -> Self {
        Event::new(kind).with_owner(owner).with_key(key).with_op(op)
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }

    /// Returns `true` for events that mark the end of a keyed operation's run.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::OperationCompleted
                | EventKind::OperationCancelled
                | EventKind::OperationPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::OperationStarted);
        let b = Event::new(EventKind::OperationStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_operation_sets_metadata() {
        let owner = OwnerId::next();
        let op = OperationId::next();
        let ev = Event::operation(EventKind::OperationCancelled, owner, &KeyId::from(5u64), op);
        assert_eq!(ev.owner, Some(owner));
        assert_eq!(ev.op, Some(op));
        assert_eq!(ev.key.as_deref(), Some("#5"));
        assert!(ev.is_terminal());
    }

    #[test]
    fn test_subscriber_overflow_reason() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert_eq!(ev.kind, EventKind::SubscriberOverflow);
        assert_eq!(ev.reason.as_deref(), Some("subscriber=audit reason=full"));
        assert!(!ev.is_terminal());
    }
}
