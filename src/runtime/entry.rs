//! # Registry entries and operation handles.
//!
//! - [`OperationId`] process-unique id of one keyed operation (compare-and-remove token)
//! - [`OperationHandle`] id + policy + [`CancellationToken`] of a running operation
//! - [`Entry`] a handle stored under `(OwnerId, KeyId)`
//! - [`Entries`] restartable snapshot returned by
//!   [`TaskRegistry::entries_for`](crate::TaskRegistry::entries_for)

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use tokio_util::sync::CancellationToken;

use crate::cancel::{CancelPolicy, KeyId, OwnerId};

/// Global counter for operation ids.
static OP_SEQ: AtomicU64 = AtomicU64::new(1);

/// Process-unique id of a keyed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u64);

impl OperationId {
    /// Allocates the next operation id.
    pub fn next() -> Self {
        Self(OP_SEQ.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Returns the raw numeric value.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// Cancellable handle to a keyed operation.
///
/// Clones share the same token: cancelling any clone cancels the operation.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    op: OperationId,
    policy: CancelPolicy,
    token: CancellationToken,
}

impl OperationHandle {
    /// Creates a handle with a fresh id and an uncancelled token.
    pub fn new(policy: CancelPolicy) -> Self {
        Self {
            op: OperationId::next(),
            policy,
            token: CancellationToken::new(),
        }
    }

    /// Returns the operation id.
    #[inline]
    pub fn op(&self) -> OperationId {
        self.op
    }

    /// Returns the policy the operation was dispatched with.
    #[inline]
    pub fn policy(&self) -> CancelPolicy {
        self.policy
    }

    /// Returns the token observed by the operation body.
    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Requests cooperative cancellation.
    #[inline]
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Registry entry: a handle stored under `(owner, key)`.
#[derive(Debug, Clone)]
pub struct Entry {
    owner: OwnerId,
    key: KeyId,
    handle: OperationHandle,
}

impl Entry {
    pub(crate) fn new(owner: OwnerId, key: KeyId, handle: OperationHandle) -> Self {
        Self { owner, key, handle }
    }

    /// Owner of the slot.
    #[inline]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Key identity of the slot.
    #[inline]
    pub fn key(&self) -> &KeyId {
        &self.key
    }

    /// Handle of the operation occupying the slot.
    #[inline]
    pub fn handle(&self) -> &OperationHandle {
        &self.handle
    }

    /// Shorthand for `handle().op()`.
    #[inline]
    pub fn op(&self) -> OperationId {
        self.handle.op
    }

    /// Shorthand for `handle().policy()`.
    #[inline]
    pub fn policy(&self) -> CancelPolicy {
        self.handle.policy
    }
}

/// Finite snapshot of registry entries, ordered by operation id.
///
/// The snapshot can be iterated any number of times; it does not change when the
/// registry does.
#[derive(Debug, Clone, Default)]
pub struct Entries {
    items: Vec<Entry>,
}

impl Entries {
    pub(crate) fn new(mut items: Vec<Entry>) -> Self {
        items.sort_unstable_by_key(Entry::op);
        Self { items }
    }

    /// Iterates over the snapshot.
    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.items.iter()
    }

    /// Number of entries in the snapshot.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the snapshot holds no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns `true` if any entry refers to `key`.
    pub fn contains_key(&self, key: &KeyId) -> bool {
        self.items.iter().any(|e| e.key() == key)
    }
}

impl<'a> IntoIterator for &'a Entries {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for Entries {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_clones_share_token() {
        let handle = OperationHandle::new(CancelPolicy::IN_FLIGHT);
        let clone = handle.clone();
        clone.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(handle.op(), clone.op());
    }

    #[test]
    fn test_entries_sorted_and_restartable() {
        let owner = OwnerId::next();
        let first = OperationHandle::new(CancelPolicy::LIFECYCLE);
        let second = OperationHandle::new(CancelPolicy::LIFECYCLE);
        let entries = Entries::new(vec![
            Entry::new(owner, KeyId::from("b"), second),
            Entry::new(owner, KeyId::from("a"), first),
        ]);

        let pass1: Vec<&KeyId> = entries.iter().map(Entry::key).collect();
        let pass2: Vec<&KeyId> = (&entries).into_iter().map(Entry::key).collect();
        assert_eq!(pass1, vec![&KeyId::from("a"), &KeyId::from("b")]);
        assert_eq!(pass1, pass2);
        assert!(entries.contains_key(&KeyId::from("b")));
        assert_eq!(entries.len(), 2);
    }
}
