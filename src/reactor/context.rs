//! # Execution context handed to action bodies.
//!
//! A [`Context`] gives a body access to the owner's [`Store`] and to the
//! cancellation token of the operation it runs in.
//!
//! - Unkeyed dispatches get a token nobody cancels.
//! - Keyed dispatches get the token stored in the registry entry.
//!
//! Cancellation is cooperative: bodies observe it through [`Context::is_cancelled`],
//! [`Context::cancelled`], [`Context::guard`] or [`Context::sleep`].

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cancel::{KeyId, OwnerId};
use crate::state::Store;

/// Per-operation view of the owner's state and cancellation token.
#[derive(Debug)]
pub struct Context<S> {
    store: Store<S>,
    token: CancellationToken,
    owner: OwnerId,
    key: Option<KeyId>,
}

impl<S> Clone for Context<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            token: self.token.clone(),
            owner: self.owner,
            key: self.key.clone(),
        }
    }
}

impl<S> Context<S> {
    pub(crate) fn new(
        store: Store<S>,
        token: CancellationToken,
        owner: OwnerId,
        key: Option<KeyId>,
    ) -> Self {
        Self {
            store,
            token,
            owner,
            key,
        }
    }

    /// Owner the operation belongs to.
    #[inline]
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Key identity of a keyed operation; `None` for unkeyed dispatch.
    #[inline]
    pub fn key(&self) -> Option<&KeyId> {
        self.key.as_ref()
    }

    /// The owner's state store.
    #[inline]
    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    /// See [`Store::read`]. Writing to the state from inside `f` deadlocks.
    pub fn read<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        self.store.read(f)
    }

    /// See [`Store::select`]. Writing to the state from inside `f` deadlocks.
    pub fn select<T: Clone>(&self, f: impl FnOnce(&S) -> &T) -> T {
        self.store.select(f)
    }

    /// See [`Store::update`].
    pub fn update(&self, f: impl FnOnce(&mut S)) {
        self.store.update(f);
    }

    /// See [`Store::modify_if`].
    pub fn modify_if(&self, f: impl FnOnce(&mut S) -> bool) -> bool {
        self.store.modify_if(f)
    }

    /// Token of the running operation.
    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns `true` once the operation was cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the operation is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Races `fut` against cancellation.
    ///
    /// Returns `None` if the operation was cancelled first; `fut` is dropped.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Sleeps for `dur` unless cancelled.
    ///
    /// Returns `true` if the full duration elapsed, `false` on cancellation.
    pub async fn sleep(&self, dur: Duration) -> bool {
        self.guard(tokio::time::sleep(dur)).await.is_some()
    }
}

impl<S: Clone> Context<S> {
    /// Snapshot of the owner's state.
    pub fn state(&self) -> S {
        self.store.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Context<u32> {
        Context::new(
            Store::new(0),
            CancellationToken::new(),
            OwnerId::next(),
            Some(KeyId::from("k")),
        )
    }

    #[test]
    fn test_state_access() {
        let cx = context();
        cx.update(|s| *s = 4);
        assert_eq!(cx.state(), 4);
        assert_eq!(cx.read(|s| *s * 2), 8);
        assert_eq!(cx.key(), Some(&KeyId::from("k")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_interrupted_by_cancel() {
        let cx = context();
        let token = cx.token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        assert!(!cx.sleep(Duration::from_secs(60)).await);
        assert!(cx.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_returns_output_when_live() {
        let cx = context();
        assert!(cx.sleep(Duration::from_millis(5)).await);
        assert_eq!(cx.guard(async { 9 }).await, Some(9));

        cx.token().cancel();
        assert_eq!(cx.guard(async { 9 }).await, None);
    }
}
