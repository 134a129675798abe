//! # State container.
//!
//! [`Store`] holds one reactor state value in a [`tokio::sync::watch`] channel.
//!
//! - **Reads** are snapshots ([`Store::get`]) or borrows scoped to a closure
//!   ([`Store::read`], [`Store::select`]).
//! - **Writes** go through [`Store::update`] / [`Store::modify_if`]; the closure runs under
//!   the channel's write lock, so mutations are serialized.
//! - **Observers** get a [`watch::Receiver`] from [`Store::subscribe`] and are woken
//!   after every mutation.
//!
//! ## Example
//! ```rust
//! use taskreactor::Store;
//!
//! #[derive(Clone, Default)]
//! struct Search { query: String, hits: usize }
//!
//! let store = Store::new(Search::default());
//! store.update(|s| s.query = "tokio".into());
//!
//! assert_eq!(store.select(|s| &s.query), "tokio");
//! assert_eq!(store.read(|s| s.hits), 0);
//! ```

use std::sync::Arc;

use tokio::sync::watch;

/// Shared, observable state cell.
///
/// Cheap to clone; clones refer to the same state.
#[derive(Debug)]
pub struct Store<S> {
    tx: Arc<watch::Sender<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<S> Store<S> {
    /// Creates a store holding `state`.
    pub fn new(state: S) -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(state)),
        }
    }

    /// Runs `f` against the current state.
    ///
    /// The read lock is held while `f` runs, so writers wait until it returns.
    ///
    /// # Deadlocks
    /// Calling [`Store::update`] or [`Store::modify_if`] on this store (or
    /// `Context::update` on a context sharing it) from inside `f` deadlocks.
    /// Copy out what you need and write after `read` returns.
    pub fn read<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        f(&self.tx.borrow())
    }

    /// Typed accessor: clones the field projected by `f`.
    ///
    /// Same locking as [`Store::read`]: writing to the store from `f` deadlocks.
    pub fn select<T: Clone>(&self, f: impl FnOnce(&S) -> &T) -> T {
        f(&self.tx.borrow()).clone()
    }

    /// Mutates the state and notifies observers.
    pub fn update(&self, f: impl FnOnce(&mut S)) {
        self.tx.send_modify(f);
    }

    /// Mutates the state; observers are notified only when `f` returns `true`.
    pub fn modify_if(&self, f: impl FnOnce(&mut S) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    /// New receiver of state changes; the current value counts as seen.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }
}

impl<S: Clone> Store<S> {
    /// Snapshot of the current state.
    pub fn get(&self) -> S {
        self.tx.borrow().clone()
    }
}

impl<S: Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}
