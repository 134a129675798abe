//! # taskreactor
//!
//! **Taskreactor** is a state-container / action-dispatch library for presentation
//! components.
//!
//! Each component owns one *reactor*: an object holding a readable state snapshot and a
//! dispatch entry point for actions that asynchronously mutate it. Asynchronous actions
//! can be scoped by a cancellation key, so that
//! - at most one operation per logical key runs when requested (`IN_FLIGHT`),
//! - background operations stop when the owning component is torn down (`LIFECYCLE`),
//! - bookkeeping of what is still in flight stays race-free.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ Dispatcher A │   │ Dispatcher B │   │ Dispatcher C │
//!     │ owner#1      │   │ owner#2      │   │ owner#3      │
//!     │ Store<S>     │   │ Store<S>     │   │ Store<S>     │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ Admit / Release / CancelLifecycle   │
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  TaskRegistry (actor, one command at a time)                      │
//! │  HashMap<(OwnerId, KeyId), OperationHandle>                       │
//! │  - supersede for IN_FLIGHT, CollisionPolicy otherwise             │
//! │  - compare-and-remove by OperationId                              │
//! │  - bulk lifecycle cancellation per owner                          │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   │ publishes
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                   (capacity: Config::bus_capacity)                │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                           (per-sub queues)
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                      sub1.on   sub2.on   subN.on
//!                      _event()  _event()  _event()
//! ```
//!
//! ### Keyed operation lifecycle
//! ```text
//! run_keyed(action, key)
//!   ├─► Admit(owner, key, handle)
//!   │       ├─ IN_FLIGHT or free slot ─► cancel occupant, insert      ─► Running
//!   │       └─ occupied, no IN_FLIGHT ─► CollisionPolicy
//!   │                                     ├─ Replace       ─► cancel occupant, insert
//!   │                                     ├─ DropIfRunning ─► Outcome::Rejected
//!   │                                     └─ Evict         ─► overwrite, occupant untracked
//!   ├─► body(Context { store, token })
//!   │       ├─ returned, token live      ─► Outcome::Completed
//!   │       ├─ returned, token cancelled ─► Outcome::Cancelled
//!   │       └─ panicked                  ─► Outcome::Panicked
//!   └─► RemoveIfCurrent(owner, key, op)
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                          |
//! |-------------------|-----------------------------------------------------------------|---------------------------------------------|
//! | **Reactors**      | Async action handlers and optional sync mutations.              | [`Reactor`], [`SyncReactor`], [`Context`]   |
//! | **Dispatch**      | Keyed and unkeyed dispatch, lifecycle operations, detach.       | [`Dispatcher`], [`Outcome`], [`LifecycleGuard`] |
//! | **Cancellation**  | Key identity plus `{LIFECYCLE, IN_FLIGHT}` policy.              | [`CancelKey`], [`CancelPolicy`], [`KeyId`]  |
//! | **Registry**      | Shared table of running keyed operations.                       | [`TaskRegistry`], [`Entries`]               |
//! | **State**         | Observable state cell and async load helpers.                   | [`Store`], [`Loadable`]                     |
//! | **Subscriber API**| Hook into operation events (logging, metrics, custom).          | [`Subscribe`], [`Event`]                    |
//! | **Configuration** | Bus capacity and collision handling.                            | [`Config`], [`CollisionPolicy`]             |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] forwarding events to `tracing`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use taskreactor::{CancelKey, Config, Context, Dispatcher, Outcome, Reactor, TaskRegistry};
//!
//! #[derive(Clone, Default)]
//! struct Search { query: String, results: Vec<String> }
//!
//! enum Action { Search(String) }
//!
//! struct SearchReactor;
//!
//! #[async_trait]
//! impl Reactor for SearchReactor {
//!     type State = Search;
//!     type Action = Action;
//!
//!     async fn action(&self, action: Action, cx: Context<Search>) {
//!         match action {
//!             Action::Search(q) => {
//!                 cx.update(|s| s.query = q.clone());
//!                 // Debounce; a newer search cancels this one.
//!                 if !cx.sleep(Duration::from_millis(5)).await {
//!                     return;
//!                 }
//!                 cx.update(|s| s.results = vec![format!("{q}-1")]);
//!             }
//!         }
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = TaskRegistry::new(Config::default());
//!     let search = Dispatcher::new(SearchReactor, Search::default(), &registry);
//!     let _guard = search.lifecycle_guard();
//!
//!     let key = CancelKey::in_flight("search");
//!     let outcome = search.run_keyed(Action::Search("tokio".into()), &key).await?;
//!
//!     assert_eq!(outcome, Outcome::Completed);
//!     assert_eq!(search.select(|s| &s.results), vec!["tokio-1".to_string()]);
//!     Ok(())
//! }
//! ```
mod cancel;
mod error;
mod events;
mod reactor;
mod runtime;
mod state;
mod subscribers;

// ---- Public re-exports ----

pub use cancel::{CancelKey, CancelPolicy, KeyId, OwnerId};
pub use error::RuntimeError;
pub use events::{Bus, Event, EventKind};
pub use reactor::{Context, Reactor, SyncReactor};
pub use runtime::{
    CollisionPolicy, Config, Dispatcher, Entries, Entry, LifecycleGuard, OperationHandle,
    OperationId, Outcome, RegistryBuilder, TaskRegistry, cancel_all_lifecycle_operations,
};
pub use state::{LoadPhase, Loadable, Store};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a built-in `tracing` subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
