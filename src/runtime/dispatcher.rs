//! # Action dispatcher.
//!
//! [`Dispatcher`] is the per-reactor entry point. It owns the reactor, its state
//! [`Store`] and an [`OwnerId`], and shares a [`TaskRegistry`] with every other
//! dispatcher built against the same registry.
//!
//! ## Dispatch modes
//! ```text
//! send(action)            ── spawn ──► reactor.action()            (never registered)
//! run(action).await       ─────────► reactor.action()            (never registered)
//!
//! run_keyed(action, key)  ── Admit(owner, key, handle) ──► registry actor
//!                                         │ Admitted                │ Rejected
//!                                         ▼                         ▼
//!                          spawn: run_tracked(body, token)    Outcome::Rejected
//!                                         │
//!                                         ▼
//!                          release: RemoveIfCurrent(owner, key, op)
//! send_keyed / run_for_lifetime: same path, detached
//! ```
//!
//! ## Rules
//! - Keyed registration is enqueued **when the dispatch method is called**, so admission
//!   follows call order even before anything is awaited.
//! - Keyed bodies run on their own task: dropping the `run_keyed` future does not stop
//!   the body, and the entry is always released afterwards.
//! - Release is compare-and-remove by [`OperationId`](crate::OperationId); a superseded
//!   body never removes its successor.
//! - Unkeyed bodies are never cancelled by teardown or later dispatch.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cancel::{CancelKey, CancelPolicy, OwnerId};
use crate::error::RuntimeError;
use crate::events::{Event, EventKind};
use crate::reactor::{Context, Reactor, SyncReactor};
use crate::state::Store;
use crate::subscribers::panic_message;

use super::entry::OperationHandle;
use super::lifecycle::{LifecycleGuard, cancel_all_lifecycle_operations};
use super::registry::{Admission, TaskRegistry};
use super::runner::{Outcome, run_tracked};

struct Inner<R: Reactor> {
    owner: OwnerId,
    reactor: R,
    store: Store<R::State>,
    registry: TaskRegistry,
}

/// Per-reactor dispatch entry point.
///
/// Cheap to clone; clones share the owner identity, the reactor and the state.
pub struct Dispatcher<R: Reactor> {
    inner: Arc<Inner<R>>,
}

impl<R: Reactor> Clone for Dispatcher<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Reactor> Dispatcher<R> {
    /// Creates a dispatcher with a fresh [`OwnerId`].
    pub fn new(reactor: R, state: R::State, registry: &TaskRegistry) -> Self {
        Self {
            inner: Arc::new(Inner {
                owner: OwnerId::next(),
                reactor,
                store: Store::new(state),
                registry: registry.clone(),
            }),
        }
    }

    /// Identity scoping this dispatcher's registry entries.
    #[inline]
    pub fn owner(&self) -> OwnerId {
        self.inner.owner
    }

    /// The reactor handling actions.
    #[inline]
    pub fn reactor(&self) -> &R {
        &self.inner.reactor
    }

    /// The state store.
    #[inline]
    pub fn store(&self) -> &Store<R::State> {
        &self.inner.store
    }

    /// The shared task registry.
    #[inline]
    pub fn registry(&self) -> &TaskRegistry {
        &self.inner.registry
    }

    /// See [`Store::read`]. Writing to the state from inside `f` deadlocks.
    pub fn read<T>(&self, f: impl FnOnce(&R::State) -> T) -> T {
        self.inner.store.read(f)
    }

    /// See [`Store::select`]. Writing to the state from inside `f` deadlocks.
    pub fn select<T: Clone>(&self, f: impl FnOnce(&R::State) -> &T) -> T {
        self.inner.store.select(f)
    }

    /// See [`Store::subscribe`].
    pub fn subscribe(&self) -> watch::Receiver<R::State> {
        self.inner.store.subscribe()
    }

    /// Unkeyed fire-and-forget dispatch.
    ///
    /// The action runs on its own task and is never registered.
    pub fn send(&self, action: R::Action) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.run(action).await })
    }

    /// Unkeyed dispatch awaited in place.
    ///
    /// A panicking body is contained and reported as `OperationPanicked`.
    pub async fn run(&self, action: R::Action) {
        let cx = Context::new(
            self.inner.store.clone(),
            CancellationToken::new(),
            self.inner.owner,
            None,
        );
        let fut = self.inner.reactor.action(action, cx);
        if let Err(payload) = AssertUnwindSafe(fut).catch_unwind().await {
            self.inner.registry.bus().publish(
                Event::new(EventKind::OperationPanicked)
                    .with_owner(self.inner.owner)
                    .with_reason(panic_message(payload.as_ref())),
            );
        }
    }

    /// Keyed dispatch awaited for its [`Outcome`].
    ///
    /// Registration is enqueued when this method is called. With
    /// [`CancelPolicy::IN_FLIGHT`] the occupant of `(owner, key)` is cancelled first;
    /// without it the registry's [`CollisionPolicy`](crate::CollisionPolicy) decides.
    ///
    /// # Errors
    /// [`RuntimeError::RegistryClosed`] if the registry no longer accepts commands.
    pub fn run_keyed(
        &self,
        action: R::Action,
        key: &CancelKey,
    ) -> impl Future<Output = Result<Outcome, RuntimeError>> + Send + use<R> {
        let launched = self.launch_action(action, key);
        async move {
            let join = launched?;
            Ok(join_outcome(join.await))
        }
    }

    /// Detached keyed dispatch.
    ///
    /// The returned handle resolves to the operation's [`Outcome`]; dropping it
    /// does not affect the operation.
    ///
    /// # Errors
    /// [`RuntimeError::RegistryClosed`] if the registry no longer accepts commands.
    pub fn send_keyed(
        &self,
        action: R::Action,
        key: &CancelKey,
    ) -> Result<JoinHandle<Outcome>, RuntimeError> {
        self.launch_action(action, key)
    }

    /// Starts `body` under a fresh unique key tagged [`CancelPolicy::LIFECYCLE`].
    ///
    /// The body runs until it returns or the owner is detached. The generated key is
    /// returned so the caller can cancel this one operation with [`Dispatcher::cancel`].
    ///
    /// # Errors
    /// [`RuntimeError::RegistryClosed`] if the registry no longer accepts commands.
    pub fn run_for_lifetime<F, Fut>(&self, body: F) -> Result<CancelKey, RuntimeError>
    where
        F: FnOnce(Context<R::State>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let key = CancelKey::unique(CancelPolicy::LIFECYCLE);
        self.launch(&key, body)?;
        Ok(key)
    }

    /// Cancels and removes this owner's operation under `key`.
    ///
    /// Returns `false` when nothing was registered under it.
    pub async fn cancel(&self, key: &CancelKey) -> Result<bool, RuntimeError> {
        self.inner
            .registry
            .cancel_and_remove(self.inner.owner, key.id())
            .await
    }

    /// Cancels every lifecycle-tagged operation of this owner.
    ///
    /// Idempotent; returns how many operations were cancelled.
    pub async fn detach(&self) -> Result<usize, RuntimeError> {
        cancel_all_lifecycle_operations(&self.inner.registry, self.inner.owner).await
    }

    /// Guard that detaches this owner when dropped.
    pub fn lifecycle_guard(&self) -> LifecycleGuard {
        LifecycleGuard::new(self.inner.registry.clone(), self.inner.owner)
    }

    fn launch_action(
        &self,
        action: R::Action,
        key: &CancelKey,
    ) -> Result<JoinHandle<Outcome>, RuntimeError> {
        let inner = Arc::clone(&self.inner);
        self.launch(key, move |cx| async move {
            inner.reactor.action(action, cx).await;
        })
    }

    /// Enqueues admission, then spawns the task that waits for it and runs `body`.
    fn launch<F, Fut>(&self, key: &CancelKey, body: F) -> Result<JoinHandle<Outcome>, RuntimeError>
    where
        F: FnOnce(Context<R::State>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let owner = self.inner.owner;
        let key_id = key.id().clone();
        let handle = OperationHandle::new(key.policy());
        let admission = self
            .inner
            .registry
            .request_admit(owner, key_id.clone(), handle.clone())?;

        let registry = self.inner.registry.clone();
        let store = self.inner.store.clone();
        Ok(tokio::spawn(async move {
            match admission.await {
                Ok(Admission::Admitted) => {}
                Ok(Admission::Rejected) => return Outcome::Rejected,
                // Registry stopped before deciding: nothing was registered.
                Err(_) => return Outcome::Cancelled,
            }

            let cx = Context::new(store, handle.token().clone(), owner, Some(key_id.clone()));
            let outcome = run_tracked(body(cx), &handle, owner, &key_id, registry.bus()).await;
            registry.release(owner, key_id, handle.op());
            outcome
        }))
    }
}

impl<R: SyncReactor> Dispatcher<R> {
    /// Applies a synchronous action under the store's write lock.
    pub fn apply(&self, action: R::SyncAction) {
        let reactor = &self.inner.reactor;
        let store = &self.inner.store;
        store.update(|state| reactor.apply(state, action));
    }
}

impl<R: Reactor> Dispatcher<R>
where
    R::State: Clone,
{
    /// Snapshot of the current state.
    pub fn state(&self) -> R::State {
        self.inner.store.get()
    }
}

/// Maps a finished keyed task to its outcome.
fn join_outcome(res: Result<Outcome, tokio::task::JoinError>) -> Outcome {
    match res {
        Ok(outcome) => outcome,
        Err(err) if err.is_panic() => Outcome::Panicked {
            message: panic_message(err.into_panic().as_ref()),
        },
        Err(_) => Outcome::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::KeyId;
    use crate::runtime::{CollisionPolicy, Config};
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Clone, Debug, Default)]
    struct Counter {
        value: i64,
        log: Vec<&'static str>,
    }

    enum Action {
        Add(i64),
        SlowAdd(i64, Duration),
        Boom,
    }

    enum Direct {
        Reset,
    }

    struct CounterReactor;

    #[async_trait]
    impl Reactor for CounterReactor {
        type State = Counter;
        type Action = Action;

        async fn action(&self, action: Action, cx: Context<Counter>) {
            match action {
                Action::Add(n) => cx.update(|s| s.value += n),
                Action::SlowAdd(n, dur) => {
                    if cx.sleep(dur).await {
                        cx.update(|s| s.value += n);
                    } else {
                        cx.update(|s| s.log.push("cancelled"));
                    }
                }
                Action::Boom => panic!("boom"),
            }
        }
    }

    impl SyncReactor for CounterReactor {
        type SyncAction = Direct;

        fn apply(&self, state: &mut Counter, action: Direct) {
            match action {
                Direct::Reset => state.value = 0,
            }
        }
    }

    fn dispatcher(collision: CollisionPolicy) -> Dispatcher<CounterReactor> {
        let registry = TaskRegistry::new(Config {
            collision,
            ..Config::default()
        });
        Dispatcher::new(CounterReactor, Counter::default(), &registry)
    }

    #[tokio::test]
    async fn test_run_and_apply() {
        let d = dispatcher(CollisionPolicy::Replace);
        d.run(Action::Add(5)).await;
        assert_eq!(d.select(|s| &s.value), 5);

        d.apply(Direct::Reset);
        assert_eq!(d.state().value, 0);

        d.send(Action::Add(2)).await.unwrap();
        assert_eq!(d.read(|s| s.value), 2);
        assert!(d.registry().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_run_keyed_completes_and_releases() {
        let d = dispatcher(CollisionPolicy::Replace);
        let key = CancelKey::in_flight("add");

        let outcome = d.run_keyed(Action::Add(1), &key).await.unwrap();
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(d.state().value, 1);

        // Release is fire-and-forget; a later command observes it.
        assert!(d.registry().is_empty().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_supersedes_previous() {
        let d = dispatcher(CollisionPolicy::Replace);
        let key = CancelKey::in_flight("slow");

        let first = d
            .send_keyed(Action::SlowAdd(1, Duration::from_millis(100)), &key)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = d
            .send_keyed(Action::SlowAdd(10, Duration::from_millis(100)), &key)
            .unwrap();

        assert_eq!(first.await.unwrap(), Outcome::Cancelled);
        assert_eq!(second.await.unwrap(), Outcome::Completed);
        let state = d.state();
        assert_eq!(state.value, 10);
        assert_eq!(state.log, vec!["cancelled"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_if_running_rejects_duplicate() {
        let d = dispatcher(CollisionPolicy::DropIfRunning);
        let key = CancelKey::new("refresh", CancelPolicy::empty());

        let first = d
            .send_keyed(Action::SlowAdd(1, Duration::from_millis(50)), &key)
            .unwrap();
        let second = d.run_keyed(Action::Add(100), &key).await.unwrap();

        assert_eq!(second, Outcome::Rejected);
        assert_eq!(first.await.unwrap(), Outcome::Completed);
        assert_eq!(d.state().value, 1);
    }

    #[tokio::test]
    async fn test_keyed_panic_is_contained() {
        let d = dispatcher(CollisionPolicy::Replace);
        let mut events = d.registry().events();

        let key = CancelKey::in_flight("boom");
        let outcome = d.run_keyed(Action::Boom, &key).await.unwrap();
        assert!(outcome.is_panicked());
        assert!(d.registry().is_empty().await.unwrap());

        let kinds: Vec<EventKind> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.kind)
            .collect();
        assert!(kinds.contains(&EventKind::OperationPanicked));
    }

    #[tokio::test]
    async fn test_unkeyed_panic_is_reported() {
        let d = dispatcher(CollisionPolicy::Replace);
        let mut events = d.registry().events();

        d.run(Action::Boom).await;
        let ev = events.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::OperationPanicked);
        assert_eq!(ev.owner, Some(d.owner()));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_for_lifetime_and_cancel() {
        let d = dispatcher(CollisionPolicy::Replace);
        let key = d
            .run_for_lifetime(|cx| async move {
                cx.cancelled().await;
                cx.update(|s| s.log.push("stopped"));
            })
            .unwrap();
        assert!(key.id().is_unique());
        assert!(key.policy().is_lifecycle());

        let entries = d
            .registry()
            .entries_for(d.owner(), CancelPolicy::LIFECYCLE)
            .await
            .unwrap();
        assert!(entries.contains_key(key.id()));

        assert!(d.cancel(&key).await.unwrap());
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(d.state().log, vec!["stopped"]);
        let stray = CancelKey::in_flight(KeyId::unique());
        assert!(!d.cancel(&stray).await.unwrap());
    }

    #[tokio::test]
    async fn test_closed_registry_is_reported() {
        let d = dispatcher(CollisionPolicy::Replace);
        d.registry().shutdown().await.unwrap();
        tokio::task::yield_now().await;

        let key = CancelKey::in_flight("a");
        let res = d.run_keyed(Action::Add(1), &key).await;
        assert_eq!(res, Err(RuntimeError::RegistryClosed));
        assert_eq!(d.detach().await, Err(RuntimeError::RegistryClosed));

        // Unkeyed dispatch does not need the registry.
        d.run(Action::Add(3)).await;
        assert_eq!(d.state().value, 3);
    }
}
