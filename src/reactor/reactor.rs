//! # Reactor abstraction.
//!
//! A [`Reactor`] owns the behaviour of one presentation component: it receives
//! actions and mutates the component state through the [`Context`] it is handed.
//! The state itself lives in the dispatcher's [`Store`](crate::Store); the reactor
//! holds only collaborators (API clients, repositories, ...).
//!
//! Reactors that also accept synchronous mutations implement [`SyncReactor`].

use async_trait::async_trait;

use super::context::Context;

/// # Asynchronous action handler.
///
/// `action` is awaited by the dispatcher. Keyed dispatches hand it a context whose
/// token is cancelled on supersede or owner detach; bodies check it and return early.
///
/// Failures are the body's own concern: store them in state (see
/// [`Loadable`](crate::Loadable)) instead of returning them.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use taskreactor::{Context, Reactor};
///
/// #[derive(Clone, Default)]
/// struct Counter { value: i64 }
///
/// enum Action { Add(i64) }
///
/// struct CounterReactor;
///
/// #[async_trait]
/// impl Reactor for CounterReactor {
///     type State = Counter;
///     type Action = Action;
///
///     async fn action(&self, action: Action, cx: Context<Counter>) {
///         match action {
///             Action::Add(n) => cx.update(|s| s.value += n),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Reactor: Send + Sync + 'static {
    /// Component state held by the dispatcher's store.
    type State: Send + Sync + 'static;

    /// Actions accepted by [`Reactor::action`].
    type Action: Send + 'static;

    /// Handles one action until completion or cancellation.
    async fn action(&self, action: Self::Action, cx: Context<Self::State>);
}

/// # Synchronous mutations.
///
/// For actions that only rewrite state (toggles, text input). Applied in place by
/// [`Dispatcher::apply`](crate::Dispatcher::apply) under the store's write lock.
pub trait SyncReactor: Reactor {
    /// Actions accepted by [`SyncReactor::apply`].
    type SyncAction;

    /// Applies `action` to `state`.
    fn apply(&self, state: &mut Self::State, action: Self::SyncAction);
}
