//! # Run the body of a single keyed operation.
//!
//! Executes one admitted operation body, contains panics and publishes its
//! lifecycle events to [`Bus`].
//!
//! ## Event flow
//!
//! ```text
//! Success:
//!   publish OperationStarted → body → returned, token live      → publish OperationCompleted
//!
//! Cancellation:
//!   publish OperationStarted → body → returned, token cancelled → publish OperationCancelled
//!
//! Panic:
//!   publish OperationStarted → body → panic caught               → publish OperationPanicked
//! ```
//!
//! ## Rules
//! - Always publishes **exactly one** terminal event per started operation
//! - A body that finished its work but observed a cancel afterwards still reports `Cancelled`
//! - Panics never escape: they become [`Outcome::Panicked`]

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::cancel::{KeyId, OwnerId};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::panic_message;

use super::entry::OperationHandle;

/// Terminal state of a keyed operation.
///
/// Cancellation is **not** an error: callers get [`Outcome::Cancelled`] back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Body returned and the token was never cancelled.
    Completed,
    /// Token was cancelled while the body was running (supersede, lifecycle, shutdown).
    Cancelled,
    /// The collision policy refused to start the operation.
    Rejected,
    /// Body panicked; the panic was contained.
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl Outcome {
    /// Returns `true` for [`Outcome::Completed`].
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }

    /// Returns `true` for [`Outcome::Cancelled`].
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// Returns `true` for [`Outcome::Rejected`].
    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected)
    }

    /// Returns `true` for [`Outcome::Panicked`].
    #[inline]
    pub fn is_panicked(&self) -> bool {
        matches!(self, Outcome::Panicked { .. })
    }

    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::Completed => "completed",
            Outcome::Cancelled => "cancelled",
            Outcome::Rejected => "rejected",
            Outcome::Panicked { .. } => "panicked",
        }
    }
}

/// Runs `body` for the admitted operation `handle`, publishing its events to `bus`.
///
/// ### Flow
/// 1. Publish `OperationStarted`
/// 2. Await the body with panics caught
/// 3. Classify by panic / token state and publish the terminal event
pub(crate) async fn run_tracked<F>(
    body: F,
    handle: &OperationHandle,
    owner: OwnerId,
    key: &KeyId,
    bus: &Bus,
) -> Outcome
where
    F: Future<Output = ()>,
{
    let op = handle.op();
    let publish = |kind| bus.publish(Event::operation(kind, owner, key, op));
    publish(EventKind::OperationStarted);

    match AssertUnwindSafe(body).catch_unwind().await {
        Ok(()) if handle.is_cancelled() => {
            publish(EventKind::OperationCancelled);
            Outcome::Cancelled
        }
        Ok(()) => {
            publish(EventKind::OperationCompleted);
            Outcome::Completed
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            bus.publish(
                Event::operation(EventKind::OperationPanicked, owner, key, op)
                    .with_reason(message.clone()),
            );
            Outcome::Panicked { message }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelPolicy;

    #[tokio::test]
    async fn test_completed_publishes_started_then_completed() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let handle = OperationHandle::new(CancelPolicy::IN_FLIGHT);
        let key = KeyId::from("k");

        let out = run_tracked(async {}, &handle, OwnerId::next(), &key, &bus).await;

        assert_eq!(out, Outcome::Completed);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::OperationStarted);
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::OperationCompleted);
        assert_eq!(ev.op, Some(handle.op()));
    }

    #[tokio::test]
    async fn test_cancelled_token_yields_cancelled() {
        let bus = Bus::new(8);
        let handle = OperationHandle::new(CancelPolicy::LIFECYCLE);
        let token = handle.token().clone();
        let body = async move {
            token.cancel();
            token.cancelled().await;
        };

        let key = KeyId::from(1u64);
        let out = run_tracked(body, &handle, OwnerId::next(), &key, &bus).await;
        assert!(out.is_cancelled());
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let handle = OperationHandle::new(CancelPolicy::empty());

        let out = run_tracked(
            async { panic!("body failed") },
            &handle,
            OwnerId::next(),
            &KeyId::from("k"),
            &bus,
        )
        .await;

        assert_eq!(
            out,
            Outcome::Panicked {
                message: "body failed".to_string()
            }
        );
        let _started = rx.recv().await.unwrap();
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::OperationPanicked);
        assert_eq!(ev.reason.as_deref(), Some("body failed"));
    }
}
