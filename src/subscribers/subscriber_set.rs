//! # Per-subscriber delivery lanes.
//!
//! [`SubscriberSet`] gives every subscriber its own bounded queue and worker task,
//! so the registry listener hands events off with `try_send` and never waits on
//! subscriber code.
//!
//! ```text
//! emit(event) ── Arc<Event> ──┬──► lane "log"     ──► drain ──► on_event()
//!                             ├──► lane "metrics" ──► drain ──► on_event()
//!                             └──► lane ...
//!
//! lane full / closed   ─► SubscriberOverflow on the bus (never for an overflow event)
//! on_event() panics    ─► SubscriberPanicked on the bus, lane keeps draining
//! ```
//!
//! Each lane is FIFO; there is no ordering between lanes.
//!
//! Panics are caught through `AssertUnwindSafe`: a subscriber that panics while
//! holding a lock may leave its own state poisoned.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Sending half of one subscriber's queue.
struct Lane {
    label: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
}

impl Lane {
    /// Offers `event` without waiting; returns the drop reason when refused.
    fn offer(&self, event: &Arc<Event>) -> Option<&'static str> {
        match self.queue.try_send(Arc::clone(event)) {
            Ok(()) => None,
            Err(TrySendError::Full(_)) => Some("full"),
            Err(TrySendError::Closed(_)) => Some("closed"),
        }
    }
}

/// Fan-out of registry events to a fixed set of subscribers.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Opens one lane per subscriber and spawns its worker.
    ///
    /// Queue capacity is at least 1. Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let (lanes, workers) = subs
            .into_iter()
            .map(|sub| open_lane(sub, bus.clone()))
            .unzip();
        Self {
            lanes,
            workers,
            bus,
        }
    }

    /// Number of subscribers in the set.
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// Returns `true` if the set has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Queues `event` on every lane.
    ///
    /// A lane that refuses the event loses it and a `SubscriberOverflow` is
    /// published, unless `event` is itself an overflow report.
    pub fn emit(&self, event: &Event) {
        let shared = Arc::new(event.clone());
        let report = shared.kind != EventKind::SubscriberOverflow;

        for lane in &self.lanes {
            if let Some(reason) = lane.offer(&shared).filter(|_| report) {
                let overflow = Event::subscriber_overflow(lane.label, reason);
                self.bus.publish(overflow);
            }
        }
    }

    /// Closes every lane and waits for the workers to drain what is queued.
    pub async fn shutdown(self) {
        drop(self.lanes);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

fn open_lane(sub: Arc<dyn Subscribe>, bus: Bus) -> (Lane, JoinHandle<()>) {
    let (queue, rx) = mpsc::channel(sub.queue_capacity().max(1));
    let lane = Lane {
        label: sub.name(),
        queue,
    };
    (lane, tokio::spawn(drain(sub, rx, bus)))
}

/// Delivers queued events in order until the lane closes.
async fn drain(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(event) = rx.recv().await {
        let delivery = AssertUnwindSafe(sub.on_event(&event)).catch_unwind();
        if let Err(payload) = delivery.await {
            let message = panic_message(payload.as_ref());
            bus.publish(Event::subscriber_panicked(sub.name(), message));
        }
    }
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
