use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use crate::{
    events::{Bus, Event, EventKind},
    subscribers::{Subscribe, SubscriberSet},
};

use super::{config::Config, registry::TaskRegistry};

/// Builder for a [`TaskRegistry`] with optional event subscribers.
pub struct RegistryBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl RegistryBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (supersede, lifecycle cancellation, panics, etc.)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds a single subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the registry and spawns its actor.
    ///
    /// This consumes the builder and initializes:
    /// - Event bus for broadcasting
    /// - Registry actor owning the slot table
    /// - Subscriber workers and the listener feeding them (only if subscribers were given)
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> TaskRegistry {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        if !self.subscribers.is_empty() {
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            spawn_subscriber_listener(&bus, subs);
        }

        TaskRegistry::spawn(&self.cfg, bus)
    }
}

/// Forwards bus events to the subscriber set until the registry shuts down.
///
/// The set keeps a bus sender for its own overflow reports, so the channel never closes
/// while it lives; `RegistryShutdown` is the stop signal.
fn spawn_subscriber_listener(bus: &Bus, subs: SubscriberSet) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    let last = ev.kind == EventKind::RegistryShutdown;
                    subs.emit(&ev);
                    if last {
                        break;
                    }
                }
                Err(RecvError::Lagged(_)) => {
                    subs.emit(&Event::subscriber_overflow("listener", "lagged"));
                }
                Err(RecvError::Closed) => break,
            }
        }
        subs.shutdown().await;
    });
}
