//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the task registry, the keyed
//! runner and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: registry actor (supersede/evict/reject/lifecycle/shutdown),
//!   keyed runner (started/completed/cancelled/panicked), `SubscriberSet` workers.
//! - **Consumers**: the subscriber listener spawned by
//!   [`RegistryBuilder::build`](crate::RegistryBuilder::build) and anything holding
//!   [`TaskRegistry::events`](crate::TaskRegistry::events).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
