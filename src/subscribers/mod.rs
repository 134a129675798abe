//! # Event subscribers.
//!
//! Subscribers observe [`Event`](crate::Event)s published on the registry's bus: keyed
//! operations starting and finishing, supersede and lifecycle cancellations, panics.
//!
//! ## Architecture
//! ```text
//! registry actor / keyed ops ── publish(Event) ──► Bus ──► subscriber listener
//!                                                              │
//!                                                        SubscriberSet::emit
//!                                                   ┌──────────┼──────────┐
//!                                                   ▼          ▼          ▼
//!                                               LogWriter   Metrics    Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use taskreactor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct SupersedeCounter;
//!
//! #[async_trait]
//! impl Subscribe for SupersedeCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::OperationSuperseded {
//!             // increment counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "supersede-counter"
//!     }
//! }
//! ```

mod embedded;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
pub(crate) use subscriber_set::panic_message;
