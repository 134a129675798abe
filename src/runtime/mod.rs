//! Runtime core: registry, dispatch and lifecycle.
//!
//! Internal modules:
//! - [`registry`]: actor-owned table of keyed operations (`TaskRegistry`);
//! - [`dispatcher`]: per-reactor entry point (`Dispatcher`);
//! - [`runner`]: runs one admitted body with panic containment and event publishing;
//! - [`lifecycle`]: owner detach (`cancel_all_lifecycle_operations`, `LifecycleGuard`);
//! - [`builder`], [`config`], [`collision`]: registry construction and settings;
//! - [`entry`]: operation ids, handles and registry snapshots.

mod builder;
mod collision;
mod config;
mod dispatcher;
mod entry;
mod lifecycle;
mod registry;
mod runner;

pub use builder::RegistryBuilder;
pub use collision::CollisionPolicy;
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use entry::{Entries, Entry, OperationHandle, OperationId};
pub use lifecycle::{LifecycleGuard, cancel_all_lifecycle_operations};
pub use registry::TaskRegistry;
pub use runner::Outcome;
